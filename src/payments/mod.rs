pub mod allocation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    AllocationSplit, LoanId, LoanStatus, OverpaymentPolicy, PaymentId, WorkspaceId,
};

pub use allocation::allocate;

/// one target loan within a payment request
///
/// Splits may be supplied explicitly by the caller or left to the waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInstruction {
    pub loan_id: LoanId,
    /// explicit interest portion; `None` lets the waterfall decide
    pub interest: Option<Money>,
    /// explicit principal portion; `None` lets the waterfall decide
    pub principal: Option<Money>,
    /// loan version the caller read before paying, for lost-update detection
    pub expected_version: Option<u64>,
}

impl AllocationInstruction {
    /// waterfall-computed split
    pub fn auto(loan_id: LoanId) -> Self {
        Self {
            loan_id,
            interest: None,
            principal: None,
            expected_version: None,
        }
    }

    /// caller-supplied split
    pub fn explicit(loan_id: LoanId, interest: Money, principal: Money) -> Self {
        Self {
            loan_id,
            interest: Some(interest),
            principal: Some(principal),
            expected_version: None,
        }
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn is_explicit(&self) -> bool {
        self.interest.is_some() || self.principal.is_some()
    }
}

/// payment-recording request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub workspace_id: WorkspaceId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    /// target loans in allocation order
    pub targets: Vec<AllocationInstruction>,
    pub note: Option<String>,
    pub overpayment: OverpaymentPolicy,
}

impl PaymentRequest {
    pub fn new(
        workspace_id: WorkspaceId,
        amount: Money,
        payment_date: NaiveDate,
        targets: Vec<AllocationInstruction>,
    ) -> Self {
        Self {
            workspace_id,
            amount,
            payment_date,
            targets,
            note: None,
            overpayment: OverpaymentPolicy::default(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_overpayment(mut self, policy: OverpaymentPolicy) -> Self {
        self.overpayment = policy;
        self
    }
}

/// the portion of a payment routed to one loan, with everything reversal needs
///
/// The pre-payment checkpoint is persisted rather than recomputed: once other
/// loans have moved, recomputation could diverge from the values that were
/// actually settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub loan_id: LoanId,
    pub split: AllocationSplit,
    /// interest owed at the moment of settlement (floored by the checkpoint)
    pub interest_due_at_payment_time: Money,
    pub checkpoint_interest_before: Money,
    pub checkpoint_date_before: NaiveDate,
    pub status_before: LoanStatus,
}

impl Allocation {
    /// whether this allocation is what closed the loan
    pub fn closed_loan(&self, status_after: LoanStatus) -> bool {
        status_after == LoanStatus::Closed && self.status_before != LoanStatus::Closed
    }
}

/// a recorded payment and its allocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub workspace_id: WorkspaceId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub note: Option<String>,
    pub allocations: Vec<Allocation>,
    /// remainder kept on the payment when overpayment policy allows it
    pub unallocated: Money,
    /// recording order within the ledger, used to order reversals
    pub seq: u64,
}

impl Payment {
    pub fn allocated_total(&self) -> Money {
        self.allocations
            .iter()
            .fold(Money::ZERO, |acc, a| acc + a.split.total())
    }

    pub fn touches_loan(&self, loan_id: LoanId) -> bool {
        self.allocations.iter().any(|a| a.loan_id == loan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_instruction_constructors() {
        let loan_id = Uuid::new_v4();

        let auto = AllocationInstruction::auto(loan_id);
        assert!(!auto.is_explicit());

        let explicit =
            AllocationInstruction::explicit(loan_id, Money::from_major(10), Money::ZERO);
        assert!(explicit.is_explicit());

        let versioned = AllocationInstruction::auto(loan_id).expecting_version(3);
        assert_eq!(versioned.expected_version, Some(3));
    }

    #[test]
    fn test_payment_totals() {
        let loan_id = Uuid::new_v4();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let payment = Payment {
            payment_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            amount: Money::from_major(300),
            payment_date: date,
            note: None,
            allocations: vec![Allocation {
                loan_id,
                split: AllocationSplit {
                    interest_paid: Money::from_major(200),
                    principal_paid: Money::from_major(100),
                },
                interest_due_at_payment_time: Money::from_major(200),
                checkpoint_interest_before: Money::from_major(200),
                checkpoint_date_before: date,
                status_before: LoanStatus::Open,
            }],
            unallocated: Money::ZERO,
            seq: 1,
        };

        assert_eq!(payment.allocated_total(), Money::from_major(300));
        assert!(payment.touches_loan(loan_id));
        assert!(!payment.touches_loan(Uuid::new_v4()));
    }
}
