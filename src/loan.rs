use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accrual::calculate_accrued_interest;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::policy::InterestPolicy;
use crate::types::{AllocationSplit, LoanId, LoanStatus, WorkspaceId};

/// the stateful ledger record for one loan
///
/// Balances are mutated only through [`Loan::settle`] and [`Loan::restore`],
/// both driven by the allocation engine. `accrued_interest` is a checkpoint,
/// not the live figure: it is interest locked in at the last settlement and
/// acts as a floor under any recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub workspace_id: WorkspaceId,

    // balances
    pub principal: Money,
    pub remaining_principal: Money,
    pub accrued_interest: Money,
    /// date live accrual resumes from; loan start until the first settlement
    pub checkpoint_date: NaiveDate,

    // dates and status
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: LoanStatus,

    /// policy captured at origination; loans without one have the checkpoint
    /// as the sole source of interest truth
    pub policy: Option<InterestPolicy>,

    /// optimistic concurrency token, bumped on every settlement or reversal
    pub version: u64,

    // payment bookkeeping
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    pub payment_count: u32,
}

impl Loan {
    /// originate a loan
    pub fn originate(
        workspace_id: WorkspaceId,
        principal: Money,
        start_date: NaiveDate,
        due_date: Option<NaiveDate>,
        policy: Option<InterestPolicy>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LedgerError::InvalidPrincipal { amount: principal });
        }
        if let Some(policy) = &policy {
            policy.validate()?;
        }

        Ok(Self {
            loan_id: Uuid::new_v4(),
            workspace_id,
            principal,
            remaining_principal: principal,
            accrued_interest: Money::ZERO,
            checkpoint_date: start_date,
            start_date,
            due_date,
            status: LoanStatus::Open,
            policy,
            version: 0,
            total_interest_paid: Money::ZERO,
            total_principal_paid: Money::ZERO,
            payment_count: 0,
        })
    }

    /// interest accrued by the policy alone, ignoring the checkpoint floor
    pub fn live_interest(&self, as_of: NaiveDate) -> Money {
        match &self.policy {
            Some(policy) => calculate_accrued_interest(
                self.remaining_principal,
                policy,
                self.checkpoint_date,
                as_of,
            ),
            None => Money::ZERO,
        }
    }

    /// interest owed as of a date: live accrual floored by the checkpoint
    ///
    /// The floor guarantees a settled checkpoint is never understated by a
    /// recalculation quirk such as a month-length edge case.
    pub fn interest_due(&self, as_of: NaiveDate) -> Money {
        self.live_interest(as_of).max(self.accrued_interest)
    }

    /// everything owed as of a date
    pub fn total_due(&self, as_of: NaiveDate) -> Money {
        self.remaining_principal + self.interest_due(as_of)
    }

    pub fn is_closed(&self) -> bool {
        self.status == LoanStatus::Closed
    }

    /// recompute Open/Overdue from the due date; Closed is left alone
    pub fn refresh_status(&mut self, as_of: NaiveDate) -> LoanStatus {
        if self.status != LoanStatus::Closed {
            self.status = match self.due_date {
                Some(due) if as_of > due => LoanStatus::Overdue,
                _ => LoanStatus::Open,
            };
        }
        self.status
    }

    /// apply a settled interest/principal split
    ///
    /// Unpaid interest carries forward as the new checkpoint and accrual
    /// restarts from the payment date. Closes the loan when principal
    /// reaches zero.
    pub fn settle(&mut self, interest_due: Money, split: AllocationSplit, payment_date: NaiveDate) {
        self.accrued_interest = interest_due - split.interest_paid;
        self.remaining_principal -= split.principal_paid;
        self.checkpoint_date = payment_date;

        self.total_interest_paid += split.interest_paid;
        self.total_principal_paid += split.principal_paid;
        self.payment_count += 1;
        self.version += 1;

        if self.remaining_principal.is_zero() {
            self.status = LoanStatus::Closed;
        }
    }

    /// undo one settlement, restoring the pre-payment checkpoint and status
    pub fn restore(
        &mut self,
        split: AllocationSplit,
        checkpoint_interest: Money,
        checkpoint_date: NaiveDate,
        status: LoanStatus,
    ) {
        self.remaining_principal += split.principal_paid;
        self.accrued_interest = checkpoint_interest;
        self.checkpoint_date = checkpoint_date;
        self.status = status;

        self.total_interest_paid -= split.interest_paid;
        self.total_principal_paid -= split.principal_paid;
        self.payment_count -= 1;
        self.version += 1;
    }
}
