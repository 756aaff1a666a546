use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// unique identifier for an interest policy
pub type PolicyId = Uuid;

/// unique identifier for a workspace
pub type WorkspaceId = Uuid;

/// how a policy's interest rate is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateMode {
    /// fraction per month, accrued in cycles anchored to a day of month
    Monthly,
    /// fraction per day
    Daily,
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// loan active with outstanding principal
    Open,
    /// past the due date with outstanding principal
    Overdue,
    /// principal fully repaid
    Closed,
}

/// what to do with a payment remainder after every target loan is satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverpaymentPolicy {
    /// reject the whole payment, nothing is written
    #[default]
    Reject,
    /// record the remainder on the payment as unallocated
    LeaveUnallocated,
}

/// result of annualizing a policy rate against the statutory ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegalRateAdvice {
    pub is_legal: bool,
    pub yearly_rate: Rate,
}

/// interest/principal split applied to one loan by one payment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AllocationSplit {
    pub interest_paid: Money,
    pub principal_paid: Money,
}

impl AllocationSplit {
    pub fn total(&self) -> Money {
        self.interest_paid + self.principal_paid
    }
}
