use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, PaymentId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid policy configuration: {message}")]
    InvalidPolicyConfiguration {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment has no target loans")]
    NoAllocationTargets,

    #[error("invalid loan principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("over-allocation on loan {loan_id}: {component} due {due}, requested {requested}")]
    OverAllocation {
        loan_id: LoanId,
        component: &'static str,
        due: Money,
        requested: Money,
    },

    #[error("loan {loan_id} is already closed")]
    ClosedLoanTarget {
        loan_id: LoanId,
    },

    #[error("payment targets loans from more than one workspace")]
    CrossWorkspaceTarget,

    #[error("loan {loan_id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrentModification {
        loan_id: LoanId,
        expected: u64,
        actual: u64,
    },

    #[error("loan not found: {loan_id}")]
    LoanNotFound {
        loan_id: LoanId,
    },

    #[error("payment not found: {payment_id}")]
    PaymentNotFound {
        payment_id: PaymentId,
    },

    #[error("payment {payment_id} is not the latest settlement on loan {loan_id}")]
    ReversalConflict {
        payment_id: PaymentId,
        loan_id: LoanId,
    },

    #[error("payment leaves {remainder} unallocated and overpayment is rejected")]
    UnallocatedRemainder {
        remainder: Money,
    },

    #[error("invalid date: {date} is before loan start {start_date}")]
    InvalidDate {
        date: NaiveDate,
        start_date: NaiveDate,
    },
}

impl LedgerError {
    /// whether the caller may retry the operation with fresh data
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentModification { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
