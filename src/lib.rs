pub mod accrual;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod legal;
pub mod loan;
pub mod payments;
pub mod policy;
pub mod types;
pub mod views;

// re-export key types
pub use accrual::calculate_accrued_interest;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::Ledger;
pub use legal::{check_legal_rate, legal_yearly_ceiling};
pub use loan::Loan;
pub use payments::{Allocation, AllocationInstruction, Payment, PaymentRequest};
pub use policy::InterestPolicy;
pub use types::{
    AllocationSplit, LegalRateAdvice, LoanId, LoanStatus, OverpaymentPolicy, PaymentId, PolicyId,
    RateMode, WorkspaceId,
};
pub use views::{LoanView, WorkspaceView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
