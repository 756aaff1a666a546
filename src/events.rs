use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{LoanId, LoanStatus, PaymentId, WorkspaceId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanOriginated {
        loan_id: LoanId,
        workspace_id: WorkspaceId,
        principal: Money,
        start_date: NaiveDate,
    },
    LoanClosed {
        loan_id: LoanId,
        payment_id: PaymentId,
        date: NaiveDate,
    },
    LoanReopened {
        loan_id: LoanId,
        payment_id: PaymentId,
        restored_principal: Money,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        date: NaiveDate,
    },

    // payment events
    PaymentRecorded {
        payment_id: PaymentId,
        workspace_id: WorkspaceId,
        amount: Money,
        payment_date: NaiveDate,
        unallocated: Money,
    },
    AllocationApplied {
        payment_id: PaymentId,
        loan_id: LoanId,
        interest_paid: Money,
        principal_paid: Money,
        new_remaining_principal: Money,
        new_accrued_interest: Money,
    },
    PaymentReversed {
        payment_id: PaymentId,
        workspace_id: WorkspaceId,
        amount: Money,
    },

    // advisory events
    PolicyOverLegalRate {
        loan_id: LoanId,
        yearly_rate: Rate,
        ceiling: Rate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
