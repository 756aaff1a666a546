use std::collections::HashMap;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::legal::check_legal_rate;
use crate::loan::Loan;
use crate::payments::{allocate, Payment, PaymentRequest};
use crate::policy::InterestPolicy;
use crate::types::{LegalRateAdvice, LoanId, PaymentId, WorkspaceId};

/// the system of record for loans and payments
///
/// Every mutation goes through [`Ledger::record_payment`] or
/// [`Ledger::delete_payment`] and is all-or-nothing: validation and the
/// waterfall run against staged clones, and the real loans are only written
/// once every target has succeeded.
#[derive(Debug, Default)]
pub struct Ledger {
    loans: HashMap<LoanId, Loan>,
    payments: HashMap<PaymentId, Payment>,
    next_seq: u64,
    pub events: EventStore,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// originate a loan and flag its policy against the legal-rate ceiling
    pub fn originate_loan(
        &mut self,
        workspace_id: WorkspaceId,
        principal: Money,
        start_date: NaiveDate,
        due_date: Option<NaiveDate>,
        policy: Option<InterestPolicy>,
    ) -> Result<LoanId> {
        let loan = Loan::originate(workspace_id, principal, start_date, due_date, policy)?;
        let loan_id = loan.loan_id;

        self.events.emit(Event::LoanOriginated {
            loan_id,
            workspace_id,
            principal,
            start_date,
        });

        // advisory only, never blocks origination
        if let Some(policy) = &loan.policy {
            let advice = check_legal_rate(policy);
            if !advice.is_legal {
                self.events.emit(Event::PolicyOverLegalRate {
                    loan_id,
                    yearly_rate: advice.yearly_rate,
                    ceiling: crate::legal::legal_yearly_ceiling(),
                });
            }
        }

        self.loans.insert(loan_id, loan);
        Ok(loan_id)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<&Loan> {
        self.loans
            .get(&loan_id)
            .ok_or(LedgerError::LoanNotFound { loan_id })
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<&Payment> {
        self.payments
            .get(&payment_id)
            .ok_or(LedgerError::PaymentNotFound { payment_id })
    }

    /// loans of one workspace, for list pages
    pub fn loans_in_workspace(&self, workspace_id: WorkspaceId) -> Vec<&Loan> {
        let mut loans: Vec<&Loan> = self
            .loans
            .values()
            .filter(|l| l.workspace_id == workspace_id)
            .collect();
        loans.sort_by_key(|l| (l.start_date, l.loan_id));
        loans
    }

    /// interest owed as of a date, floored by the checkpoint; never mutates
    pub fn live_interest(&self, loan_id: LoanId, as_of: NaiveDate) -> Result<Money> {
        Ok(self.loan(loan_id)?.interest_due(as_of))
    }

    /// interest owed as of the provider's current date
    pub fn live_interest_now(
        &self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        self.live_interest(loan_id, time_provider.now().date_naive())
    }

    /// legal-rate advice for a loan's policy, if it has one
    pub fn legal_rate_advice(&self, loan_id: LoanId) -> Result<Option<LegalRateAdvice>> {
        Ok(self.loan(loan_id)?.policy.as_ref().map(check_legal_rate))
    }

    /// record a payment and allocate it across its target loans
    pub fn record_payment(&mut self, request: PaymentRequest) -> Result<PaymentId> {
        if request.targets.is_empty() {
            return Err(LedgerError::NoAllocationTargets);
        }

        // stage clones of every target; data isolation is checked here,
        // balances and versions inside the engine
        let mut staged: HashMap<LoanId, Loan> = HashMap::new();
        for instruction in &request.targets {
            let loan = self.loan(instruction.loan_id)?;
            if loan.workspace_id != request.workspace_id {
                return Err(LedgerError::CrossWorkspaceTarget);
            }
            staged.entry(loan.loan_id).or_insert_with(|| loan.clone());
        }

        let (allocations, unallocated) = allocate(&request, &mut staged)?;

        // commit
        let payment_id = Uuid::new_v4();
        self.next_seq += 1;

        for allocation in &allocations {
            // staged always contains every allocated loan
            if let Some(loan) = staged.get(&allocation.loan_id) {
                self.events.emit(Event::AllocationApplied {
                    payment_id,
                    loan_id: loan.loan_id,
                    interest_paid: allocation.split.interest_paid,
                    principal_paid: allocation.split.principal_paid,
                    new_remaining_principal: loan.remaining_principal,
                    new_accrued_interest: loan.accrued_interest,
                });
                if allocation.closed_loan(loan.status) {
                    self.events.emit(Event::LoanClosed {
                        loan_id: loan.loan_id,
                        payment_id,
                        date: request.payment_date,
                    });
                }
            }
        }
        self.loans.extend(staged);

        self.events.emit(Event::PaymentRecorded {
            payment_id,
            workspace_id: request.workspace_id,
            amount: request.amount,
            payment_date: request.payment_date,
            unallocated,
        });

        self.payments.insert(
            payment_id,
            Payment {
                payment_id,
                workspace_id: request.workspace_id,
                amount: request.amount,
                payment_date: request.payment_date,
                note: request.note,
                allocations,
                unallocated,
                seq: self.next_seq,
            },
        );

        Ok(payment_id)
    }

    /// delete a payment, reversing every allocation it made
    ///
    /// Only the most recent settlement on each touched loan may be reversed;
    /// restoring an older checkpoint over a newer one would corrupt the
    /// ledger.
    pub fn delete_payment(&mut self, payment_id: PaymentId) -> Result<()> {
        let payment = self
            .payments
            .get(&payment_id)
            .ok_or(LedgerError::PaymentNotFound { payment_id })?;

        for allocation in &payment.allocations {
            self.loan(allocation.loan_id)?;
            let superseded = self
                .payments
                .values()
                .any(|p| p.seq > payment.seq && p.touches_loan(allocation.loan_id));
            if superseded {
                return Err(LedgerError::ReversalConflict {
                    payment_id,
                    loan_id: allocation.loan_id,
                });
            }
        }

        // validation passed, the reversal itself cannot fail
        let payment = self
            .payments
            .remove(&payment_id)
            .ok_or(LedgerError::PaymentNotFound { payment_id })?;

        // restore in reverse allocation order so a loan targeted twice by one
        // payment ends at its true pre-payment checkpoint
        for allocation in payment.allocations.iter().rev() {
            if let Some(loan) = self.loans.get_mut(&allocation.loan_id) {
                let reopened = allocation.closed_loan(loan.status);
                loan.restore(
                    allocation.split,
                    allocation.checkpoint_interest_before,
                    allocation.checkpoint_date_before,
                    allocation.status_before,
                );
                if reopened {
                    self.events.emit(Event::LoanReopened {
                        loan_id: loan.loan_id,
                        payment_id,
                        restored_principal: loan.remaining_principal,
                    });
                }
            }
        }

        self.events.emit(Event::PaymentReversed {
            payment_id,
            workspace_id: payment.workspace_id,
            amount: payment.amount,
        });

        Ok(())
    }

    /// flip Open loans past their due date to Overdue
    pub fn refresh_statuses(&mut self, as_of: NaiveDate) {
        let mut changes = Vec::new();
        for loan in self.loans.values_mut() {
            let old_status = loan.status;
            let new_status = loan.refresh_status(as_of);
            if new_status != old_status {
                changes.push((loan.loan_id, old_status, new_status));
            }
        }
        for (loan_id, old_status, new_status) in changes {
            self.events.emit(Event::StatusChanged {
                loan_id,
                old_status,
                new_status,
                date: as_of,
            });
        }
    }
}
