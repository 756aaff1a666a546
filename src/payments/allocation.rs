use std::collections::HashMap;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::{AllocationSplit, LoanId, OverpaymentPolicy};

use super::{Allocation, AllocationInstruction, PaymentRequest};

/// split a payment across its target loans, interest before principal
///
/// Operates on a staged copy of the loans: the caller clones the targets,
/// runs the engine, and commits the staged state only on success. An error
/// from any target therefore leaves the real ledger untouched.
///
/// Returns the allocations in target order plus whatever remainder the
/// overpayment policy allowed to stay unallocated.
pub fn allocate(
    request: &PaymentRequest,
    staged: &mut HashMap<LoanId, Loan>,
) -> Result<(Vec<Allocation>, Money)> {
    if !request.amount.is_positive() {
        return Err(LedgerError::InvalidPaymentAmount {
            amount: request.amount,
        });
    }

    // every target is vetted before any money moves, so an invalid loan
    // late in the list rejects the payment even when earlier loans would
    // have absorbed the whole amount
    for instruction in &request.targets {
        let loan = staged
            .get(&instruction.loan_id)
            .ok_or(LedgerError::LoanNotFound {
                loan_id: instruction.loan_id,
            })?;

        if loan.is_closed() {
            return Err(LedgerError::ClosedLoanTarget {
                loan_id: loan.loan_id,
            });
        }
        if let Some(expected) = instruction.expected_version {
            if loan.version != expected {
                return Err(LedgerError::ConcurrentModification {
                    loan_id: loan.loan_id,
                    expected,
                    actual: loan.version,
                });
            }
        }
        if request.payment_date < loan.start_date {
            return Err(LedgerError::InvalidDate {
                date: request.payment_date,
                start_date: loan.start_date,
            });
        }
    }

    let mut remaining = request.amount;
    let mut allocations = Vec::with_capacity(request.targets.len());

    for instruction in &request.targets {
        if remaining.is_zero() {
            break;
        }

        let loan = staged
            .get_mut(&instruction.loan_id)
            .ok_or(LedgerError::LoanNotFound {
                loan_id: instruction.loan_id,
            })?;

        let interest_due = loan.interest_due(request.payment_date);
        let split = if instruction.is_explicit() {
            explicit_split(instruction, loan, interest_due, remaining)?
        } else {
            waterfall_split(loan, interest_due, remaining)
        };

        let record = Allocation {
            loan_id: loan.loan_id,
            split,
            interest_due_at_payment_time: interest_due,
            checkpoint_interest_before: loan.accrued_interest,
            checkpoint_date_before: loan.checkpoint_date,
            status_before: loan.status,
        };

        loan.settle(interest_due, split, request.payment_date);
        remaining -= split.total();
        allocations.push(record);
    }

    if remaining.is_positive() {
        match request.overpayment {
            OverpaymentPolicy::Reject => {
                return Err(LedgerError::UnallocatedRemainder {
                    remainder: remaining,
                });
            }
            OverpaymentPolicy::LeaveUnallocated => {}
        }
    }

    Ok((allocations, remaining))
}

/// interest first, then principal, each capped by what is owed
fn waterfall_split(loan: &Loan, interest_due: Money, available: Money) -> AllocationSplit {
    let interest_paid = available.min(interest_due);
    let principal_paid = (available - interest_paid).min(loan.remaining_principal);
    AllocationSplit {
        interest_paid,
        principal_paid,
    }
}

/// validate a caller-supplied split against what the loan actually owes
fn explicit_split(
    instruction: &AllocationInstruction,
    loan: &Loan,
    interest_due: Money,
    available: Money,
) -> Result<AllocationSplit> {
    let interest_paid = instruction.interest.unwrap_or(Money::ZERO);
    let principal_paid = instruction.principal.unwrap_or(Money::ZERO);

    if interest_paid.is_negative() || principal_paid.is_negative() {
        return Err(LedgerError::InvalidPaymentAmount {
            amount: interest_paid.min(principal_paid),
        });
    }
    if interest_paid > interest_due {
        return Err(LedgerError::OverAllocation {
            loan_id: loan.loan_id,
            component: "interest",
            due: interest_due,
            requested: interest_paid,
        });
    }
    if principal_paid > loan.remaining_principal {
        return Err(LedgerError::OverAllocation {
            loan_id: loan.loan_id,
            component: "principal",
            due: loan.remaining_principal,
            requested: principal_paid,
        });
    }
    let total = interest_paid + principal_paid;
    if total > available {
        return Err(LedgerError::OverAllocation {
            loan_id: loan.loan_id,
            component: "payment",
            due: available,
            requested: total,
        });
    }

    Ok(AllocationSplit {
        interest_paid,
        principal_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::policy::InterestPolicy;
    use crate::types::LoanStatus;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stage(loans: Vec<Loan>) -> HashMap<LoanId, Loan> {
        loans.into_iter().map(|l| (l.loan_id, l)).collect()
    }

    fn loan_with_checkpoint(
        workspace: Uuid,
        principal: i64,
        checkpoint_interest: i64,
    ) -> Loan {
        let mut loan = Loan::originate(
            workspace,
            Money::from_major(principal),
            date(2024, 1, 1),
            None,
            None,
        )
        .unwrap();
        loan.accrued_interest = Money::from_major(checkpoint_interest);
        loan
    }

    #[test]
    fn test_waterfall_interest_then_principal() {
        // remaining 5000, checkpoint 200, payment 300:
        // interest 200, principal 100 -> remaining 4900, checkpoint 0
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 5_000, 200);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id)],
        );

        let (allocations, unallocated) = allocate(&request, &mut staged).unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].split.interest_paid, Money::from_major(200));
        assert_eq!(allocations[0].split.principal_paid, Money::from_major(100));
        assert_eq!(
            allocations[0].interest_due_at_payment_time,
            Money::from_major(200)
        );
        assert_eq!(unallocated, Money::ZERO);

        let loan = &staged[&loan_id];
        assert_eq!(loan.remaining_principal, Money::from_major(4_900));
        assert_eq!(loan.accrued_interest, Money::ZERO);
        assert_eq!(loan.checkpoint_date, date(2024, 2, 1));
    }

    #[test]
    fn test_full_payment_closes_loan() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 100, 0);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(100),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id)],
        );

        allocate(&request, &mut staged).unwrap();

        let loan = &staged[&loan_id];
        assert_eq!(loan.remaining_principal, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Closed);
    }

    #[test]
    fn test_multi_loan_cascade_in_caller_order() {
        let workspace = Uuid::new_v4();
        let first = loan_with_checkpoint(workspace, 5_000, 200);
        let second = loan_with_checkpoint(workspace, 1_000, 0);
        let (first_id, second_id) = (first.loan_id, second.loan_id);
        let mut staged = stage(vec![first, second]);

        // 5500 satisfies the first loan entirely, 300 flows to the second
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(5_500),
            date(2024, 2, 1),
            vec![
                AllocationInstruction::auto(first_id),
                AllocationInstruction::auto(second_id),
            ],
        );

        let (allocations, unallocated) = allocate(&request, &mut staged).unwrap();

        assert_eq!(allocations[0].split.interest_paid, Money::from_major(200));
        assert_eq!(allocations[0].split.principal_paid, Money::from_major(5_000));
        assert_eq!(allocations[1].split.interest_paid, Money::ZERO);
        assert_eq!(allocations[1].split.principal_paid, Money::from_major(300));
        assert_eq!(unallocated, Money::ZERO);

        assert_eq!(staged[&first_id].status, LoanStatus::Closed);
        assert_eq!(
            staged[&second_id].remaining_principal,
            Money::from_major(700)
        );
    }

    #[test]
    fn test_exhausted_payment_skips_later_targets() {
        let workspace = Uuid::new_v4();
        let first = loan_with_checkpoint(workspace, 300, 0);
        let second = loan_with_checkpoint(workspace, 1_000, 0);
        let (first_id, second_id) = (first.loan_id, second.loan_id);
        let mut staged = stage(vec![first, second]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![
                AllocationInstruction::auto(first_id),
                AllocationInstruction::auto(second_id),
            ],
        );

        let (allocations, _) = allocate(&request, &mut staged).unwrap();

        // the second loan gets no allocation and keeps its checkpoint
        assert_eq!(allocations.len(), 1);
        assert_eq!(staged[&second_id].version, 0);
        assert_eq!(staged[&second_id].checkpoint_date, date(2024, 1, 1));
    }

    #[test]
    fn test_invalid_target_rejected_even_when_amount_exhausted() {
        let workspace = Uuid::new_v4();

        // a closed loan behind one that would absorb the whole payment
        let open = loan_with_checkpoint(workspace, 1_000, 0);
        let mut closed = loan_with_checkpoint(workspace, 100, 0);
        closed.settle(
            Money::ZERO,
            AllocationSplit {
                interest_paid: Money::ZERO,
                principal_paid: Money::from_major(100),
            },
            date(2024, 1, 15),
        );
        let (open_id, closed_id) = (open.loan_id, closed.loan_id);
        let mut staged = stage(vec![open.clone(), closed]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![
                AllocationInstruction::auto(open_id),
                AllocationInstruction::auto(closed_id),
            ],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::ClosedLoanTarget { .. }));

        // same for a stale version on the exhausted target
        let stale = loan_with_checkpoint(workspace, 500, 0);
        let stale_id = stale.loan_id;
        let mut staged = stage(vec![open.clone(), stale]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![
                AllocationInstruction::auto(open_id),
                AllocationInstruction::auto(stale_id).expecting_version(7),
            ],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentModification { .. }));

        // and for a target that does not exist at all
        let mut staged = stage(vec![open]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![
                AllocationInstruction::auto(open_id),
                AllocationInstruction::auto(Uuid::new_v4()),
            ],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::LoanNotFound { .. }));
    }

    #[test]
    fn test_waterfall_uses_live_interest_when_above_checkpoint() {
        let workspace = Uuid::new_v4();
        let policy = InterestPolicy::daily(Rate::from_bps(5), 0).unwrap();
        let mut loan = Loan::originate(
            workspace,
            Money::from_major(10_000),
            date(2024, 1, 1),
            None,
            Some(policy),
        )
        .unwrap();
        loan.accrued_interest = Money::from_major(10);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        // 20 days at 0.05%/day on 10000 = 100, above the 10 checkpoint
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(150),
            date(2024, 1, 21),
            vec![AllocationInstruction::auto(loan_id)],
        );

        let (allocations, _) = allocate(&request, &mut staged).unwrap();
        assert_eq!(allocations[0].split.interest_paid, Money::from_major(100));
        assert_eq!(allocations[0].split.principal_paid, Money::from_major(50));
        assert_eq!(staged[&loan_id].accrued_interest, Money::ZERO);
    }

    #[test]
    fn test_explicit_split_is_validated() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 5_000, 200);
        let loan_id = loan.loan_id;

        // interest above what is due
        let mut staged = stage(vec![loan.clone()]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(500),
            date(2024, 2, 1),
            vec![AllocationInstruction::explicit(
                loan_id,
                Money::from_major(250),
                Money::ZERO,
            )],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::OverAllocation {
                component: "interest",
                ..
            }
        ));

        // principal above what remains
        let mut staged = stage(vec![loan.clone()]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(10_000),
            date(2024, 2, 1),
            vec![AllocationInstruction::explicit(
                loan_id,
                Money::from_major(200),
                Money::from_major(6_000),
            )],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::OverAllocation {
                component: "principal",
                ..
            }
        ));

        // split exceeding the payment amount
        let mut staged = stage(vec![loan.clone()]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(100),
            date(2024, 2, 1),
            vec![AllocationInstruction::explicit(
                loan_id,
                Money::from_major(200),
                Money::ZERO,
            )],
        );
        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::OverAllocation {
                component: "payment",
                ..
            }
        ));

        // a valid explicit split settles normally
        let mut staged = stage(vec![loan]);
        let request = PaymentRequest::new(
            workspace,
            Money::from_major(300),
            date(2024, 2, 1),
            vec![AllocationInstruction::explicit(
                loan_id,
                Money::from_major(200),
                Money::from_major(100),
            )],
        );
        let (allocations, _) = allocate(&request, &mut staged).unwrap();
        assert_eq!(allocations[0].split.principal_paid, Money::from_major(100));
    }

    #[test]
    fn test_overpayment_rejected_by_default() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 100, 0);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(150),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id)],
        );

        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::UnallocatedRemainder { .. }));
    }

    #[test]
    fn test_overpayment_left_unallocated_when_allowed() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 100, 0);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(150),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id)],
        )
        .with_overpayment(OverpaymentPolicy::LeaveUnallocated);

        let (allocations, unallocated) = allocate(&request, &mut staged).unwrap();
        assert_eq!(allocations[0].split.principal_paid, Money::from_major(100));
        assert_eq!(unallocated, Money::from_major(50));
    }

    #[test]
    fn test_closed_loan_rejected() {
        let workspace = Uuid::new_v4();
        let mut loan = loan_with_checkpoint(workspace, 100, 0);
        loan.settle(
            Money::ZERO,
            AllocationSplit {
                interest_paid: Money::ZERO,
                principal_paid: Money::from_major(100),
            },
            date(2024, 1, 15),
        );
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(50),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id)],
        );

        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::ClosedLoanTarget { .. }));
    }

    #[test]
    fn test_stale_version_rejected() {
        let workspace = Uuid::new_v4();
        let mut loan = loan_with_checkpoint(workspace, 1_000, 0);
        loan.version = 4;
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(50),
            date(2024, 2, 1),
            vec![AllocationInstruction::auto(loan_id).expecting_version(3)],
        );

        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::ConcurrentModification { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_nonpositive_amount_rejected() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 1_000, 0);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        for amount in [Money::ZERO, Money::from_major(-10)] {
            let request = PaymentRequest::new(
                workspace,
                amount,
                date(2024, 2, 1),
                vec![AllocationInstruction::auto(loan_id)],
            );
            let err = allocate(&request, &mut staged).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidPaymentAmount { .. }));
        }
    }

    #[test]
    fn test_payment_before_loan_start_rejected() {
        let workspace = Uuid::new_v4();
        let loan = loan_with_checkpoint(workspace, 1_000, 0);
        let loan_id = loan.loan_id;
        let mut staged = stage(vec![loan]);

        let request = PaymentRequest::new(
            workspace,
            Money::from_major(50),
            date(2023, 12, 1),
            vec![AllocationInstruction::auto(loan_id)],
        );

        let err = allocate(&request, &mut staged).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDate { .. }));
    }
}
