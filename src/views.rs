/// serialization support for display and persistence collaborators
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::ledger::Ledger;
use crate::legal::check_legal_rate;
use crate::loan::Loan;
use crate::types::{LoanId, LoanStatus, PolicyId, RateMode, WorkspaceId};

/// serializable view of one loan as of a date
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub workspace_id: WorkspaceId,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub balances: BalancesView,
    pub policy: Option<PolicyView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesView {
    pub principal: Money,
    pub remaining_principal: Money,
    /// checkpoint-floored interest owed as of the view date
    pub interest_due: Money,
    pub total_due: Money,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    pub payment_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyView {
    pub policy_id: PolicyId,
    pub version: u32,
    pub mode: RateMode,
    pub rate: Rate,
    pub grace_days: u32,
    pub yearly_rate: Rate,
    pub is_legal: bool,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, as_of: NaiveDate) -> Self {
        LoanView {
            id: loan.loan_id,
            workspace_id: loan.workspace_id,
            status: loan.status,
            start_date: loan.start_date,
            due_date: loan.due_date,
            balances: BalancesView {
                principal: loan.principal,
                remaining_principal: loan.remaining_principal,
                interest_due: loan.interest_due(as_of),
                total_due: loan.total_due(as_of),
                total_interest_paid: loan.total_interest_paid,
                total_principal_paid: loan.total_principal_paid,
                payment_count: loan.payment_count,
            },
            policy: loan.policy.as_ref().map(|policy| {
                let advice = check_legal_rate(policy);
                PolicyView {
                    policy_id: policy.policy_id,
                    version: policy.version,
                    mode: policy.mode,
                    rate: policy.rate(),
                    grace_days: policy.grace_days,
                    yearly_rate: advice.yearly_rate,
                    is_legal: advice.is_legal,
                }
            }),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// serializable view of a workspace's loans
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceView {
    pub workspace_id: WorkspaceId,
    pub as_of: NaiveDate,
    pub loans: Vec<LoanView>,
    pub total_outstanding: Money,
}

impl WorkspaceView {
    pub fn from_ledger(ledger: &Ledger, workspace_id: WorkspaceId, as_of: NaiveDate) -> Self {
        let loans: Vec<LoanView> = ledger
            .loans_in_workspace(workspace_id)
            .into_iter()
            .map(|loan| LoanView::from_loan(loan, as_of))
            .collect();
        let total_outstanding = loans
            .iter()
            .fold(Money::ZERO, |acc, view| acc + view.balances.total_due);

        WorkspaceView {
            workspace_id,
            as_of,
            loans,
            total_outstanding,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
