use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};
use crate::types::{PolicyId, RateMode};

/// interest accrual policy for a loan
///
/// Policies are immutable once created. A loan captures the policy value at
/// origination, so editing a workspace's policy catalogue can never change
/// the arithmetic of loans already referencing an older version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPolicy {
    pub policy_id: PolicyId,
    pub version: u32,
    pub mode: RateMode,
    pub monthly_rate: Option<Rate>,
    pub daily_rate: Option<Rate>,
    /// day of month anchoring the accrual cycle, clamped to short months
    pub anchor_day: u8,
    /// days after the checkpoint before interest starts to apply
    pub grace_days: u32,
}

impl InterestPolicy {
    /// create a monthly-rate policy
    pub fn monthly(rate: Rate, anchor_day: u8, grace_days: u32) -> Result<Self> {
        let policy = Self {
            policy_id: Uuid::new_v4(),
            version: 1,
            mode: RateMode::Monthly,
            monthly_rate: Some(rate),
            daily_rate: None,
            anchor_day,
            grace_days,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// create a daily-rate policy
    pub fn daily(rate: Rate, grace_days: u32) -> Result<Self> {
        let policy = Self {
            policy_id: Uuid::new_v4(),
            version: 1,
            mode: RateMode::Daily,
            monthly_rate: None,
            daily_rate: Some(rate),
            anchor_day: 1,
            grace_days,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// check mode/rate consistency
    ///
    /// Run at creation and after deserialization; the accrual engine assumes
    /// it holds.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            RateMode::Monthly => {
                if self.monthly_rate.is_none() || self.daily_rate.is_some() {
                    return Err(LedgerError::InvalidPolicyConfiguration {
                        message: "monthly mode requires monthly_rate and no daily_rate".to_string(),
                    });
                }
                if !(1..=31).contains(&self.anchor_day) {
                    return Err(LedgerError::InvalidPolicyConfiguration {
                        message: format!("anchor_day {} outside 1-31", self.anchor_day),
                    });
                }
            }
            RateMode::Daily => {
                if self.daily_rate.is_none() || self.monthly_rate.is_some() {
                    return Err(LedgerError::InvalidPolicyConfiguration {
                        message: "daily mode requires daily_rate and no monthly_rate".to_string(),
                    });
                }
            }
        }

        if self.rate().is_negative() {
            return Err(LedgerError::InvalidPolicyConfiguration {
                message: format!("negative rate {}", self.rate()),
            });
        }

        Ok(())
    }

    /// the per-period rate for this policy's mode
    pub fn rate(&self) -> Rate {
        match self.mode {
            RateMode::Monthly => self.monthly_rate.unwrap_or(Rate::ZERO),
            RateMode::Daily => self.daily_rate.unwrap_or(Rate::ZERO),
        }
    }

    /// accrual periods per year for annualization
    pub fn periods_per_year(&self) -> u32 {
        match self.mode {
            RateMode::Monthly => 12,
            RateMode::Daily => 365,
        }
    }
}
