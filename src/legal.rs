use rust_decimal_macros::dec;

use crate::decimal::Rate;
use crate::policy::InterestPolicy;
use crate::types::LegalRateAdvice;

/// statutory ceiling on annualized interest: 15% per year
pub fn legal_yearly_ceiling() -> Rate {
    Rate::from_decimal(dec!(0.15))
}

/// annualize a policy's rate and compare against the statutory ceiling
///
/// Advisory only. A non-compliant policy is flagged, never blocked; the UI
/// decides how to present the warning.
pub fn check_legal_rate(policy: &InterestPolicy) -> LegalRateAdvice {
    let yearly_rate = policy.rate().annualized(policy.periods_per_year());
    LegalRateAdvice {
        is_legal: yearly_rate <= legal_yearly_ceiling(),
        yearly_rate,
    }
}
