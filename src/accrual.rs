use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::policy::InterestPolicy;
use crate::types::RateMode;

/// calculate interest accrued between a checkpoint and an as-of date
///
/// Pure function: reads nothing but its arguments and mutates nothing, so it
/// is safe to call from concurrent read paths and to re-run with the same
/// inputs. The result is the live accrual only; callers that compare against
/// a stored checkpoint must take `max(live, checkpoint)` themselves.
///
/// Always returns a value >= 0: a zero principal, a zero rate, or an as-of
/// date at or before the checkpoint all yield zero.
pub fn calculate_accrued_interest(
    principal: Money,
    policy: &InterestPolicy,
    checkpoint: NaiveDate,
    as_of: NaiveDate,
) -> Money {
    if principal.is_zero() || principal.is_negative() || policy.rate().is_zero() {
        return Money::ZERO;
    }

    match policy.mode {
        RateMode::Daily => daily_interest(principal, policy, checkpoint, as_of),
        RateMode::Monthly => monthly_interest(principal, policy, checkpoint, as_of),
    }
}

fn daily_interest(
    principal: Money,
    policy: &InterestPolicy,
    checkpoint: NaiveDate,
    as_of: NaiveDate,
) -> Money {
    let elapsed = (as_of - checkpoint).num_days();
    let chargeable = elapsed - i64::from(policy.grace_days);
    if chargeable <= 0 {
        return Money::ZERO;
    }

    principal * policy.rate().as_decimal() * Decimal::from(chargeable)
}

/// monthly accrual in cycles anchored to the policy's anchor day
///
/// The accrual window opens `grace_days` after the checkpoint. Every cycle
/// segment overlapping the window contributes a prorated share of one
/// monthly period; a fully covered cycle contributes exactly
/// `principal * monthly_rate`.
fn monthly_interest(
    principal: Money,
    policy: &InterestPolicy,
    checkpoint: NaiveDate,
    as_of: NaiveDate,
) -> Money {
    let window_start = checkpoint + Duration::days(i64::from(policy.grace_days));
    if as_of <= window_start {
        return Money::ZERO;
    }

    let rate = policy.rate().as_decimal();
    let mut interest = Money::ZERO;
    let mut cycle_start = anchor_on_or_before(window_start, policy.anchor_day);

    loop {
        let cycle_end = next_anchor(cycle_start, policy.anchor_day);

        let seg_start = window_start.max(cycle_start);
        let seg_end = as_of.min(cycle_end);
        if seg_start < seg_end {
            let days_in_cycle = (cycle_end - cycle_start).num_days();
            let seg_days = (seg_end - seg_start).num_days();
            if seg_days == days_in_cycle {
                interest += principal * rate;
            } else {
                interest +=
                    principal * rate * Decimal::from(seg_days) / Decimal::from(days_in_cycle);
            }
        }

        if cycle_end >= as_of {
            break;
        }
        cycle_start = cycle_end;
    }

    interest
}

/// anchor date within a month, clamped to the month's last day
///
/// Anchor 31 in February resolves to Feb 28 (or 29), never panics.
fn clamped_anchor(year: i32, month: u32, anchor_day: u8) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, u32::from(anchor_day))
        .unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // the first of the month always exists
    NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap() - Duration::days(1)
}

/// most recent cycle boundary at or before the given date
fn anchor_on_or_before(date: NaiveDate, anchor_day: u8) -> NaiveDate {
    let this_month = clamped_anchor(date.year(), date.month(), anchor_day);
    if this_month <= date {
        return this_month;
    }

    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    clamped_anchor(year, month, anchor_day)
}

/// cycle boundary following the given boundary
fn next_anchor(boundary: NaiveDate, anchor_day: u8) -> NaiveDate {
    let (year, month) = if boundary.month() == 12 {
        (boundary.year() + 1, 1)
    } else {
        (boundary.year(), boundary.month() + 1)
    };
    clamped_anchor(year, month, anchor_day)
}
