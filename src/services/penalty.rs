//! Overtime penalty accrual.
//!
//! A charge applies only for each *completed* interval past expiry: a session
//! fourteen minutes late under a fifteen-minute interval owes nothing yet.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct PenaltyPolicy {
    pub interval_ms: i64,
    pub amount_per_interval: Decimal,
    /// Accrual stops growing after this many intervals. `None` is uncapped.
    pub max_intervals: Option<i64>,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 900_000,
            amount_per_interval: Decimal::from(10),
            max_intervals: Some(192),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PenaltyAccrual {
    pub overtime_ms: i64,
    pub intervals: i64,
    pub penalty_amount: Decimal,
    pub capped: bool,
}

/// Penalty owed at `now` for overtime counted from `expires_at`.
///
/// Amounts past `Decimal::MAX` saturate there.
pub fn accrue(
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    policy: &PenaltyPolicy,
) -> PenaltyAccrual {
    if now <= expires_at || policy.interval_ms <= 0 {
        return PenaltyAccrual::default();
    }

    let overtime_ms = (now - expires_at).num_milliseconds();
    let completed = overtime_ms / policy.interval_ms;

    let (intervals, capped) = match policy.max_intervals {
        Some(max) if completed > max => (max, true),
        _ => (completed, false),
    };

    PenaltyAccrual {
        overtime_ms,
        intervals,
        penalty_amount: Decimal::from(intervals)
            .checked_mul(policy.amount_per_interval)
            .unwrap_or(Decimal::MAX),
        capped,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn expiry() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-14T11:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn nothing_accrues_before_expiry() {
        let accrual = accrue(
            expiry() - Duration::minutes(5),
            expiry(),
            &PenaltyPolicy::default(),
        );
        assert_eq!(accrual, PenaltyAccrual::default());

        let accrual = accrue(expiry(), expiry(), &PenaltyPolicy::default());
        assert_eq!(accrual, PenaltyAccrual::default());
    }

    #[test]
    fn partial_interval_is_never_charged() {
        let policy = PenaltyPolicy::default();
        let accrual = accrue(expiry() + Duration::minutes(14), expiry(), &policy);

        assert_eq!(accrual.overtime_ms, 14 * 60_000);
        assert_eq!(accrual.intervals, 0);
        assert_eq!(accrual.penalty_amount, Decimal::ZERO);

        let just_short = expiry() + Duration::milliseconds(policy.interval_ms - 1);
        assert_eq!(accrue(just_short, expiry(), &policy).penalty_amount, Decimal::ZERO);
    }

    #[test]
    fn charges_exactly_on_interval_boundaries() {
        let policy = PenaltyPolicy::default();

        let one_interval = expiry() + Duration::milliseconds(policy.interval_ms);
        let one = accrue(one_interval, expiry(), &policy);
        assert_eq!(one.intervals, 1);
        assert_eq!(one.penalty_amount, Decimal::from(10));

        let two_intervals = expiry() + Duration::milliseconds(2 * policy.interval_ms);
        let two = accrue(two_intervals, expiry(), &policy);
        assert_eq!(two.intervals, 2);
        assert_eq!(two.penalty_amount, Decimal::from(20));
    }

    #[test]
    fn penalty_never_decreases_over_time() {
        let policy = PenaltyPolicy::default();
        let mut previous = Decimal::ZERO;

        for minute in 0..240 {
            let accrual = accrue(expiry() + Duration::minutes(minute), expiry(), &policy);
            assert!(accrual.penalty_amount >= previous);
            previous = accrual.penalty_amount;
        }
    }

    #[test]
    fn cap_freezes_accrual() {
        let policy = PenaltyPolicy {
            max_intervals: Some(4),
            ..PenaltyPolicy::default()
        };

        let accrual = accrue(expiry() + Duration::hours(10), expiry(), &policy);
        assert!(accrual.capped);
        assert_eq!(accrual.intervals, 4);
        assert_eq!(accrual.penalty_amount, Decimal::from(40));
    }

    #[test]
    fn uncapped_policy_keeps_growing() {
        let policy = PenaltyPolicy {
            max_intervals: None,
            ..PenaltyPolicy::default()
        };

        let accrual = accrue(expiry() + Duration::hours(100), expiry(), &policy);
        assert!(!accrual.capped);
        assert_eq!(accrual.intervals, 400);
        assert_eq!(accrual.penalty_amount, Decimal::from(4000));
    }

    #[test]
    fn huge_amounts_saturate_instead_of_overflowing() {
        let policy = PenaltyPolicy {
            interval_ms: 1,
            amount_per_interval: Decimal::MAX,
            max_intervals: None,
        };

        let accrual = accrue(expiry() + Duration::hours(1), expiry(), &policy);
        assert_eq!(accrual.intervals, 3_600_000);
        assert_eq!(accrual.penalty_amount, Decimal::MAX);
    }
}
