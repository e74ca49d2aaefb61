//! Remaining-time arithmetic for a paid parking window.
//!
//! Everything here is a pure function of its inputs so it can be evaluated from any
//! timer tick, as often as the observer likes.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

pub const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Remaining time under which a session is flagged as ending soon.
pub const ENDING_SOON_MS: i64 = 15 * MS_PER_MINUTE;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimeBreakdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeBreakdown {
    /// Floor decomposition; partial seconds are dropped, never rounded up.
    pub fn from_ms(ms: i64) -> Self {
        let ms = ms.max(0);
        Self {
            hours: ms / MS_PER_HOUR,
            minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub remaining_ms: i64,
    /// Share of the paid window still left, in `0.0..=1.0`.
    pub remaining_fraction: f64,
    pub expired: bool,
    pub ending_soon: bool,
}

/// Paid hours as whole milliseconds. Non-positive durations are zero; durations
/// too long to count saturate at `i64::MAX`.
pub fn paid_duration_ms(paid_duration_hours: Decimal) -> i64 {
    if paid_duration_hours <= Decimal::ZERO {
        return 0;
    }

    paid_duration_hours
        .checked_mul(Decimal::from(MS_PER_HOUR))
        .and_then(|ms| ms.trunc().to_i64())
        .unwrap_or(i64::MAX)
}

/// Expiry instant, clamped to `MAX_UTC` for windows past the end of the calendar.
pub fn expires_at(started_at: DateTime<Utc>, paid_duration_hours: Decimal) -> DateTime<Utc> {
    Duration::try_milliseconds(paid_duration_ms(paid_duration_hours))
        .and_then(|paid| started_at.checked_add_signed(paid))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn compute(
    now: DateTime<Utc>,
    started_at: DateTime<Utc>,
    paid_duration_hours: Decimal,
) -> Countdown {
    let paid_ms = paid_duration_ms(paid_duration_hours);
    let expires_at = expires_at(started_at, paid_duration_hours);

    if paid_ms == 0 || now >= expires_at {
        return Countdown {
            hours: 0,
            minutes: 0,
            seconds: 0,
            remaining_ms: 0,
            remaining_fraction: 0.0,
            expired: true,
            ending_soon: false,
        };
    }

    let remaining_ms = (expires_at - now).num_milliseconds();
    let breakdown = TimeBreakdown::from_ms(remaining_ms);

    Countdown {
        hours: breakdown.hours,
        minutes: breakdown.minutes,
        seconds: breakdown.seconds,
        remaining_ms,
        remaining_fraction: (remaining_ms as f64 / paid_ms as f64).clamp(0.0, 1.0),
        expired: false,
        ending_soon: remaining_ms < ENDING_SOON_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-14T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn not_expired_at_start() {
        let countdown = compute(start(), start(), Decimal::from(2));

        assert!(!countdown.expired);
        assert_eq!((countdown.hours, countdown.minutes, countdown.seconds), (2, 0, 0));
        assert_eq!(countdown.remaining_fraction, 1.0);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let hours = Decimal::new(15, 1);
        let at_expiry = start() + Duration::minutes(90);

        assert!(!compute(at_expiry - Duration::milliseconds(1), start(), hours).expired);

        let countdown = compute(at_expiry, start(), hours);
        assert!(countdown.expired);
        assert_eq!((countdown.hours, countdown.minutes, countdown.seconds), (0, 0, 0));
    }

    #[test]
    fn remaining_time_truncates_to_whole_seconds() {
        let now = start() + Duration::milliseconds(1_500);
        let countdown = compute(now, start(), Decimal::ONE);

        // 3_598_500ms left: 59m 58.5s shows as 59m 58s.
        assert_eq!(countdown.remaining_ms, 3_598_500);
        assert_eq!((countdown.hours, countdown.minutes, countdown.seconds), (0, 59, 58));
    }

    #[test]
    fn non_positive_duration_is_immediately_expired() {
        for hours in [Decimal::ZERO, Decimal::from(-3)] {
            let countdown = compute(start(), start(), hours);
            assert!(countdown.expired);
            assert_eq!(countdown.remaining_ms, 0);
            assert_eq!(countdown.hours, 0);
        }
    }

    #[test]
    fn flags_last_fifteen_minutes() {
        let hours = Decimal::ONE;

        assert!(!compute(start() + Duration::minutes(45), start(), hours).ending_soon);
        assert!(compute(start() + Duration::minutes(46), start(), hours).ending_soon);
    }

    #[test]
    fn repeated_calls_agree() {
        let now = start() + Duration::seconds(1234);
        assert_eq!(
            compute(now, start(), Decimal::from(3)),
            compute(now, start(), Decimal::from(3))
        );
    }

    #[test]
    fn breakdown_keeps_hours_beyond_a_day() {
        let breakdown = TimeBreakdown::from_ms(26 * MS_PER_HOUR + 61_999);
        assert_eq!(
            breakdown,
            TimeBreakdown {
                hours: 26,
                minutes: 1,
                seconds: 1
            }
        );
    }

    #[test]
    fn enormous_duration_never_expires() {
        let hours = Decimal::from_str_exact("100000000000000000000000").unwrap();

        assert_eq!(paid_duration_ms(hours), i64::MAX);
        assert_eq!(expires_at(start(), hours), DateTime::<Utc>::MAX_UTC);

        let countdown = compute(start() + Duration::days(365), start(), hours);
        assert!(!countdown.expired);
        assert!(countdown.remaining_ms > 0);
    }
}
