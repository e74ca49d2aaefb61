use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    error::EngineError,
    models::{account::AccountStanding, types::AccountStatus},
};

pub fn can_book(standing: &AccountStanding) -> bool {
    standing.status == AccountStatus::Active
}

pub fn get_outstanding(standing: &AccountStanding) -> Decimal {
    standing.outstanding_amount
}

pub fn ensure_can_book(standing: &AccountStanding) -> Result<(), EngineError> {
    if can_book(standing) {
        Ok(())
    } else {
        Err(EngineError::AccountBlocked {
            status: standing.status,
            outstanding: standing.outstanding_amount,
        })
    }
}

/// Promotes a deferred debt to `Suspended` once it has gone unpaid for `after`.
/// Returns `None` when nothing changes.
pub fn escalate(
    standing: &AccountStanding,
    now: DateTime<Utc>,
    after: Duration,
) -> Option<AccountStanding> {
    if standing.status != AccountStatus::PaymentPending {
        return None;
    }

    let due = standing.deferred_at?.checked_add_signed(after)?;
    if now < due {
        return None;
    }

    Some(AccountStanding {
        status: AccountStatus::Suspended,
        updated_at: now,
        ..standing.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(now: DateTime<Utc>) -> AccountStanding {
        AccountStanding::new("acct-1".into(), now).deferred(Decimal::from(60), now)
    }

    #[test]
    fn only_active_accounts_can_book() {
        let now = Utc::now();
        let active = AccountStanding::new("acct-1".into(), now);

        assert!(can_book(&active));
        assert!(ensure_can_book(&active).is_ok());
        assert!(!can_book(&pending(now)));
    }

    #[test]
    fn blocked_error_carries_outstanding_amount() {
        let now = Utc::now();

        match ensure_can_book(&pending(now)) {
            Err(EngineError::AccountBlocked { status, outstanding }) => {
                assert_eq!(status, AccountStatus::PaymentPending);
                assert_eq!(outstanding, Decimal::from(60));
            }
            other => panic!("expected AccountBlocked, got {:?}", other),
        }
        assert_eq!(get_outstanding(&pending(now)), Decimal::from(60));
    }

    #[test]
    fn escalates_after_threshold() {
        let deferred_at = Utc::now();
        let standing = pending(deferred_at);
        let after = Duration::hours(48);

        assert!(escalate(&standing, deferred_at + Duration::hours(47), after).is_none());

        let suspended = escalate(&standing, deferred_at + Duration::hours(48), after).unwrap();
        assert_eq!(suspended.status, AccountStatus::Suspended);
        assert_eq!(suspended.outstanding_amount, Decimal::from(60));
        assert!(!can_book(&suspended));
    }

    #[test]
    fn active_and_suspended_accounts_do_not_escalate() {
        let now = Utc::now();
        let after = Duration::hours(48);
        let active = AccountStanding::new("acct-1".into(), now);

        assert!(escalate(&active, now + Duration::days(30), after).is_none());

        let suspended = escalate(&pending(now), now + after, after).unwrap();
        assert!(escalate(&suspended, now + Duration::days(30), after).is_none());
    }

    #[test]
    fn unreachable_threshold_never_escalates() {
        let deferred_at = Utc::now();

        assert!(escalate(&pending(deferred_at), deferred_at, Duration::MAX).is_none());
    }
}
