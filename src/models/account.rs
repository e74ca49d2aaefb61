use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::types::AccountStatus;

/// Booking eligibility of one account.
///
/// `outstanding_amount` is non-zero exactly when `status` is not `Active`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AccountStanding {
    pub account_id: String,
    pub status: AccountStatus,
    pub outstanding_amount: Decimal,
    /// When the current debt was deferred; drives escalation to `Suspended`.
    pub deferred_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl AccountStanding {
    pub fn new(account_id: String, now: DateTime<Utc>) -> Self {
        Self {
            account_id,
            status: AccountStatus::Active,
            outstanding_amount: Decimal::ZERO,
            deferred_at: None,
            updated_at: now,
        }
    }

    pub fn cleared(&self, now: DateTime<Utc>) -> Self {
        Self {
            account_id: self.account_id.clone(),
            status: AccountStatus::Active,
            outstanding_amount: Decimal::ZERO,
            deferred_at: None,
            updated_at: now,
        }
    }

    pub fn deferred(&self, amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            account_id: self.account_id.clone(),
            status: AccountStatus::PaymentPending,
            outstanding_amount: amount,
            deferred_at: Some(now),
            updated_at: now,
        }
    }
}
