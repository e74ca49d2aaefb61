use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::{countdown::TimeBreakdown, penalty::PenaltyAccrual};

/// Amount owed for a finished session. Issued once, when the session ends.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FinalBill {
    pub session_id: String,
    pub account_id: String,
    pub slot_id: String,
    pub parking_name: String,
    pub base_amount: Decimal,
    pub penalty_amount: Decimal,
    pub total_payable: Decimal,
    pub penalty_intervals: i64,
    pub overtime_ms: i64,
    pub overtime: TimeBreakdown,
    pub issued_at: DateTime<Utc>,
}

impl FinalBill {
    pub fn new(
        session_id: String,
        account_id: String,
        slot_id: String,
        parking_name: String,
        base_amount: Decimal,
        frozen: PenaltyAccrual,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            account_id,
            slot_id,
            parking_name,
            base_amount,
            penalty_amount: frozen.penalty_amount,
            total_payable: base_amount
                .checked_add(frozen.penalty_amount)
                .unwrap_or(Decimal::MAX),
            penalty_intervals: frozen.intervals,
            overtime_ms: frozen.overtime_ms,
            overtime: TimeBreakdown::from_ms(frozen.overtime_ms),
            issued_at,
        }
    }
}
