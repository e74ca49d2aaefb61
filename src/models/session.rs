use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{
        bill::FinalBill,
        requests::BookingRequest,
        types::{SessionState, SettlementChoice},
    },
    services::{
        countdown::{self, Countdown, TimeBreakdown},
        penalty::{self, PenaltyAccrual, PenaltyPolicy},
    },
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Extension {
    pub hours: Decimal,
    pub amount: Decimal,
    pub extended_at: DateTime<Utc>,
    /// Overtime penalty that had accrued when the extension was bought and was dropped.
    pub waived_penalty: Decimal,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Settlement {
    pub choice: SettlementChoice,
    pub amount_charged: Decimal,
    pub payment_reference: Option<String>,
    pub settled_at: DateTime<Utc>,
}

/// One reservation of one slot by one account.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ParkingSession {
    pub id: String,
    pub account_id: String,
    pub slot_id: String,
    pub parking_id: String,
    pub parking_name: String,
    pub rate_per_hour: Decimal,
    pub paid_duration_hours: Decimal,
    pub total_paid_amount: Decimal,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Penalty never accrues from before this instant; set by each extension.
    #[serde(default)]
    pub penalty_from: Option<DateTime<Utc>>,
    pub extensions: Vec<Extension>,
    pub final_bill: Option<FinalBill>,
    pub settlement: Option<Settlement>,
}

impl ParkingSession {
    /// `None` when the booking total is too large to represent.
    pub fn book(account_id: String, req: BookingRequest, now: DateTime<Utc>) -> Option<Self> {
        let total_paid_amount = req.rate_per_hour.checked_mul(req.duration_hours)?;

        Some(Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            total_paid_amount,
            slot_id: req.slot_id,
            parking_id: req.parking_id,
            parking_name: req.parking_name,
            rate_per_hour: req.rate_per_hour,
            paid_duration_hours: req.duration_hours,
            started_at: now,
            ended_at: None,
            penalty_from: None,
            extensions: Vec::new(),
            final_bill: None,
            settlement: None,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        countdown::expires_at(self.started_at, self.paid_duration_hours)
    }

    /// Instant overtime penalty is counted from: expiry, or the latest extension if that
    /// came later.
    pub fn penalty_basis(&self) -> DateTime<Utc> {
        let expires_at = self.expires_at();
        match self.penalty_from {
            Some(from) => from.max(expires_at),
            None => expires_at,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// True while the session still occupies the account: running, or ended with an open bill.
    pub fn is_open(&self) -> bool {
        !self.is_ended() || self.settlement.is_none()
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_ended() {
            SessionState::Ended
        } else if countdown::compute(now, self.started_at, self.paid_duration_hours).expired {
            SessionState::Overtime
        } else {
            SessionState::Active
        }
    }

    pub fn extension_cost(&self, hours: Decimal) -> Option<Decimal> {
        hours.checked_mul(self.rate_per_hour)
    }

    /// Records a paid extension and returns its cost. Hours and amount move together.
    ///
    /// Penalty accrued up to `now` is dropped. If the extra hours do not reach past
    /// `now` the session stays overdue and accrues again from `now`. Returns `None`,
    /// leaving the session untouched, when the new totals are not representable.
    pub fn apply_extension(
        &mut self,
        hours: Decimal,
        waived_penalty: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        let amount = self.extension_cost(hours)?;
        let paid_duration_hours = self.paid_duration_hours.checked_add(hours)?;
        let total_paid_amount = self.total_paid_amount.checked_add(amount)?;

        self.paid_duration_hours = paid_duration_hours;
        self.total_paid_amount = total_paid_amount;
        self.penalty_from = Some(now);
        self.extensions.push(Extension {
            hours,
            amount,
            extended_at: now,
            waived_penalty,
        });
        Some(amount)
    }

    /// Ends the session and issues its bill with the penalty frozen at `now`.
    pub fn close(&mut self, now: DateTime<Utc>, policy: &PenaltyPolicy) -> FinalBill {
        let frozen = penalty::accrue(now, self.penalty_basis(), policy);
        let bill = FinalBill::new(
            self.id.clone(),
            self.account_id.clone(),
            self.slot_id.clone(),
            self.parking_name.clone(),
            self.total_paid_amount,
            frozen,
            now,
        );

        self.ended_at = Some(now);
        self.final_bill = Some(bill.clone());
        bill
    }
}

/// What an observer sees of a session at a given instant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SessionView {
    pub session: ParkingSession,
    pub state: SessionState,
    pub expires_at: DateTime<Utc>,
    pub countdown: Countdown,
    pub penalty: PenaltyAccrual,
    pub overtime: TimeBreakdown,
    pub observed_at: DateTime<Utc>,
}

/// Read-only projection, safe to call from any tick.
pub fn observe(
    session: &ParkingSession,
    now: DateTime<Utc>,
    policy: &PenaltyPolicy,
) -> SessionView {
    let state = session.state_at(now);
    let expires_at = session.expires_at();

    // Ended sessions report the frozen bill figures, not live ones.
    let (countdown, penalty) = match (&session.final_bill, session.ended_at) {
        (Some(bill), Some(ended_at)) => (
            countdown::compute(ended_at, session.started_at, session.paid_duration_hours),
            PenaltyAccrual {
                overtime_ms: bill.overtime_ms,
                intervals: bill.penalty_intervals,
                penalty_amount: bill.penalty_amount,
                capped: policy
                    .max_intervals
                    .is_some_and(|max| bill.penalty_intervals >= max),
            },
        ),
        _ => (
            countdown::compute(now, session.started_at, session.paid_duration_hours),
            penalty::accrue(now, session.penalty_basis(), policy),
        ),
    };

    SessionView {
        session: session.clone(),
        state,
        expires_at,
        countdown,
        overtime: TimeBreakdown::from_ms(penalty.overtime_ms),
        penalty,
        observed_at: now,
    }
}
