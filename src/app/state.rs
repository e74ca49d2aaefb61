use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::BillingConfig,
    error::EngineError,
    events::{AppEvent, EventBroadcaster},
    managers::{account::AccountManager, session::SessionManager},
    models::{
        account::AccountStanding,
        bill::FinalBill,
        requests::BookingRequest,
        session::{observe, ParkingSession, SessionView},
        types::SettlementChoice,
    },
    services::{
        payment::{PaymentGateway, PaymentReceipt},
        penalty::{self, PenaltyPolicy},
        settlement, standing,
    },
    utils::{
        clock::Clock,
        store::{KeyValueStore, StoreError},
    },
};

fn short(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Owns every mutation of sessions and account standing.
///
/// Mutations for one account run one at a time behind that account's lock and
/// write all touched records in a single store batch.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub accounts: AccountManager,
    pub events: EventBroadcaster,
    store: Arc<dyn KeyValueStore>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    policy: PenaltyPolicy,
    suspension_after: Duration,
    account_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        billing: &BillingConfig,
    ) -> Self {
        Self {
            sessions: SessionManager::new(store.clone()),
            accounts: AccountManager::new(store.clone()),
            events: EventBroadcaster::new(),
            store,
            payments,
            clock,
            policy: billing.penalty_policy(),
            suspension_after: billing.suspension_after(),
            account_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn penalty_policy(&self) -> &PenaltyPolicy {
        &self.policy
    }

    async fn lock_account(&self, account_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .account_locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }

    /// Loads standing and applies any due escalation. Caller holds the account lock.
    fn refresh_standing(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(AccountStanding, bool), EngineError> {
        let current = self.accounts.get_standing(account_id, now)?;

        match standing::escalate(&current, now, self.suspension_after) {
            Some(suspended) => {
                self.accounts.save_standing(&suspended)?;

                tracing::warn!(
                    "Account {} suspended: {} unpaid since {:?}",
                    short(account_id),
                    suspended.outstanding_amount,
                    suspended.deferred_at
                );

                self.events.broadcast(AppEvent::StandingChanged {
                    standing: suspended.clone(),
                });
                Ok((suspended, true))
            }
            None => Ok((current, false)),
        }
    }

    pub async fn standing(&self, account_id: &str) -> Result<AccountStanding, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let (current, _) = self.refresh_standing(account_id, self.now())?;
        Ok(current)
    }

    pub async fn can_book(&self, account_id: &str) -> Result<bool, EngineError> {
        Ok(standing::can_book(&self.standing(account_id).await?))
    }

    pub async fn outstanding(&self, account_id: &str) -> Result<Decimal, EngineError> {
        Ok(standing::get_outstanding(&self.standing(account_id).await?))
    }

    pub async fn book(
        &self,
        account_id: &str,
        req: BookingRequest,
    ) -> Result<ParkingSession, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let now = self.now();

        let (current, _) = self.refresh_standing(account_id, now)?;
        standing::ensure_can_book(&current)?;

        let session = prepare_booking(account_id, req, now)?;

        if let Some(open) = self.sessions.open_session(account_id)? {
            return Err(EngineError::SessionInProgress(open.id));
        }

        let receipt = self.record_booking(&session)?;

        tracing::info!(
            "Session {} booked - Account: {}, Slot: {} at {}, {}h for {} (ref {})",
            short(&session.id),
            short(account_id),
            session.slot_id,
            session.parking_name,
            session.paid_duration_hours,
            session.total_paid_amount,
            receipt.reference.unwrap_or_default()
        );

        self.events.broadcast(AppEvent::SessionBooked {
            session: session.clone(),
        });

        Ok(session)
    }

    /// Charges for a new session and writes it with the history and account index.
    fn record_booking(&self, session: &ParkingSession) -> Result<PaymentReceipt, EngineError> {
        let account_id = session.account_id.as_str();
        let _index = self.accounts.lock_index()?;

        let mut batch = vec![
            self.sessions.record_entry(session)?,
            self.sessions.history_entry(session)?,
        ];
        batch.extend(self.accounts.index_entry(account_id)?);

        let receipt =
            settlement::charge(self.payments.as_ref(), account_id, session.total_paid_amount)?;
        self.commit(account_id, Ok(batch), Some(&receipt))?;

        Ok(receipt)
    }

    /// Writes `batch` in one step. If anything fails after `receipt` was charged, the
    /// charge is refunded so the account ends up exactly as before.
    fn commit(
        &self,
        account_id: &str,
        batch: Result<Vec<(String, String)>, StoreError>,
        receipt: Option<&PaymentReceipt>,
    ) -> Result<(), EngineError> {
        let Err(e) = batch.and_then(|entries| self.store.set_many(entries)) else {
            return Ok(());
        };

        if let Some(receipt) = receipt {
            tracing::error!(
                "Could not record payment {} of {} for account {}, refunding: {}",
                receipt.reference.as_deref().unwrap_or("-"),
                receipt.amount,
                short(account_id),
                e
            );
            self.payments.refund(account_id, receipt);
        }

        Err(e.into())
    }

    pub fn session_view(
        &self,
        account_id: &str,
        session_id: &str,
    ) -> Result<SessionView, EngineError> {
        let session = self.load_session(account_id, session_id)?;
        Ok(observe(&session, self.now(), &self.policy))
    }

    pub fn list_sessions(&self, account_id: &str) -> Result<Vec<SessionView>, EngineError> {
        let now = self.now();

        Ok(self
            .sessions
            .list_sessions(account_id)?
            .iter()
            .map(|session| observe(session, now, &self.policy))
            .collect())
    }

    pub async fn extend(
        &self,
        account_id: &str,
        session_id: &str,
        extension_hours: Decimal,
    ) -> Result<SessionView, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let now = self.now();

        if extension_hours <= Decimal::ZERO {
            return Err(EngineError::InvalidExtension(format!(
                "extension must be a positive number of hours, got {}",
                extension_hours
            )));
        }

        let mut session = self.load_session(account_id, session_id)?;
        if session.is_ended() {
            return Err(EngineError::InvalidExtension(format!(
                "session {} has already ended",
                session_id
            )));
        }

        // Penalty accrued so far is waived once more time is bought.
        let waived = penalty::accrue(now, session.penalty_basis(), &self.policy).penalty_amount;

        // Only the in-memory copy changes until the charge and the write both succeed.
        let cost = session
            .apply_extension(extension_hours, waived, now)
            .ok_or_else(|| {
                EngineError::InvalidExtension(format!(
                    "extending by {}h at {} per hour exceeds the largest payable amount",
                    extension_hours, session.rate_per_hour
                ))
            })?;
        let batch = vec![self.sessions.record_entry(&session)?];

        let receipt = settlement::charge(self.payments.as_ref(), account_id, cost)?;
        self.commit(account_id, Ok(batch), Some(&receipt))?;

        tracing::info!(
            "Session {} extended by {}h for {} - now {}h paid, expires {}, waived penalty {}",
            short(session_id),
            extension_hours,
            cost,
            session.paid_duration_hours,
            session.expires_at(),
            waived
        );

        self.events.broadcast(AppEvent::SessionExtended {
            session: session.clone(),
        });

        Ok(observe(&session, now, &self.policy))
    }

    pub async fn end_session(
        &self,
        account_id: &str,
        session_id: &str,
    ) -> Result<FinalBill, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let now = self.now();

        let mut session = self.load_session(account_id, session_id)?;
        if session.is_ended() {
            return Err(EngineError::SessionAlreadyEnded(session_id.to_string()));
        }

        let bill = session.close(now, &self.policy);
        self.sessions.save_session(&session)?;

        tracing::info!(
            "Session {} ended - base {}, penalty {} ({} intervals), payable {}",
            short(session_id),
            bill.base_amount,
            bill.penalty_amount,
            bill.penalty_intervals,
            bill.total_payable
        );

        self.events.broadcast(AppEvent::SessionEnded { bill: bill.clone() });

        Ok(bill)
    }

    pub async fn settle(
        &self,
        account_id: &str,
        session_id: &str,
        choice: SettlementChoice,
    ) -> Result<AccountStanding, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let now = self.now();

        let mut session = self.load_session(account_id, session_id)?;
        let bill = session
            .final_bill
            .clone()
            .ok_or_else(|| EngineError::BillNotIssued(session_id.to_string()))?;

        if session.settlement.is_some() {
            return Err(EngineError::BillAlreadySettled(session_id.to_string()));
        }

        let (current, _) = self.refresh_standing(account_id, now)?;
        let outcome =
            settlement::settle(&bill, choice, &current, self.payments.as_ref(), now)?;

        session.settlement = Some(outcome.settlement.clone());
        let batch = self
            .accounts
            .standing_entry(&outcome.standing)
            .and_then(|standing| Ok(vec![standing, self.sessions.record_entry(&session)?]));
        self.commit(account_id, batch, outcome.receipt.as_ref())?;

        tracing::info!(
            "Bill for session {} settled via {:?} - account {} now {:?}, outstanding {}",
            short(session_id),
            choice,
            short(account_id),
            outcome.standing.status,
            outcome.standing.outstanding_amount
        );

        self.events.broadcast(AppEvent::BillSettled {
            account_id: account_id.to_string(),
            session_id: session_id.to_string(),
            settlement: outcome.settlement,
        });
        self.events.broadcast(AppEvent::StandingChanged {
            standing: outcome.standing.clone(),
        });

        Ok(outcome.standing)
    }

    pub async fn pay_dues(&self, account_id: &str) -> Result<AccountStanding, EngineError> {
        let _guard = self.lock_account(account_id).await;
        let now = self.now();

        let (current, _) = self.refresh_standing(account_id, now)?;
        let (cleared, receipt) = settlement::clear_dues(&current, self.payments.as_ref(), now)?;

        let batch = self.accounts.standing_entry(&cleared).map(|entry| vec![entry]);
        self.commit(account_id, batch, Some(&receipt))?;

        tracing::info!(
            "Account {} cleared dues of {} (was {:?})",
            short(account_id),
            receipt.amount,
            current.status
        );

        self.events.broadcast(AppEvent::StandingChanged {
            standing: cleared.clone(),
        });

        Ok(cleared)
    }

    /// Views of every session still running, across all known accounts.
    pub fn running_session_views(&self) -> Result<Vec<SessionView>, EngineError> {
        let now = self.now();
        let mut views = Vec::new();

        for account_id in self.accounts.known_accounts()? {
            if let Some(session) = self.sessions.open_session(&account_id)? {
                if !session.is_ended() {
                    views.push(observe(&session, now, &self.policy));
                }
            }
        }

        Ok(views)
    }

    /// Applies overdue-debt escalation to every known account; returns how many changed.
    pub async fn escalate_overdue_accounts(&self) -> Result<usize, EngineError> {
        let mut escalated = 0;

        for account_id in self.accounts.known_accounts()? {
            let _guard = self.lock_account(&account_id).await;
            let (_, changed) = self.refresh_standing(&account_id, self.now())?;
            if changed {
                escalated += 1;
            }
        }

        Ok(escalated)
    }

    fn load_session(
        &self,
        account_id: &str,
        session_id: &str,
    ) -> Result<ParkingSession, EngineError> {
        self.sessions
            .get_session(account_id, session_id)?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }
}

/// Validates a booking request and builds the session it would create.
fn prepare_booking(
    account_id: &str,
    req: BookingRequest,
    now: DateTime<Utc>,
) -> Result<ParkingSession, EngineError> {
    if account_id.trim().is_empty() {
        return Err(EngineError::InvalidBooking("account id is required".into()));
    }
    if req.slot_id.trim().is_empty() {
        return Err(EngineError::InvalidBooking("slot id is required".into()));
    }
    if req.rate_per_hour <= Decimal::ZERO {
        return Err(EngineError::InvalidBooking(format!(
            "rate per hour must be positive, got {}",
            req.rate_per_hour
        )));
    }
    if req.duration_hours <= Decimal::ZERO {
        return Err(EngineError::InvalidBooking(format!(
            "duration must be a positive number of hours, got {}",
            req.duration_hours
        )));
    }

    let (rate, hours) = (req.rate_per_hour, req.duration_hours);
    ParkingSession::book(account_id.to_string(), req, now).ok_or_else(|| {
        EngineError::InvalidBooking(format!(
            "{}h at {} per hour exceeds the largest payable amount",
            hours, rate
        ))
    })
}
