use std::sync::Arc;

use crate::{
    models::session::ParkingSession,
    utils::store::{KeyValueStore, StoreError},
};

fn session_key(account_id: &str, session_id: &str) -> String {
    format!("parkease:{}:session:{}", account_id, session_id)
}

fn history_key(account_id: &str) -> String {
    format!("parkease:{}:sessions", account_id)
}

/// Session records and per-account booking history, kept in the key-value store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get_session(
        &self,
        account_id: &str,
        session_id: &str,
    ) -> Result<Option<ParkingSession>, StoreError> {
        match self.store.get(&session_key(account_id, session_id))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Session ids in booking order, oldest first.
    pub fn history_ids(&self, account_id: &str) -> Result<Vec<String>, StoreError> {
        match self.store.get(&history_key(account_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Sessions newest first.
    pub fn list_sessions(&self, account_id: &str) -> Result<Vec<ParkingSession>, StoreError> {
        let mut sessions = Vec::new();

        for session_id in self.history_ids(account_id)?.iter().rev() {
            if let Some(session) = self.get_session(account_id, session_id)? {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    pub fn open_session(&self, account_id: &str) -> Result<Option<ParkingSession>, StoreError> {
        Ok(self
            .list_sessions(account_id)?
            .into_iter()
            .find(|session| session.is_open()))
    }

    pub fn record_entry(&self, session: &ParkingSession) -> Result<(String, String), StoreError> {
        Ok((
            session_key(&session.account_id, &session.id),
            serde_json::to_string(session)?,
        ))
    }

    /// The history entry with `session` appended.
    pub fn history_entry(&self, session: &ParkingSession) -> Result<(String, String), StoreError> {
        let mut ids = self.history_ids(&session.account_id)?;
        if !ids.contains(&session.id) {
            ids.push(session.id.clone());
        }

        Ok((history_key(&session.account_id), serde_json::to_string(&ids)?))
    }

    pub fn save_session(&self, session: &ParkingSession) -> Result<(), StoreError> {
        let (key, value) = self.record_entry(session)?;
        self.store.set(&key, value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{models::requests::BookingRequest, utils::store::MemoryStore};

    fn session(account_id: &str) -> ParkingSession {
        ParkingSession::book(
            account_id.to_string(),
            BookingRequest {
                slot_id: "B-07".into(),
                parking_id: "airport-t1".into(),
                parking_name: "Airport Terminal 1".into(),
                rate_per_hour: Decimal::from(80),
                duration_hours: Decimal::ONE,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn insert(manager: &SessionManager, store: &MemoryStore, session: &ParkingSession) {
        let entries = vec![
            manager.record_entry(session).unwrap(),
            manager.history_entry(session).unwrap(),
        ];
        store.set_many(entries).unwrap();
    }

    #[test]
    fn records_are_namespaced_per_account() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone());
        let first = session("acct-1");

        insert(&manager, &store, &first);

        assert!(manager.get_session("acct-1", &first.id).unwrap().is_some());
        assert!(manager.get_session("acct-2", &first.id).unwrap().is_none());
        assert!(store
            .get(&format!("parkease:acct-1:session:{}", first.id))
            .unwrap()
            .is_some());
    }

    #[test]
    fn lists_newest_first_and_finds_open_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone());

        let mut older = session("acct-1");
        older.close(Utc::now(), &Default::default());
        older.settlement = Some(crate::models::session::Settlement {
            choice: crate::models::types::SettlementChoice::PayNow,
            amount_charged: Decimal::from(80),
            payment_reference: None,
            settled_at: Utc::now(),
        });
        insert(&manager, &store, &older);

        let newer = session("acct-1");
        insert(&manager, &store, &newer);

        let listed = manager.list_sessions("acct-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(manager.open_session("acct-1").unwrap().unwrap().id, newer.id);
    }
}
