use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::{
    models::account::AccountStanding,
    utils::store::{KeyValueStore, StoreError},
};

const ACCOUNT_INDEX_KEY: &str = "parkease:accounts";

fn standing_key(account_id: &str) -> String {
    format!("parkease:{}:standing", account_id)
}

#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn KeyValueStore>,
    index_lock: Arc<Mutex<()>>,
}

impl AccountManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stored standing, or a fresh `Active` one for an account never seen before.
    pub fn get_standing(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountStanding, StoreError> {
        match self.store.get(&standing_key(account_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(AccountStanding::new(account_id.to_string(), now)),
        }
    }

    pub fn standing_entry(
        &self,
        standing: &AccountStanding,
    ) -> Result<(String, String), StoreError> {
        Ok((
            standing_key(&standing.account_id),
            serde_json::to_string(standing)?,
        ))
    }

    pub fn save_standing(&self, standing: &AccountStanding) -> Result<(), StoreError> {
        let (key, value) = self.standing_entry(standing)?;
        self.store.set(&key, value)
    }

    pub fn known_accounts(&self) -> Result<Vec<String>, StoreError> {
        match self.store.get(ACCOUNT_INDEX_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Serializes read-modify-write of the account index across accounts.
    pub fn lock_index(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.index_lock.lock().map_err(|_| StoreError::Poisoned)
    }

    /// The index entry with `account_id` added, or `None` if it is already listed.
    /// Hold `lock_index` until the entry is written.
    pub fn index_entry(&self, account_id: &str) -> Result<Option<(String, String)>, StoreError> {
        let mut accounts = self.known_accounts()?;
        if accounts.iter().any(|known| known == account_id) {
            return Ok(None);
        }

        accounts.push(account_id.to_string());
        Ok(Some((
            ACCOUNT_INDEX_KEY.to_string(),
            serde_json::to_string(&accounts)?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{models::types::AccountStatus, utils::store::MemoryStore};

    #[test]
    fn unknown_account_starts_active() {
        let manager = AccountManager::new(Arc::new(MemoryStore::new()));
        let standing = manager.get_standing("acct-1", Utc::now()).unwrap();

        assert_eq!(standing.status, AccountStatus::Active);
        assert_eq!(standing.outstanding_amount, Decimal::ZERO);
    }

    #[test]
    fn standing_round_trips_through_store() {
        let manager = AccountManager::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let pending = AccountStanding::new("acct-1".into(), now).deferred(Decimal::from(70), now);

        manager.save_standing(&pending).unwrap();

        assert_eq!(manager.get_standing("acct-1", now).unwrap(), pending);
        assert_eq!(
            manager.get_standing("acct-2", now).unwrap().status,
            AccountStatus::Active
        );
    }

    #[test]
    fn index_lists_each_account_once() {
        let store = Arc::new(MemoryStore::new());
        let manager = AccountManager::new(store.clone());

        for account_id in ["acct-1", "acct-2", "acct-1"] {
            let _guard = manager.lock_index().unwrap();
            if let Some((key, value)) = manager.index_entry(account_id).unwrap() {
                store.set(&key, value).unwrap();
            }
        }

        assert_eq!(manager.known_accounts().unwrap(), vec!["acct-1", "acct-2"]);
        assert!(manager.index_entry("acct-2").unwrap().is_none());
    }
}
