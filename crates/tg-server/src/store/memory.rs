//! In-memory account store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tg_core::error::StoreError;
use tg_core::traits::{decode_record, record_key, tenant_from_key, AccountStore};
use tg_core::types::Account;

/// Account store that keeps encoded records in a map
///
/// Records are held in their serialized form so loading exercises the same
/// decode path as the disk store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw bytes under a key, bypassing encoding
    pub async fn insert_raw(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.records.lock().await.insert(key.into(), bytes.into());
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        let key = record_key(&account.tenant_id);
        let bytes = serde_json::to_vec(account).map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;
        self.records.lock().await.insert(key, bytes);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Account>, StoreError> {
        let records = self.records.lock().await;
        let mut accounts = Vec::with_capacity(records.len());

        for (key, bytes) in records.iter() {
            let Some(tenant) = tenant_from_key(key) else {
                tracing::debug!("Ignoring record outside the store namespace: {}", key);
                continue;
            };
            match decode_record(key, &tenant, bytes) {
                Ok(account) => accounts.push(account),
                Err(e) => tracing::warn!("Skipping account record: {}", e),
            }
        }

        Ok(accounts)
    }
}
