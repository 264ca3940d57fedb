//! Tenant registry
//!
//! The `Registry` is the authoritative in-memory copy of every tenant
//! account together with its transfer counters. Map membership and counter
//! values sit behind one `RwLock`, so counter updates, the daily reset and
//! provisioning cannot interleave.
//!
//! # Write ordering
//!
//! Provisioning persists the new account to the store while holding the
//! write lock and only then inserts it into the map. A reader never sees an
//! account the store does not hold, and a failed write leaves the map
//! untouched.
//!
//! The write runs as its own task. If it outlives `store_timeout` the
//! caller gets [`StoreError::Timeout`], the lock is released and the tenant
//! is marked unsettled. When the write finally reports, a successful one is
//! published so memory matches the store again. Further provisioning for an
//! unsettled tenant is refused until then, which keeps store writes for one
//! tenant strictly ordered.
//!
//! # Lock contention
//!
//! Holding the write lock across the store write means logins, counter
//! updates and `/info` wait on the disk. The wait is capped by
//! `store_timeout`; provisioning is rare next to logins, so the simpler
//! single-lock model is kept over per-tenant write queues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use tg_core::error::{RegistryError, StoreError};
use tg_core::secret::{generate_tunnel_id, secrets_match};
use tg_core::traits::AccountStore;
use tg_core::types::{Account, RegisterRequest, TenantId, TenantInfo, Tunnel, UsageSnapshot};

/// Source of server-issued tunnel ids
pub type IdGenerator = Arc<dyn Fn() -> Result<String, RegistryError> + Send + Sync>;

/// Account plus its live counters
#[derive(Debug, Clone)]
struct TenantEntry {
    account: Account,
    usage: UsageSnapshot,
}

impl TenantEntry {
    fn info(&self) -> TenantInfo {
        TenantInfo {
            account: self.account.clone(),
            usage: self.usage,
        }
    }
}

#[derive(Debug, Default)]
struct Tenants {
    entries: HashMap<TenantId, TenantEntry>,
    /// Tenants with a timed-out write still in flight
    unsettled: HashSet<TenantId>,
}

impl Tenants {
    fn publish(&mut self, account: Account) {
        match self.entries.get_mut(&account.tenant_id) {
            Some(entry) => entry.account = account,
            None => {
                self.entries.insert(
                    account.tenant_id.clone(),
                    TenantEntry {
                        account,
                        usage: UsageSnapshot::default(),
                    },
                );
            }
        }
    }
}

type WriteTask = JoinHandle<Result<(), StoreError>>;

/// In-memory registry of tenant accounts backed by a durable store
pub struct Registry {
    tenants: Arc<RwLock<Tenants>>,
    store: Arc<dyn AccountStore>,
    store_timeout: Duration,
    next_id: IdGenerator,
}

impl Registry {
    /// Create an empty registry persisting through `store`
    pub fn new(store: Arc<dyn AccountStore>, store_timeout: Duration) -> Self {
        Self {
            tenants: Arc::new(RwLock::new(Tenants::default())),
            store,
            store_timeout,
            next_id: Arc::new(generate_tunnel_id),
        }
    }

    /// Replace the tunnel id source
    pub fn with_id_generator(mut self, next_id: IdGenerator) -> Self {
        self.next_id = next_id;
        self
    }

    /// Load every stored account into the registry
    ///
    /// Undecodable records are skipped by the store. Returns the number of
    /// accounts loaded.
    pub async fn hydrate(&self) -> Result<usize, StoreError> {
        let accounts = self.store.load_all().await?;
        let count = accounts.len();
        for account in accounts {
            self.upsert(account).await;
        }
        tracing::info!("Loaded {} tenant accounts from store", count);
        Ok(count)
    }

    /// Insert or replace an account without persisting it
    ///
    /// Counters of an existing tenant are kept.
    pub async fn upsert(&self, account: Account) {
        let mut tenants = self.tenants.write().await;
        tracing::debug!("Upserting tenant {}", account.tenant_id);
        tenants.publish(account);
    }

    /// Provision or replace a tenant account
    ///
    /// Every requested tunnel gets a fresh server-issued id and a subdomain
    /// namespaced by the tenant. Replacing an existing tenant whose secret is
    /// set requires the same secret. The account is persisted before it
    /// becomes visible; any failure leaves the registry unchanged.
    pub async fn register(&self, request: RegisterRequest) -> Result<Account, RegistryError> {
        request.validate()?;

        let mut tenants = self.tenants.write().await;

        if tenants.unsettled.contains(&request.tenant_id) {
            tracing::warn!(
                "Rejected registration of tenant {}: previous write still in flight",
                request.tenant_id
            );
            return Err(RegistryError::WritePending(request.tenant_id.to_string()));
        }

        if let Some(existing) = tenants.entries.get(&request.tenant_id) {
            let stored = &existing.account;
            if stored.requires_secret() && !secrets_match(&request.secret, &stored.secret) {
                tracing::warn!(
                    "Rejected re-registration of tenant {}: secret mismatch",
                    request.tenant_id
                );
                return Err(RegistryError::Unauthorized(request.tenant_id.to_string()));
            }
        }

        let RegisterRequest {
            tenant_id,
            secret,
            tunnels: requests,
        } = request;

        let tunnels = requests
            .into_iter()
            .map(|req| -> Result<Tunnel, RegistryError> {
                Ok(Tunnel::provision((self.next_id)()?, req, &tenant_id))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                tracing::error!("Tunnel id generation failed for tenant {}: {}", tenant_id, e);
                e
            })?;

        let account = Account {
            tenant_id,
            secret,
            tunnels,
        };

        let mut write = self.spawn_save(account.clone());
        match tokio::time::timeout(self.store_timeout, &mut write).await {
            Ok(joined) => {
                if let Err(e) = flatten(joined) {
                    tracing::error!("Failed to persist tenant {}: {}", account.tenant_id, e);
                    return Err(e.into());
                }
            }
            Err(_) => {
                tracing::error!(
                    "Persisting tenant {} timed out after {:?}; waiting for the write to settle",
                    account.tenant_id,
                    self.store_timeout
                );
                tenants.unsettled.insert(account.tenant_id.clone());
                self.settle_later(write, account);
                return Err(StoreError::Timeout(self.store_timeout).into());
            }
        }

        tracing::info!(
            "Registered tenant {} with {} tunnels",
            account.tenant_id,
            account.tunnels.len()
        );
        tenants.publish(account.clone());
        Ok(account)
    }

    fn spawn_save(&self, account: Account) -> WriteTask {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.save(&account).await })
    }

    /// Publish a timed-out write once its real outcome is known
    fn settle_later(&self, write: WriteTask, account: Account) {
        let tenants = Arc::clone(&self.tenants);
        tokio::spawn(async move {
            let outcome = flatten(write.await);
            let mut tenants = tenants.write().await;
            tenants.unsettled.remove(&account.tenant_id);
            match outcome {
                Ok(()) => {
                    tracing::info!(
                        "Late write for tenant {} completed, publishing",
                        account.tenant_id
                    );
                    tenants.publish(account);
                }
                Err(e) => {
                    tracing::warn!("Late write for tenant {} failed: {}", account.tenant_id, e);
                }
            }
        });
    }

    /// Whether a timed-out write for `tenant` is still in flight
    pub async fn is_unsettled(&self, tenant: &TenantId) -> bool {
        self.tenants.read().await.unsettled.contains(tenant)
    }

    /// Get a tenant's account
    pub async fn get(&self, tenant: &TenantId) -> Option<Account> {
        let tenants = self.tenants.read().await;
        tenants.entries.get(tenant).map(|entry| entry.account.clone())
    }

    /// Get a tenant's account and counters in one consistent read
    pub async fn get_info(&self, tenant: &TenantId) -> Option<TenantInfo> {
        let tenants = self.tenants.read().await;
        tenants.entries.get(tenant).map(TenantEntry::info)
    }

    /// Get a tenant's counters
    pub async fn usage(&self, tenant: &TenantId) -> Option<UsageSnapshot> {
        let tenants = self.tenants.read().await;
        tenants.entries.get(tenant).map(|entry| entry.usage)
    }

    /// Snapshot of every tenant, unordered
    pub async fn snapshot(&self) -> Vec<TenantInfo> {
        let tenants = self.tenants.read().await;
        tenants.entries.values().map(TenantEntry::info).collect()
    }

    /// Snapshot of every tenant as JSON-encoded `TenantInfo` records
    pub async fn list_all(&self) -> Vec<String> {
        self.snapshot()
            .await
            .iter()
            .filter_map(|info| match serde_json::to_string(info) {
                Ok(line) => Some(line),
                Err(e) => {
                    tracing::warn!("Failed to encode tenant {}: {}", info.account.tenant_id, e);
                    None
                }
            })
            .collect()
    }

    /// Add transferred bytes to a tenant's counters
    ///
    /// Called by the relay path. Returns false for unknown tenants.
    pub async fn record_transfer(&self, tenant: &TenantId, bytes: u64) -> bool {
        let mut tenants = self.tenants.write().await;
        match tenants.entries.get_mut(tenant) {
            Some(entry) => {
                entry.usage.bytes_today = entry.usage.bytes_today.saturating_add(bytes);
                entry.usage.bytes_total = entry.usage.bytes_total.saturating_add(bytes);
                true
            }
            None => false,
        }
    }

    /// Zero every tenant's daily counter. Lifetime totals are kept.
    ///
    /// Returns the number of tenants reset.
    pub async fn reset_daily_usage(&self) -> usize {
        let mut tenants = self.tenants.write().await;
        for entry in tenants.entries.values_mut() {
            entry.usage.bytes_today = 0;
        }
        tenants.entries.len()
    }

    /// Number of registered tenants
    pub async fn len(&self) -> usize {
        self.tenants.read().await.entries.len()
    }

    /// Check if no tenants are registered
    pub async fn is_empty(&self) -> bool {
        self.tenants.read().await.entries.is_empty()
    }
}

fn flatten(joined: Result<Result<(), StoreError>, tokio::task::JoinError>) -> Result<(), StoreError> {
    joined.unwrap_or_else(|e| Err(StoreError::Aborted(e.to_string())))
}
