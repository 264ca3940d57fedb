//! Login authorization

use std::sync::Arc;

use tg_core::error::AuthError;
use tg_core::secret::secrets_match;
use tg_core::types::{Account, TenantId};

use crate::registry::Registry;

/// Decides whether a tunnel client may log in
#[derive(Clone)]
pub struct AuthGate {
    registry: Arc<Registry>,
    /// Ceiling on `bytes_today`; strictly more is denied
    daily_limit_bytes: u64,
}

impl AuthGate {
    /// Create a gate reading from `registry`
    pub fn new(registry: Arc<Registry>, daily_limit_bytes: u64) -> Self {
        Self {
            registry,
            daily_limit_bytes,
        }
    }

    /// The daily transfer ceiling in bytes
    pub fn daily_limit_bytes(&self) -> u64 {
        self.daily_limit_bytes
    }

    /// Authorize a login attempt
    ///
    /// An account with an empty stored secret accepts any supplied secret.
    /// On success the account is returned so the relay can bind its tunnels.
    pub async fn check_login(&self, tenant: &TenantId, secret: &str) -> Result<Account, AuthError> {
        let result = self.decide(tenant, secret).await;
        if let Err(reason) = &result {
            tracing::info!("Login denied for tenant {}: {}", tenant, reason);
        }
        result
    }

    async fn decide(&self, tenant: &TenantId, secret: &str) -> Result<Account, AuthError> {
        let info = self
            .registry
            .get_info(tenant)
            .await
            .ok_or(AuthError::UnknownTenant)?;

        if info.account.requires_secret() && !secrets_match(secret, &info.account.secret) {
            return Err(AuthError::BadCredentials);
        }

        if info.usage.bytes_today > self.daily_limit_bytes {
            return Err(AuthError::QuotaExceeded);
        }

        tracing::debug!("Login accepted for tenant {}", tenant);
        Ok(info.account)
    }
}
