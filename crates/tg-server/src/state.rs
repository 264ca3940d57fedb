//! Shared gateway state

use std::sync::Arc;

use tg_core::config::GatewayConfig;
use tg_core::traits::AccountStore;
use tg_core::types::Account;

use crate::auth::AuthGate;
use crate::registry::Registry;

/// State shared by the admin gateway, the auth gate and the quota task
///
/// Constructed once at startup and handed to every consumer; nothing reaches
/// the registry through a global.
pub struct GatewayState {
    /// Configuration
    pub config: GatewayConfig,
    /// Tenant registry
    pub registry: Arc<Registry>,
    /// Login authorization
    pub auth: AuthGate,
}

impl GatewayState {
    /// Create gateway state persisting through `store`
    pub fn new(config: GatewayConfig, store: Arc<dyn AccountStore>) -> Self {
        let registry = Arc::new(Registry::new(store, config.store_timeout));
        Self::with_registry(config, registry)
    }

    /// Create gateway state around an existing registry
    pub fn with_registry(config: GatewayConfig, registry: Arc<Registry>) -> Self {
        let auth = AuthGate::new(Arc::clone(&registry), config.quota.daily_limit_bytes);
        Self {
            config,
            registry,
            auth,
        }
    }

    /// Public hostnames the relay should bind for an authorized account
    pub fn public_hostnames(&self, account: &Account) -> Vec<String> {
        account
            .tunnels
            .iter()
            .map(|tunnel| tunnel.public_hostname(&self.config.domain))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_core::types::{RegisterRequest, TunnelRequest};

    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_public_hostnames_after_login() {
        let config = GatewayConfig {
            domain: "tunnel.example.com".to_string(),
            ..Default::default()
        };
        let state = GatewayState::new(config, Arc::new(MemoryStore::new()));
        state
            .registry
            .register(RegisterRequest::new(
                "alice",
                "secret",
                vec![TunnelRequest::new("api"), TunnelRequest::new("web")],
            ))
            .await
            .unwrap();

        let account = state.auth.check_login(&"alice".into(), "secret").await.unwrap();
        assert_eq!(
            state.public_hostnames(&account),
            vec!["api.alice.tunnel.example.com", "web.alice.tunnel.example.com"]
        );
    }
}
