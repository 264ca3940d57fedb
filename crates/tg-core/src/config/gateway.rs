//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default daily transfer ceiling (1 GiB)
pub const DEFAULT_DAILY_LIMIT_BYTES: u64 = 1024 * 1024 * 1024;

/// Configuration for the tunnelgate daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address to bind the admin HTTP gateway to
    pub admin_bind_address: String,

    /// Shared secret operators present in the `Auth` header.
    /// When unset, the admin gateway refuses every request.
    pub admin_secret: Option<String>,

    /// Directory holding the sharded account records
    pub data_dir: PathBuf,

    /// Domain under which tunnels are hosted
    pub domain: String,

    /// Upper bound on a single durable account write
    #[serde(with = "duration_secs")]
    pub store_timeout: Duration,

    /// Daily transfer quota
    pub quota: QuotaConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            admin_bind_address: "0.0.0.0:4446".to_string(),
            admin_secret: None,
            data_dir: super::default_config_dir().join("accounts"),
            domain: "tunnel.localhost".to_string(),
            store_timeout: Duration::from_secs(10),
            quota: QuotaConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// The admin secret, if one is configured and non-empty
    pub fn admin_secret(&self) -> Option<&str> {
        self.admin_secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// Per-tenant transfer quota
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Bytes a tenant may transfer per interval before logins are denied
    pub daily_limit_bytes: u64,

    /// Wall-clock interval between counter resets.
    /// Not aligned to any calendar boundary.
    #[serde(with = "duration_secs")]
    pub reset_interval: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit_bytes: DEFAULT_DAILY_LIMIT_BYTES,
            reset_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

// Durations are written as whole seconds
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quota() {
        let config = GatewayConfig::default();
        assert_eq!(config.quota.daily_limit_bytes, 1 << 30);
        assert_eq!(config.quota.reset_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn test_empty_admin_secret_counts_as_unset() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.admin_secret(), None);
        config.admin_secret = Some(String::new());
        assert_eq!(config.admin_secret(), None);
        config.admin_secret = Some("s3cret".into());
        assert_eq!(config.admin_secret(), Some("s3cret"));
    }
}
