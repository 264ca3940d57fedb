//! Configuration loading for the tunnelgate daemon
//!
//! Settings come from a TOML file. An explicit path must load cleanly; the
//! well-known path under the user config directory is optional and falls
//! back to defaults when missing or unreadable.

mod gateway;

pub use gateway::{GatewayConfig, QuotaConfig, DEFAULT_DAILY_LIMIT_BYTES};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Directory under which tunnelgate keeps its config and account records
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunnelgate")
}

/// Where the daemon looks for `config.toml` when no path is given
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Where a configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// Built-in defaults; carries the rejected file and reason, if any
    Defaults(Option<(PathBuf, String)>),
}

impl GatewayConfig {
    /// Read and check a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(ConfigError::Invalid(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let config: GatewayConfig = toml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Load `explicit` strictly, otherwise the default path leniently
    ///
    /// A bad explicit file is an error. A missing or broken file at the
    /// default location yields defaults, reported through [`ConfigSource`].
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            return Ok((config, ConfigSource::File(path.to_path_buf())));
        }

        Self::load_fallback(&default_config_path())
    }

    fn load_fallback(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok((config, ConfigSource::File(path.to_path_buf()))),
            Err(ConfigError::NotFound(_)) => Ok((Self::default(), ConfigSource::Defaults(None))),
            Err(e) => Ok((
                Self::default(),
                ConfigSource::Defaults(Some((path.to_path_buf(), e.to_string()))),
            )),
        }
    }

    /// Reject settings the daemon cannot run with
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.store_timeout.is_zero() {
            return Err(ConfigError::Invalid("store_timeout must be at least 1s".into()));
        }
        if self.quota.reset_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "quota.reset_interval must be at least 1s".into(),
            ));
        }
        if self.admin_bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid("admin_bind_address is empty".into()));
        }
        Ok(())
    }
}
