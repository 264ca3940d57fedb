//! Core error types for tunnelgate

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Provisioning and registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Secret did not match the one stored for an existing tenant
    #[error("Unauthorized: secret mismatch for tenant {0}")]
    Unauthorized(String),

    /// Tenant identifier failed validation
    #[error("Invalid tenant id {id:?}: {reason}")]
    InvalidTenantId { id: String, reason: String },

    /// Requested subdomain failed validation
    #[error("Invalid subdomain {subdomain:?}: {reason}")]
    InvalidSubdomain { subdomain: String, reason: String },

    /// Tunnel identifier could not be generated
    #[error("Tunnel id generation failed: {0}")]
    IdGeneration(String),

    /// An earlier write for this tenant outlived the store timeout and
    /// has not settled yet
    #[error("A previous write for tenant {0} is still in progress")]
    WritePending(String),

    /// Durable write failed
    #[error("Persisting account failed: {0}")]
    Store(#[from] StoreError),
}

impl RegistryError {
    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            RegistryError::Store(_) | RegistryError::WritePending(_)
        )
    }
}

/// Persistent store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure while touching a record
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Account could not be encoded
    #[error("Failed to encode record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Record could not be decoded
    #[error("Failed to decode record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Record sits under a key that names a different tenant
    #[error("Record {key} holds tenant {found}")]
    Misplaced { key: String, found: String },

    /// Write did not finish within the configured bound. It may still land.
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    /// Write task stopped before reporting an outcome
    #[error("Write task aborted: {0}")]
    Aborted(String),
}

/// Reasons the auth gate refuses a login
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No account with that tenant id
    #[error("Unknown tenant")]
    UnknownTenant,

    /// Stored secret is set and the supplied one differs
    #[error("Bad credentials")]
    BadCredentials,

    /// Daily transfer ceiling exceeded
    #[error("Daily transfer quota exceeded")]
    QuotaExceeded,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
