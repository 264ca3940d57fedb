//! tg-core: Core abstractions and configuration for tunnelgate
//!
//! This crate provides the tenant entity model, the storage trait, secret
//! handling helpers and configuration structures shared by the server
//! components.

pub mod config;
pub mod error;
pub mod secret;
pub mod traits;
pub mod types;

pub use error::{AuthError, ConfigError, RegistryError, StoreError};
pub use types::{
    Account, RegisterRequest, TenantId, TenantInfo, Tunnel, TunnelRequest, UsageSnapshot,
};
