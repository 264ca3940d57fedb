//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RegistryError;

/// Maximum length of a tenant id or a subdomain label
const MAX_LABEL_LEN: usize = 63;

/// Unique identifier for a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// Create a new tenant ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the id is usable as a storage key and a DNS label suffix
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTenantId {
            id: self.0.clone(),
            reason: reason.to_string(),
        };

        if self.0.is_empty() || self.0.len() > MAX_LABEL_LEN {
            return Err(invalid("must be 1-63 characters"));
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("must contain only letters, digits, '-' and '_'"));
        }
        Ok(())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A tunnel as requested by an operator, before the server assigns an id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRequest {
    /// Requested subdomain, namespaced by the tenant on registration
    pub subdomain: String,

    /// Tunnel protocol (http, https, tcp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Client-local address the tunnel forwards to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<String>,
}

impl TunnelRequest {
    /// Create a request for a bare subdomain
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            ..Default::default()
        }
    }

    /// Check the requested subdomain is a single valid DNS label
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidSubdomain {
            subdomain: self.subdomain.clone(),
            reason: reason.to_string(),
        };

        let label = self.subdomain.as_str();
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid("must be 1-63 characters"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("must contain only letters, digits and '-'"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("must not start or end with '-'"));
        }
        Ok(())
    }
}

/// A provisioned tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Server-issued opaque identifier
    pub id: String,

    /// Subdomain as requested
    pub subdomain: String,

    /// Subdomain namespaced by the owning tenant (`<subdomain>.<tenant>`)
    pub effective_subdomain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<String>,
}

impl Tunnel {
    /// Build a tunnel owned by `tenant` from a request and a fresh id
    pub fn provision(id: String, request: TunnelRequest, tenant: &TenantId) -> Self {
        let effective_subdomain = format!("{}.{}", request.subdomain, tenant);
        Self {
            id,
            subdomain: request.subdomain,
            effective_subdomain,
            protocol: request.protocol,
            local_addr: request.local_addr,
        }
    }

    /// Fully qualified public hostname under the server's tunnel domain
    pub fn public_hostname(&self, domain: &str) -> String {
        let domain = domain.trim_matches('.');
        if domain.is_empty() {
            self.effective_subdomain.clone()
        } else {
            format!("{}.{}", self.effective_subdomain, domain)
        }
    }
}

/// A tenant account as stored durably
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Tenant identifier
    #[serde(rename = "user")]
    pub tenant_id: TenantId,

    /// Shared secret; empty disables the password check
    #[serde(rename = "password", default)]
    pub secret: String,

    /// Provisioned tunnels, in request order
    #[serde(rename = "tunnel", default)]
    pub tunnels: Vec<Tunnel>,
}

impl Account {
    /// Whether logins for this account must present a secret
    pub fn requires_secret(&self) -> bool {
        !self.secret.is_empty()
    }
}

/// Body of a provisioning request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "user")]
    pub tenant_id: TenantId,

    #[serde(rename = "password", default)]
    pub secret: String,

    #[serde(rename = "tunnel", default)]
    pub tunnels: Vec<TunnelRequest>,
}

impl RegisterRequest {
    /// Create a new request
    pub fn new(
        tenant_id: impl Into<TenantId>,
        secret: impl Into<String>,
        tunnels: Vec<TunnelRequest>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            secret: secret.into(),
            tunnels,
        }
    }

    /// Validate the tenant id and every requested subdomain
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.tenant_id.validate()?;
        self.tunnels.iter().try_for_each(TunnelRequest::validate)
    }
}

/// Point-in-time copy of a tenant's transfer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Bytes transferred since the last daily reset
    pub bytes_today: u64,
    /// Bytes transferred over the account's lifetime
    pub bytes_total: u64,
}

/// Account plus usage, as reported to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub account: Account,
    pub usage: UsageSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_subdomain_is_namespaced() {
        let tenant = TenantId::new("alice");
        let tunnel = Tunnel::provision("0011223344556677".into(), TunnelRequest::new("api"), &tenant);
        assert_eq!(tunnel.effective_subdomain, "api.alice");
        assert_eq!(tunnel.subdomain, "api");
    }

    #[test]
    fn test_public_hostname() {
        let tenant = TenantId::new("alice");
        let tunnel = Tunnel::provision("id".into(), TunnelRequest::new("api"), &tenant);
        assert_eq!(tunnel.public_hostname("tunnel.example.com"), "api.alice.tunnel.example.com");
        assert_eq!(tunnel.public_hostname(".tunnel.example.com."), "api.alice.tunnel.example.com");
        assert_eq!(tunnel.public_hostname(""), "api.alice");
    }

    #[test]
    fn test_tenant_id_validation() {
        assert!(TenantId::new("alice").validate().is_ok());
        assert!(TenantId::new("team_a-1").validate().is_ok());
        assert!(TenantId::new("").validate().is_err());
        assert!(TenantId::new("a/b").validate().is_err());
        assert!(TenantId::new("a.b").validate().is_err());
        assert!(TenantId::new("x".repeat(64)).validate().is_err());
    }

    #[test]
    fn test_subdomain_validation() {
        assert!(TunnelRequest::new("api").validate().is_ok());
        assert!(TunnelRequest::new("my-app2").validate().is_ok());
        assert!(TunnelRequest::new("").validate().is_err());
        assert!(TunnelRequest::new("-api").validate().is_err());
        assert!(TunnelRequest::new("a.b").validate().is_err());
    }

    #[test]
    fn test_account_wire_format() {
        let json = r#"{"user":"alice","password":"pw","tunnel":[{"id":"abc","subdomain":"api","effective_subdomain":"api.alice"}]}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.tenant_id.as_str(), "alice");
        assert_eq!(account.secret, "pw");
        assert_eq!(account.tunnels.len(), 1);
        assert!(account.requires_secret());
    }

    #[test]
    fn test_register_request_defaults() {
        let request: RegisterRequest = serde_json::from_str(r#"{"user":"bob"}"#).unwrap();
        assert!(request.secret.is_empty());
        assert!(request.tunnels.is_empty());
        assert!(request.validate().is_ok());
    }
}
