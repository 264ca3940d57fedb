//! Persistent store traits

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Account, TenantId};

/// Namespace prefix of every account record key
pub const STORE_PREFIX: &str = "tunnelgate";

/// Storage key for a tenant's account record
pub fn record_key(tenant: &TenantId) -> String {
    format!("{}:{}", STORE_PREFIX, tenant)
}

/// Recover the tenant id from a record key, if the key is in our namespace
pub fn tenant_from_key(key: &str) -> Option<TenantId> {
    key.strip_prefix(STORE_PREFIX)
        .and_then(|rest| rest.strip_prefix(':'))
        .filter(|tenant| !tenant.is_empty())
        .map(TenantId::from)
}

/// Decode a record and check it belongs to `expected`
///
/// `key` only labels errors.
pub fn decode_record(key: &str, expected: &TenantId, bytes: &[u8]) -> Result<Account, StoreError> {
    let account: Account = serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        key: key.to_string(),
        source,
    })?;
    if &account.tenant_id != expected {
        return Err(StoreError::Misplaced {
            key: key.to_string(),
            found: account.tenant_id.to_string(),
        });
    }
    Ok(account)
}

/// Durable mirror of the account registry
///
/// The in-memory registry is authoritative while the process runs; a store
/// is read only at startup to hydrate it.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Durably upsert an account. Saving the same account twice is a no-op.
    async fn save(&self, account: &Account) -> Result<(), StoreError>;

    /// Load every decodable account record.
    ///
    /// Records that cannot be read or decoded, or whose key names another
    /// tenant, are skipped with a warning; only a failure to enumerate the
    /// store at all is an error.
    async fn load_all(&self) -> Result<Vec<Account>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key() {
        assert_eq!(record_key(&TenantId::new("alice")), "tunnelgate:alice");
    }

    #[test]
    fn test_tenant_from_key() {
        assert_eq!(tenant_from_key("tunnelgate:alice"), Some(TenantId::new("alice")));
        assert_eq!(tenant_from_key("tunnelgate:"), None);
        assert_eq!(tenant_from_key("other:alice"), None);
        assert_eq!(tenant_from_key("tunnelgatealice"), None);
    }

    #[test]
    fn test_decode_record_checks_owner() {
        let bytes = br#"{"user":"alice","password":"","tunnel":[]}"#;
        let alice = TenantId::new("alice");

        let account = decode_record("tunnelgate:alice", &alice, bytes).unwrap();
        assert_eq!(account.tenant_id, alice);

        let err = decode_record("tunnelgate:mallory", &TenantId::new("mallory"), bytes).unwrap_err();
        assert!(matches!(err, StoreError::Misplaced { ref found, .. } if found == "alice"));

        let err = decode_record("tunnelgate:alice", &alice, b"{").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
