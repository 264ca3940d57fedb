//! Secret handling and server-issued identifiers
//!
//! Tunnel ids are random bytes drawn from the thread-local CSPRNG (seeded
//! from the OS) and hex-encoded. Secrets are compared in constant time.

use rand::Rng;

use crate::error::RegistryError;

/// Length of a tunnel id in bytes (before hex encoding)
pub const TUNNEL_ID_BYTES: usize = 8;

/// Generate a new tunnel identifier
///
/// Returns a 16-character hex string (8 random bytes). Fails only when the
/// random source fails.
pub fn generate_tunnel_id() -> Result<String, RegistryError> {
    let mut bytes = [0u8; TUNNEL_ID_BYTES];
    rand::thread_rng()
        .try_fill(&mut bytes)
        .map_err(|e| RegistryError::IdGeneration(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Compare two secrets without short-circuiting on the first mismatch
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }

    let mut result = 0u8;
    for (a, b) in provided.bytes().zip(expected.bytes()) {
        result |= a ^ b;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_tunnel_id() {
        let id = generate_tunnel_id().unwrap();
        assert_eq!(id.len(), TUNNEL_ID_BYTES * 2);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_tunnel_id_unique() {
        let a = generate_tunnel_id().unwrap();
        let b = generate_tunnel_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("secret", "secret"));
        assert!(!secrets_match("secret", "wrong!"));
        assert!(!secrets_match("secret", "secre"));
        assert!(secrets_match("", ""));
    }
}
