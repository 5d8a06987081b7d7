//! Per-transaction session keys ("nonce" in EBICS terms)

use ebics_core::{EbicsError, EbicsResult};
use rand::RngCore;
use zeroize::Zeroize;

use crate::SESSION_KEY_SIZE;

/// A 128-bit AES key used for exactly one transaction. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    bytes: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build from a decrypted transaction key, rejecting any other length.
    pub fn from_slice(bytes: &[u8]) -> EbicsResult<Self> {
        let arr: [u8; SESSION_KEY_SIZE] = bytes.try_into().map_err(|_| {
            EbicsError::crypto(format!(
                "session key has wrong size: {} bytes (expected {SESSION_KEY_SIZE})",
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh session key from the thread-local CSPRNG.
pub fn generate_session_key() -> SessionKey {
    let mut bytes = [0u8; SESSION_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    SessionKey::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keys_differ() {
        let k1 = generate_session_key();
        let k2 = generate_session_key();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(SessionKey::from_slice(&[7u8; 16]).is_ok());
        assert!(SessionKey::from_slice(&[7u8; 15]).is_err());
        assert!(SessionKey::from_slice(&[7u8; 32]).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let key = SessionKey::from_bytes([0xAB; SESSION_KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }
}
