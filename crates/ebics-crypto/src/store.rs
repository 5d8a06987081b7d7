//! Key persistence collaborator
//!
//! Long-lived key material is loaded and saved by the embedding application;
//! this core only reads keys through the trait. `MemoryKeyStore` serves tests
//! and short-lived tools.

use ebics_core::EbicsResult;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::keys::{KeyPair, KeyVersion, PublicKeyInfo};

pub trait KeyStore: Send + Sync {
    /// Key pair of a subscriber (`owner` is the user id).
    fn load_key_pair(&self, owner: &str, version: KeyVersion) -> EbicsResult<Option<KeyPair>>;

    fn save_key_pair(&self, owner: &str, key: &KeyPair) -> EbicsResult<()>;

    /// Public key of a counterpart (`owner` is the host id).
    fn load_public_key(&self, owner: &str, version: KeyVersion) -> EbicsResult<Option<PublicKeyInfo>>;

    fn save_public_key(&self, owner: &str, key: &PublicKeyInfo) -> EbicsResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    pairs: Mutex<HashMap<(String, KeyVersion), KeyPair>>,
    public: Mutex<HashMap<(String, KeyVersion), PublicKeyInfo>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_key_pair(&self, owner: &str, version: KeyVersion) -> EbicsResult<Option<KeyPair>> {
        let pairs = self.pairs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(pairs.get(&(owner.to_string(), version)).cloned())
    }

    fn save_key_pair(&self, owner: &str, key: &KeyPair) -> EbicsResult<()> {
        let mut pairs = self.pairs.lock().unwrap_or_else(|e| e.into_inner());
        pairs.insert((owner.to_string(), key.version()), key.clone());
        Ok(())
    }

    fn load_public_key(&self, owner: &str, version: KeyVersion) -> EbicsResult<Option<PublicKeyInfo>> {
        let public = self.public.lock().unwrap_or_else(|e| e.into_inner());
        Ok(public.get(&(owner.to_string(), version)).cloned())
    }

    fn save_public_key(&self, owner: &str, key: &PublicKeyInfo) -> EbicsResult<()> {
        let mut public = self.public.lock().unwrap_or_else(|e| e.into_inner());
        public.insert((owner.to_string(), key.version), key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::test_key;

    #[test]
    fn test_save_and_load_pair() {
        let store = MemoryKeyStore::new();
        let pair = test_key(KeyVersion::E002);
        store.save_key_pair("USER0001", pair).unwrap();

        let loaded = store.load_key_pair("USER0001", KeyVersion::E002).unwrap().unwrap();
        assert_eq!(loaded.public_key(), pair.public_key());
        assert!(store.load_key_pair("USER0001", KeyVersion::X002).unwrap().is_none());
        assert!(store.load_key_pair("USER0002", KeyVersion::E002).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_public_key() {
        let store = MemoryKeyStore::new();
        let info = test_key(KeyVersion::X002).public_info();
        store.save_public_key("EBIXHOST", &info).unwrap();
        assert_eq!(
            store.load_public_key("EBIXHOST", KeyVersion::X002).unwrap(),
            Some(info)
        );
    }
}
