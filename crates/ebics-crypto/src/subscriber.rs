//! The three key pairs a subscriber holds, created and used per `[crypto]` config

use ebics_core::config::CryptoConfig;
use ebics_core::{EbicsError, EbicsResult, Subscriber};

use crate::keys::{KeyFamily, KeyPair, KeyVersion};
use crate::signature::sign_with;
use crate::store::KeyStore;

/// Signature (A005/A006), authentication (X002) and encryption (E002) keys
#[derive(Debug, Clone)]
pub struct SubscriberKeys {
    pub signature: KeyPair,
    pub authentication: KeyPair,
    pub encryption: KeyPair,
}

/// The signature version `crypto.signature_version` names.
pub fn signature_version(config: &CryptoConfig) -> EbicsResult<KeyVersion> {
    let version: KeyVersion = config.signature_version.parse().map_err(|_| {
        EbicsError::Config(format!(
            "unknown signature version '{}'",
            config.signature_version
        ))
    })?;
    if version.family() != KeyFamily::Signature {
        return Err(EbicsError::Config(format!("{version} is not a signature version")));
    }
    Ok(version)
}

impl SubscriberKeys {
    /// Generate all three pairs with `crypto.rsa_key_bits`-long moduli.
    pub fn generate(config: &CryptoConfig) -> EbicsResult<Self> {
        let version = signature_version(config)?;
        let bits = config.rsa_key_bits;
        Ok(Self {
            signature: KeyPair::generate(version, bits)?,
            authentication: KeyPair::generate(KeyVersion::X002, bits)?,
            encryption: KeyPair::generate(KeyVersion::E002, bits)?,
        })
    }

    /// Load the subscriber's pairs; `None` until all three have been saved.
    pub fn load(
        store: &dyn KeyStore,
        subscriber: &Subscriber,
        config: &CryptoConfig,
    ) -> EbicsResult<Option<Self>> {
        let owner = subscriber.user_id.as_str();
        let signature = store.load_key_pair(owner, signature_version(config)?)?;
        let authentication = store.load_key_pair(owner, KeyVersion::X002)?;
        let encryption = store.load_key_pair(owner, KeyVersion::E002)?;
        Ok(match (signature, authentication, encryption) {
            (Some(signature), Some(authentication), Some(encryption)) => Some(Self {
                signature,
                authentication,
                encryption,
            }),
            _ => None,
        })
    }

    pub fn save(&self, store: &dyn KeyStore, subscriber: &Subscriber) -> EbicsResult<()> {
        let owner = subscriber.user_id.as_str();
        store.save_key_pair(owner, &self.signature)?;
        store.save_key_pair(owner, &self.authentication)?;
        store.save_key_pair(owner, &self.encryption)?;
        tracing::info!(user = owner, signature = %self.signature.version(), "subscriber keys saved");
        Ok(())
    }

    /// Order signature over `data` with the configured signature version.
    pub fn sign_order(&self, data: &[u8]) -> EbicsResult<Vec<u8>> {
        sign_with(data, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::verify;
    use crate::store::MemoryKeyStore;

    fn config(version: &str) -> CryptoConfig {
        CryptoConfig {
            signature_version: version.into(),
            rsa_key_bits: 1024,
        }
    }

    fn subscriber() -> Subscriber {
        Subscriber {
            host_id: "EBIXHOST".into(),
            partner_id: "PARTNER1".into(),
            user_id: "USER0001".into(),
        }
    }

    #[test]
    fn test_signature_version_from_config() {
        assert_eq!(signature_version(&config("A005")).unwrap(), KeyVersion::A005);
        assert_eq!(signature_version(&config("A006")).unwrap(), KeyVersion::A006);
        assert!(matches!(signature_version(&config("E002")), Err(EbicsError::Config(_))));
        assert!(matches!(signature_version(&config("A004")), Err(EbicsError::Config(_))));
    }

    #[test]
    fn test_generate_follows_config() {
        let keys = SubscriberKeys::generate(&config("A005")).unwrap();
        assert_eq!(keys.signature.version(), KeyVersion::A005);
        assert_eq!(keys.authentication.version(), KeyVersion::X002);
        assert_eq!(keys.encryption.version(), KeyVersion::E002);
        assert_eq!(keys.encryption.size(), 128);

        let signed = keys.sign_order(b"<Document/>").unwrap();
        verify(b"<Document/>", &signed, keys.signature.public_key(), KeyVersion::A005).unwrap();
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryKeyStore::new();
        let cfg = config("A006");
        assert!(SubscriberKeys::load(&store, &subscriber(), &cfg).unwrap().is_none());

        let keys = SubscriberKeys::generate(&cfg).unwrap();
        keys.save(&store, &subscriber()).unwrap();
        let loaded = SubscriberKeys::load(&store, &subscriber(), &cfg).unwrap().unwrap();
        assert_eq!(loaded.signature.public_key(), keys.signature.public_key());
        assert_eq!(loaded.encryption.public_key(), keys.encryption.public_key());

        // the stored pair is A006; asking for A005 finds nothing
        assert!(SubscriberKeys::load(&store, &subscriber(), &config("A005")).unwrap().is_none());
    }
}
