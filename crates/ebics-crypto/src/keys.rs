//! RSA key material: subscriber key pairs, bank public keys, EBICS public-key hashes

use ebics_core::{EbicsError, EbicsResult};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::digest::DigestValue;

/// What a key is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Signature,
    Authentication,
    Encryption,
}

/// Key version tag as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyVersion {
    /// Signature, PKCS#1 v1.5 with SHA-256
    A005,
    /// Signature, PSS with SHA-256
    A006,
    /// Authentication, PKCS#1 v1.5 over a SHA-256 digest
    X002,
    /// Encryption, RSA PKCS#1 v1.5 transport of the session key
    E002,
}

impl KeyVersion {
    pub fn family(self) -> KeyFamily {
        match self {
            KeyVersion::A005 | KeyVersion::A006 => KeyFamily::Signature,
            KeyVersion::X002 => KeyFamily::Authentication,
            KeyVersion::E002 => KeyFamily::Encryption,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyVersion::A005 => "A005",
            KeyVersion::A006 => "A006",
            KeyVersion::X002 => "X002",
            KeyVersion::E002 => "E002",
        }
    }
}

impl fmt::Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyVersion {
    type Err = EbicsError;

    fn from_str(s: &str) -> EbicsResult<Self> {
        match s.trim() {
            "A005" => Ok(KeyVersion::A005),
            "A006" => Ok(KeyVersion::A006),
            "X002" => Ok(KeyVersion::X002),
            "E002" => Ok(KeyVersion::E002),
            other => Err(EbicsError::crypto(format!("unsupported key version '{other}'"))),
        }
    }
}

/// A subscriber's RSA key pair. The private half stays in memory only as long
/// as the owning entity keeps it; `rsa` zeroizes it on drop.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    version: KeyVersion,
    created_at: SystemTime,
}

impl KeyPair {
    /// Generate a new key pair with a `bits`-long modulus.
    pub fn generate(version: KeyVersion, bits: usize) -> EbicsResult<Self> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| EbicsError::crypto(format!("RSA key generation failed: {e}")))?;
        tracing::debug!(version = %version, bits, "generated key pair");
        Ok(Self::from_private_key(private, version, SystemTime::now()))
    }

    pub fn from_private_key(private: RsaPrivateKey, version: KeyVersion, created_at: SystemTime) -> Self {
        let public = private.to_public_key();
        Self {
            private,
            public,
            version,
            created_at,
        }
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Modulus length in bytes
    pub fn size(&self) -> usize {
        self.public.size()
    }

    /// EBICS hash of the public half
    pub fn public_key_digest(&self) -> DigestValue {
        public_key_digest(&self.public)
    }

    pub fn public_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            key: self.public.clone(),
            version: self.version,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("version", &self.version)
            .field("bits", &(self.public.size() * 8))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// A counterpart's public key with its version tag (e.g. the bank's X002 and E002 keys)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub key: RsaPublicKey,
    pub version: KeyVersion,
}

impl PublicKeyInfo {
    /// Build from big-endian modulus and exponent bytes as carried in `RSAKeyValue`.
    pub fn from_components(modulus: &[u8], exponent: &[u8], version: KeyVersion) -> EbicsResult<Self> {
        let key = RsaPublicKey::new(BigUint::from_bytes_be(modulus), BigUint::from_bytes_be(exponent))
            .map_err(|e| EbicsError::crypto(format!("invalid {version} public key: {e}")))?;
        Ok(Self { key, version })
    }

    pub fn modulus(&self) -> Vec<u8> {
        self.key.n().to_bytes_be()
    }

    pub fn exponent(&self) -> Vec<u8> {
        self.key.e().to_bytes_be()
    }

    pub fn digest(&self) -> DigestValue {
        public_key_digest(&self.key)
    }
}

/// EBICS public-key hash: SHA-256 over `"<exponent hex> <modulus hex>"`,
/// lower-case, leading zeros removed.
pub fn public_key_digest(key: &RsaPublicKey) -> DigestValue {
    let text = format!(
        "{} {}",
        trimmed_hex(&key.e().to_bytes_be()),
        trimmed_hex(&key.n().to_bytes_be())
    );
    Sha256::digest(text.as_bytes()).into()
}

fn trimmed_hex(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    let trimmed = encoded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
