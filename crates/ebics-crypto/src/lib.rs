//! ebics-crypto: order-data pipeline for EBICS transfers
//!
//! Pipeline (upload): plaintext → SHA-256 digest → deflate → AES-128-CBC (session key) → segment
//! Pipeline (download): segments joined → AES-128-CBC decrypt → inflate → plaintext
//!
//! Key families:
//! ```text
//! Signature (A005 / A006)   order signatures over the plaintext
//! Authentication (X002)     request/response AuthSignature, PKCS#1 v1.5 over a digest
//! Encryption (E002)         RSA transport of the 16-byte per-transaction session key
//! ```
//!
//! The session key never encrypts anything but one transaction's order data,
//! and the RSA keys never encrypt bulk data.

pub mod asymmetric;
pub mod compress;
pub mod digest;
pub mod keys;
pub mod pipeline;
pub mod session;
pub mod signature;
pub mod store;
pub mod subscriber;
pub mod symmetric;

pub use asymmetric::{asymmetric_decrypt, asymmetric_encrypt, decrypt_session_key, encrypt_session_key};
pub use compress::{compress, decompress};
pub use digest::{digest, digest_to_hex, DigestReader, DigestValue};
pub use keys::{public_key_digest, KeyFamily, KeyPair, KeyVersion, PublicKeyInfo};
pub use pipeline::{decode_download, encode_upload, EncodedPayload};
pub use session::{generate_session_key, SessionKey};
pub use signature::{authenticate, sign, sign_with, strip_os_specific, verify, verify_authentication};
pub use store::{KeyStore, MemoryKeyStore};
pub use subscriber::{signature_version, SubscriberKeys};
pub use symmetric::{symmetric_decrypt, symmetric_encrypt};

/// Size of a session key in bytes (AES-128)
pub const SESSION_KEY_SIZE: usize = 16;

/// Size of a SHA-256 digest
pub const DIGEST_SIZE: usize = 32;

/// AES block size; every ciphertext is a multiple of it
pub const BLOCK_SIZE: usize = 16;
