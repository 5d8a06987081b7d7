//! AES-128-CBC encryption of order data with the session key
//!
//! Encrypted order data format (binary):
//! ```text
//! [N * 16 bytes: AES-128-CBC ciphertext, IV = 16 zero bytes, ISO 10126 padding]
//! ```
//!
//! A zero IV is safe here because every session key encrypts exactly one
//! message. Padding always adds at least one byte, so empty input yields one block.

use cbc::cipher::block_padding::Iso10126;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ebics_core::{EbicsError, EbicsResult};

use crate::session::SessionKey;
use crate::BLOCK_SIZE;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// Encrypt `plaintext` with the session key.
pub fn symmetric_encrypt(plaintext: &[u8], key: &SessionKey) -> Vec<u8> {
    Aes128CbcEnc::new(key.as_bytes().into(), &ZERO_IV.into())
        .encrypt_padded_vec_mut::<Iso10126>(plaintext)
}

/// Decrypt order data produced by [`symmetric_encrypt`].
pub fn symmetric_decrypt(ciphertext: &[u8], key: &SessionKey) -> EbicsResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(EbicsError::crypto(format!(
            "encrypted order data has invalid length {} (must be a non-zero multiple of {BLOCK_SIZE})",
            ciphertext.len()
        )));
    }

    Aes128CbcDec::new(key.as_bytes().into(), &ZERO_IV.into())
        .decrypt_padded_vec_mut::<Iso10126>(ciphertext)
        .map_err(|_| EbicsError::crypto("order data decryption failed: invalid key or padding"))
}
