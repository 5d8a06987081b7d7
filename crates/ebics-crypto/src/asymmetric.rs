//! RSA PKCS#1 v1.5 encryption, used only to move session keys between parties

use ebics_core::{EbicsError, EbicsResult};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::session::SessionKey;

/// Encrypt a short secret for the holder of `public_key`.
pub fn asymmetric_encrypt(data: &[u8], public_key: &RsaPublicKey) -> EbicsResult<Vec<u8>> {
    public_key
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, data)
        .map_err(|e| {
            EbicsError::crypto(format!(
                "RSA encryption failed ({} bytes for a {}-bit key): {e}",
                data.len(),
                public_key.size() * 8
            ))
        })
}

pub fn asymmetric_decrypt(data: &[u8], private_key: &RsaPrivateKey) -> EbicsResult<Vec<u8>> {
    private_key
        .decrypt(Pkcs1v15Encrypt, data)
        .map_err(|_| EbicsError::crypto("RSA decryption failed: wrong key or corrupted transaction key"))
}

/// Wrap a session key with the counterpart's E002 key.
pub fn encrypt_session_key(key: &SessionKey, public_key: &RsaPublicKey) -> EbicsResult<Vec<u8>> {
    asymmetric_encrypt(key.as_bytes(), public_key)
}

/// Unwrap the transaction key of a download with our own E002 key.
pub fn decrypt_session_key(encrypted: &[u8], private_key: &RsaPrivateKey) -> EbicsResult<SessionKey> {
    let mut raw = asymmetric_decrypt(encrypted, private_key)?;
    let key = SessionKey::from_slice(&raw);
    zeroize::Zeroize::zeroize(&mut raw);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::test_key;
    use crate::keys::KeyVersion;
    use crate::session::generate_session_key;

    #[test]
    fn test_session_key_transport_roundtrip() {
        let pair = test_key(KeyVersion::E002);
        let key = generate_session_key();

        let wrapped = encrypt_session_key(&key, pair.public_key()).unwrap();
        assert_eq!(wrapped.len(), pair.size());

        let unwrapped = decrypt_session_key(&wrapped, pair.private_key()).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let bank = test_key(KeyVersion::E002);
        let other = test_key(KeyVersion::X002);
        let wrapped = encrypt_session_key(&generate_session_key(), bank.public_key()).unwrap();
        assert!(decrypt_session_key(&wrapped, other.private_key()).is_err());
    }

    #[test]
    fn test_oversized_plaintext_rejected() {
        let pair = test_key(KeyVersion::E002);
        let too_long = vec![0u8; pair.size()];
        assert!(asymmetric_encrypt(&too_long, pair.public_key()).is_err());
    }

    #[test]
    fn test_decrypted_key_must_be_16_bytes() {
        let pair = test_key(KeyVersion::E002);
        let wrapped = asymmetric_encrypt(&[1u8; 24], pair.public_key()).unwrap();
        assert_eq!(asymmetric_decrypt(&wrapped, pair.private_key()).unwrap(), vec![1u8; 24]);
        assert!(decrypt_session_key(&wrapped, pair.private_key()).is_err());
    }
}
