//! Order signatures (A005/A006) and request authentication (X002)
//!
//! Order signatures are computed over the plaintext with CR, LF and Ctrl-Z
//! removed, so a file signed on one platform verifies on another.

use ebics_core::{EbicsError, EbicsResult};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{pkcs1v15, pss, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::digest::DigestValue;
use crate::keys::{KeyFamily, KeyPair, KeyVersion};

/// Bytes removed before an order signature is computed
const OS_SPECIFIC_BYTES: [u8; 3] = [b'\r', b'\n', 0x1A];

/// Remove line-ending and end-of-file bytes.
pub fn strip_os_specific(data: &[u8]) -> Vec<u8> {
    data.iter()
        .copied()
        .filter(|b| !OS_SPECIFIC_BYTES.contains(b))
        .collect()
}

/// Sign order data with a signature key of the given version.
pub fn sign(data: &[u8], private_key: &RsaPrivateKey, version: KeyVersion) -> EbicsResult<Vec<u8>> {
    let message = strip_os_specific(data);
    match version {
        KeyVersion::A005 => pkcs1v15::SigningKey::<Sha256>::new(private_key.clone())
            .try_sign(&message)
            .map(|sig| sig.to_vec())
            .map_err(|e| EbicsError::crypto(format!("A005 signing failed: {e}"))),
        KeyVersion::A006 => pss::BlindedSigningKey::<Sha256>::new(private_key.clone())
            .try_sign_with_rng(&mut rand::thread_rng(), &message)
            .map(|sig| sig.to_vec())
            .map_err(|e| EbicsError::crypto(format!("A006 signing failed: {e}"))),
        other => Err(not_a_signature_version(other)),
    }
}

/// Sign with a signature key pair, using the pair's own version.
pub fn sign_with(data: &[u8], key: &KeyPair) -> EbicsResult<Vec<u8>> {
    sign(data, key.private_key(), key.version())
}

/// Check an order signature.
pub fn verify(
    data: &[u8],
    signature: &[u8],
    public_key: &RsaPublicKey,
    version: KeyVersion,
) -> EbicsResult<()> {
    let message = strip_os_specific(data);
    let result = match version {
        KeyVersion::A005 => {
            let sig = pkcs1v15::Signature::try_from(signature)
                .map_err(|e| EbicsError::crypto(format!("malformed A005 signature: {e}")))?;
            pkcs1v15::VerifyingKey::<Sha256>::new(public_key.clone()).verify(&message, &sig)
        }
        KeyVersion::A006 => {
            let sig = pss::Signature::try_from(signature)
                .map_err(|e| EbicsError::crypto(format!("malformed A006 signature: {e}")))?;
            pss::VerifyingKey::<Sha256>::new(public_key.clone()).verify(&message, &sig)
        }
        other => return Err(not_a_signature_version(other)),
    };
    result.map_err(|_| EbicsError::crypto(format!("{version} signature verification failed")))
}

/// X002 authentication: PKCS#1 v1.5 signature over an already computed SHA-256
/// digest. The result is exactly one modulus wide.
pub fn authenticate(digest: &DigestValue, private_key: &RsaPrivateKey) -> EbicsResult<Vec<u8>> {
    let signature = private_key
        .sign_with_rng(&mut rand::thread_rng(), Pkcs1v15Sign::new::<Sha256>(), digest)
        .map_err(|e| EbicsError::crypto(format!("X002 authentication failed: {e}")))?;
    debug_assert_eq!(signature.len(), private_key.size());
    Ok(signature)
}

pub fn verify_authentication(
    digest: &DigestValue,
    signature: &[u8],
    public_key: &RsaPublicKey,
) -> EbicsResult<()> {
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
        .map_err(|_| EbicsError::crypto("X002 authentication signature mismatch"))
}

fn not_a_signature_version(version: KeyVersion) -> EbicsError {
    debug_assert_ne!(version.family(), KeyFamily::Signature);
    EbicsError::crypto(format!("{version} is not a signature key version"))
}
