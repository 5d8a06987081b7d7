//! The order-data transformation, in its fixed order
//!
//! ```text
//! upload:   read ─► SHA-256 (streamed) ─► deflate ─► AES-128-CBC ─► ciphertext
//! download: ciphertext ─► AES-128-CBC⁻¹ ─► inflate ─► [SHA-256 check] ─► plaintext
//! ```
//!
//! The ciphertext is fully materialised: segment sizes depend on its total length.
//! Any stage failure aborts the whole operation and no intermediate bytes escape.

use ebics_core::{EbicsError, EbicsResult};
use std::io::Read;

use crate::compress::{compress_reader, decompress};
use crate::digest::{digest, digest_to_hex, DigestReader, DigestValue};
use crate::session::SessionKey;
use crate::symmetric::{symmetric_decrypt, symmetric_encrypt};

/// Result of running an upload payload through the pipeline
#[derive(Debug)]
pub struct EncodedPayload {
    /// SHA-256 of the original plaintext
    pub digest: DigestValue,
    /// Plaintext length in bytes
    pub plaintext_len: u64,
    /// Compressed and encrypted order data, ready for segmentation
    pub ciphertext: Vec<u8>,
}

/// Digest, compress and encrypt everything `source` yields.
pub fn encode_upload<R: Read>(source: R, key: &SessionKey) -> EbicsResult<EncodedPayload> {
    let mut reader = DigestReader::new(source);
    let compressed = compress_reader(&mut reader)?;
    let (digest, plaintext_len) = reader.finish();
    let ciphertext = symmetric_encrypt(&compressed, key);

    tracing::debug!(
        plaintext = plaintext_len,
        compressed = compressed.len(),
        encrypted = ciphertext.len(),
        "order data encoded"
    );

    Ok(EncodedPayload {
        digest,
        plaintext_len,
        ciphertext,
    })
}

/// Decrypt and inflate the joined order data of a download.
///
/// With `expected_digest`, the recovered plaintext must hash to it.
pub fn decode_download(
    ciphertext: &[u8],
    key: &SessionKey,
    expected_digest: Option<&DigestValue>,
) -> EbicsResult<Vec<u8>> {
    let compressed = symmetric_decrypt(ciphertext, key)?;
    let plaintext = decompress(&compressed)?;

    if let Some(expected) = expected_digest {
        let actual = digest(&plaintext);
        if &actual != expected {
            return Err(EbicsError::crypto(format!(
                "order data digest mismatch: expected {}, got {}",
                digest_to_hex(expected),
                digest_to_hex(&actual)
            )));
        }
    }

    tracing::debug!(
        encrypted = ciphertext.len(),
        plaintext = plaintext.len(),
        "order data decoded"
    );
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;
    use crate::session::generate_session_key;
    use proptest::prelude::*;

    #[test]
    fn test_full_roundtrip() {
        let key = generate_session_key();
        let payload = b"<Document><CstmrCdtTrfInitn/></Document>".repeat(500);

        let encoded = encode_upload(payload.as_slice(), &key).unwrap();
        assert_eq!(encoded.plaintext_len, payload.len() as u64);
        assert_eq!(encoded.digest, digest(&payload));

        let decoded = decode_download(&encoded.ciphertext, &key, Some(&encoded.digest)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_order_is_compress_then_encrypt() {
        let key = SessionKey::from_bytes([3u8; 16]);
        let payload = vec![b'A'; 100_000];
        let encoded = encode_upload(payload.as_slice(), &key).unwrap();

        // decrypting alone must yield a zlib stream, not plaintext
        let inner = symmetric_decrypt(&encoded.ciphertext, &key).unwrap();
        assert_eq!(inner, compress(&payload).unwrap());
        assert!(encoded.ciphertext.len() < payload.len());
    }

    #[test]
    fn test_digest_mismatch_is_rejected() {
        let key = generate_session_key();
        let encoded = encode_upload(&b"payload"[..], &key).unwrap();
        let wrong = digest(b"another payload");
        let err = decode_download(&encoded.ciphertext, &key, Some(&wrong)).unwrap_err();
        assert!(err.to_string().contains("digest mismatch"));
    }

    #[test]
    fn test_wrong_key_never_yields_plaintext() {
        let payload = b"secret statement data".repeat(20);
        let encoded = encode_upload(payload.as_slice(), &generate_session_key()).unwrap();
        let result = decode_download(&encoded.ciphertext, &generate_session_key(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_read_error_is_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "source vanished"))
            }
        }
        let err = encode_upload(Broken, &generate_session_key()).unwrap_err();
        assert!(err.is_io());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(data in proptest::collection::vec(any::<u8>(), 0..=8192)) {
            let key = generate_session_key();
            let encoded = encode_upload(data.as_slice(), &key).unwrap();
            prop_assert_eq!(encoded.digest, digest(&data));
            let decoded = decode_download(&encoded.ciphertext, &key, Some(&encoded.digest)).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
