//! SHA-256 digests of order data
//!
//! The upload digest is always taken over the original plaintext. `DigestReader`
//! hashes bytes as they stream into the compressor so the payload is read once.

use sha2::{Digest, Sha256};
use std::io::Read;

use crate::DIGEST_SIZE;

/// A SHA-256 digest (32 bytes)
pub type DigestValue = [u8; DIGEST_SIZE];

/// Hash a byte slice in memory.
pub fn digest(data: &[u8]) -> DigestValue {
    Sha256::digest(data).into()
}

/// Format a digest as lowercase hex (64 chars)
pub fn digest_to_hex(digest: &DigestValue) -> String {
    hex::encode(digest)
}

/// A reader that hashes everything read through it.
pub struct DigestReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Digest of everything read so far, plus the byte count.
    pub fn finish(self) -> (DigestValue, u64) {
        (self.hasher.finalize().into(), self.bytes_read)
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            digest_to_hex(&digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn empty_digest_is_32_bytes() {
        assert_eq!(digest(b"").len(), DIGEST_SIZE);
    }

    proptest! {
        #[test]
        fn streaming_matches_one_shot(data in proptest::collection::vec(any::<u8>(), 0..=8192)) {
            let mut reader = DigestReader::new(data.as_slice());
            let mut sink = Vec::new();
            std::io::copy(&mut reader, &mut sink).unwrap();
            let (streamed, len) = reader.finish();
            prop_assert_eq!(streamed, digest(&data));
            prop_assert_eq!(len as usize, data.len());
            prop_assert_eq!(sink, data);
        }
    }
}
