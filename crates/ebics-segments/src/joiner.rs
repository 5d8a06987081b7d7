//! Reassembly of downloaded segments
//!
//! Segments are appended in ascending order by the caller; the joiner does not
//! reorder them. Decryption and decompression run once over the whole buffer,
//! since both span the entire original payload.

use ebics_core::return_code::EBICS_TX_SEGMENT_NUMBER_UNDERRUN;
use ebics_core::{EbicsError, EbicsResult};
use ebics_crypto::{decode_download, DigestValue, SessionKey};

#[derive(Debug, Default)]
pub struct Joiner {
    buffer: Vec<u8>,
    appended: u32,
    expected: Option<u32>,
}

impl Joiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A joiner that refuses to finish before `num_segments` were appended.
    pub fn expecting(num_segments: u32) -> Self {
        Self {
            expected: Some(num_segments),
            ..Self::default()
        }
    }

    pub fn append(&mut self, segment: &[u8]) {
        self.buffer.extend_from_slice(segment);
        self.appended += 1;
        tracing::trace!(segment = self.appended, len = segment.len(), "segment appended");
    }

    pub fn segments_appended(&self) -> u32 {
        self.appended
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The joined transformed bytes, without decoding.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Decrypt and inflate the joined buffer.
    pub fn finish(self, key: &SessionKey) -> EbicsResult<Vec<u8>> {
        self.finish_verified(key, None)
    }

    /// Like [`Joiner::finish`], additionally checking the plaintext digest.
    pub fn finish_verified(self, key: &SessionKey, expected_digest: Option<&DigestValue>) -> EbicsResult<Vec<u8>> {
        if let Some(expected) = self.expected {
            if self.appended != expected {
                return Err(EbicsError::protocol(
                    EBICS_TX_SEGMENT_NUMBER_UNDERRUN,
                    format!("joined {} of {expected} segments", self.appended),
                ));
            }
        }
        decode_download(&self.buffer, key, expected_digest)
    }
}
