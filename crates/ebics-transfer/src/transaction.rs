//! Per-transfer bookkeeping
//!
//! ```text
//! upload:   Created ─► SegmentsWritten(1..=N) ─► Finalized
//! download: Initialized ─► Receiving(1..=N) ─► Finalized
//! ```
//!
//! `Finalized` is terminal. Nothing else moves a transaction between states.

use ebics_core::{EbicsError, EbicsResult, OrderType, TransferDirection};
use ebics_crypto::{DigestValue, SessionKey};
use std::fmt;

/// Local transaction id: a random UUID in simple (32 hex digit) form.
///
/// Doubles as the segment directory name, so only hex digits are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn parse(s: &str) -> EbicsResult<Self> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EbicsError::Config(format!(
                "invalid transaction id '{s}': expected 32 hex digits"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Upload accepted, no segment stored yet
    Created,
    /// Upload segments 1..=n stored
    SegmentsWritten(u32),
    /// Download metadata recorded, no segment received yet
    Initialized,
    /// Download segments 1..=k received
    Receiving(u32),
    Finalized,
}

/// One upload or one download
#[derive(Debug)]
pub struct FileTransaction {
    id: TransactionId,
    direction: TransferDirection,
    order_type: OrderType,
    session_key: SessionKey,
    digest: Option<DigestValue>,
    num_segments: u32,
    segment_number: u32,
    remote_transaction_id: Option<String>,
    state: TransactionState,
}

impl FileTransaction {
    pub(crate) fn upload(order_type: OrderType, session_key: SessionKey) -> Self {
        Self {
            id: TransactionId::generate(),
            direction: TransferDirection::Upload,
            order_type,
            session_key,
            digest: None,
            num_segments: 0,
            segment_number: 0,
            remote_transaction_id: None,
            state: TransactionState::Created,
        }
    }

    pub(crate) fn download(
        order_type: OrderType,
        num_segments: u32,
        session_key: SessionKey,
        remote_transaction_id: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            direction: TransferDirection::Download,
            order_type,
            session_key,
            digest: None,
            num_segments,
            segment_number: 0,
            remote_transaction_id: Some(remote_transaction_id),
            state: TransactionState::Initialized,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn order_type(&self) -> &OrderType {
        &self.order_type
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// SHA-256 of the plaintext: computed for uploads, optionally supplied
    /// for downloads to have the result verified.
    pub fn digest(&self) -> Option<&DigestValue> {
        self.digest.as_ref()
    }

    pub fn num_segments(&self) -> u32 {
        self.num_segments
    }

    /// Last segment stored (upload) or received (download); 0 before the first
    pub fn segment_number(&self) -> u32 {
        self.segment_number
    }

    /// Id assigned by the bank
    pub fn remote_transaction_id(&self) -> Option<&str> {
        self.remote_transaction_id.as_deref()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == TransactionState::Finalized
    }

    /// Record the id the bank assigned in its initialisation response.
    pub fn set_remote_transaction_id(&mut self, id: impl Into<String>) {
        self.remote_transaction_id = Some(id.into());
    }

    /// Have `finalize_download` check the plaintext against this digest.
    pub fn expect_digest(&mut self, digest: DigestValue) {
        self.digest = Some(digest);
    }

    pub(crate) fn record_upload(&mut self, digest: DigestValue, num_segments: u32) {
        self.digest = Some(digest);
        self.num_segments = num_segments;
    }

    pub(crate) fn segment_stored(&mut self, number: u32) {
        self.segment_number = number;
        self.state = match self.direction {
            TransferDirection::Upload => TransactionState::SegmentsWritten(number),
            TransferDirection::Download => TransactionState::Receiving(number),
        };
    }

    pub(crate) fn finalize(&mut self) {
        self.state = TransactionState::Finalized;
    }
}
