//! File transfer manager: drives the pipeline, the segmenter and the segment
//! store for one transaction at a time.
//!
//! The manager holds no per-transaction state of its own; everything lives in
//! the `FileTransaction` the caller owns and in that transaction's directory.
//! Concurrent transactions therefore never share anything mutable.

use ebics_core::config::{TransferConfig, MAX_SEGMENT_SIZE};
use ebics_core::return_code::{EBICS_TX_RECOVERY_SYNC, EBICS_TX_SEGMENT_NUMBER_EXCEEDED};
use ebics_core::{EbicsError, EbicsResult, OrderType, TransferDirection};
use ebics_crypto::{encode_upload, digest_to_hex, SessionKey};
use ebics_segments::{Joiner, Segmenter};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::store::SegmentStore;
use crate::transaction::FileTransaction;

/// What `finalize_download` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Plaintext written to the destination
    Delivered { path: PathBuf, bytes: u64 },
    /// Not every segment arrived; storage was discarded and nothing written
    Abandoned { received: u32, expected: u32 },
    /// The transaction had been finalized before
    AlreadyFinalized,
}

#[derive(Debug, Clone)]
pub struct FileTransferManager {
    store: SegmentStore,
    max_segment_size: usize,
    verify_download_digest: bool,
}

impl FileTransferManager {
    pub fn new(segment_root: impl Into<PathBuf>) -> Self {
        Self {
            store: SegmentStore::new(segment_root),
            max_segment_size: MAX_SEGMENT_SIZE,
            verify_download_digest: true,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            store: SegmentStore::new(config.resolved_segment_dir()),
            max_segment_size: config.segment_size.clamp(1, MAX_SEGMENT_SIZE),
            verify_download_digest: config.verify_download_digest,
        }
    }

    /// Bound segments below the protocol maximum.
    pub fn with_max_segment_size(mut self, size: usize) -> Self {
        self.max_segment_size = size.clamp(1, MAX_SEGMENT_SIZE);
        self
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    // ── upload ──────────────────────────────────────────────────────────────

    /// Transform `payload` and store its segments.
    ///
    /// On any failure the partially written storage is removed before the
    /// error is returned.
    pub fn begin_upload<R: Read>(&self, order_type: OrderType, payload: R) -> EbicsResult<FileTransaction> {
        let mut tx = FileTransaction::upload(order_type, ebics_crypto::generate_session_key());

        let encoded = encode_upload(payload, tx.session_key())?;
        let segmenter = Segmenter::with_max_segment_size(&encoded.ciphertext, self.max_segment_size);
        tx.record_upload(encoded.digest, segmenter.num_segments());

        for (segment, bytes) in segmenter.segments() {
            if let Err(e) = self.store.write(tx.id(), segment.number, bytes) {
                self.store.delete(tx.id());
                return Err(e);
            }
            tx.segment_stored(segment.number);
        }

        tracing::info!(
            transaction = %tx.id(),
            order_type = %tx.order_type(),
            bytes = encoded.plaintext_len,
            segments = tx.num_segments(),
            digest = %digest_to_hex(&encoded.digest),
            "upload prepared"
        );
        Ok(tx)
    }

    /// Stored ciphertext of segment `number` (1-based).
    pub fn read_segment(&self, tx: &FileTransaction, number: u32) -> EbicsResult<Vec<u8>> {
        expect_direction(tx, TransferDirection::Upload)?;
        expect_open(tx)?;
        check_range(number, tx.num_segments())?;
        self.store.read(tx.id(), number)
    }

    /// Remove the upload's storage. Returns whether anything was removed;
    /// safe to call any number of times.
    pub fn finalize_upload(&self, tx: &mut FileTransaction) -> bool {
        let removed = self.store.delete(tx.id());
        if !tx.is_finalized() {
            tracing::info!(transaction = %tx.id(), removed, "upload finalized");
        }
        tx.finalize();
        removed
    }

    // ── download ────────────────────────────────────────────────────────────

    /// Record a download announced by the bank; no content yet.
    pub fn begin_download(
        &self,
        order_type: OrderType,
        num_segments: u32,
        session_key: SessionKey,
        remote_transaction_id: impl Into<String>,
    ) -> EbicsResult<FileTransaction> {
        if num_segments == 0 {
            return Err(EbicsError::malformed("a download has at least one segment"));
        }
        let tx = FileTransaction::download(order_type, num_segments, session_key, remote_transaction_id.into());
        tracing::info!(
            transaction = %tx.id(),
            remote = ?tx.remote_transaction_id(),
            order_type = %tx.order_type(),
            segments = num_segments,
            "download initialised"
        );
        Ok(tx)
    }

    /// Persist received segment `number`. Segments arrive strictly in order.
    pub fn write_segment(&self, tx: &mut FileTransaction, number: u32, bytes: &[u8]) -> EbicsResult<()> {
        expect_direction(tx, TransferDirection::Download)?;
        expect_open(tx)?;
        check_range(number, tx.num_segments())?;
        let next = tx.segment_number() + 1;
        if number != next {
            return Err(EbicsError::protocol(
                EBICS_TX_RECOVERY_SYNC,
                format!("received segment {number}, expected {next}"),
            ));
        }
        self.store.write(tx.id(), number, bytes)?;
        tx.segment_stored(number);
        Ok(())
    }

    /// Join, decrypt and inflate all segments and deliver the plaintext to
    /// `destination`; segment storage is removed in every case.
    ///
    /// The plaintext goes to a sibling temp file first and is renamed into
    /// place, so `destination` never holds partial content.
    pub fn finalize_download(&self, tx: &mut FileTransaction, destination: &Path) -> EbicsResult<DownloadOutcome> {
        expect_direction(tx, TransferDirection::Download)?;
        if tx.is_finalized() {
            return Ok(DownloadOutcome::AlreadyFinalized);
        }
        if tx.segment_number() < tx.num_segments() {
            let outcome = DownloadOutcome::Abandoned {
                received: tx.segment_number(),
                expected: tx.num_segments(),
            };
            self.store.delete(tx.id());
            tx.finalize();
            tracing::warn!(transaction = %tx.id(), ?outcome, "download finalized before all segments arrived");
            return Ok(outcome);
        }

        let result = self.deliver(tx, destination);
        self.store.delete(tx.id());
        tx.finalize();

        let bytes = result?;
        tracing::info!(
            transaction = %tx.id(),
            remote = ?tx.remote_transaction_id(),
            bytes,
            path = %destination.display(),
            "download finalized"
        );
        Ok(DownloadOutcome::Delivered {
            path: destination.to_path_buf(),
            bytes,
        })
    }

    /// Abandon a transaction in either direction.
    pub fn discard(&self, tx: &mut FileTransaction) -> bool {
        let removed = self.store.delete(tx.id());
        tx.finalize();
        removed
    }

    fn deliver(&self, tx: &FileTransaction, destination: &Path) -> EbicsResult<u64> {
        let mut joiner = Joiner::expecting(tx.num_segments());
        for number in 1..=tx.num_segments() {
            joiner.append(&self.store.read(tx.id(), number)?);
        }
        let expected = tx.digest().filter(|_| self.verify_download_digest);
        let plaintext = joiner.finish_verified(tx.session_key(), expected)?;
        write_atomically(destination, &plaintext, tx.id().as_str())?;
        Ok(plaintext.len() as u64)
    }
}

fn write_atomically(destination: &Path, bytes: &[u8], tag: &str) -> EbicsResult<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| EbicsError::io(format!("creating {}", parent.display()), e))?;
    }
    let name = destination
        .file_name()
        .ok_or_else(|| EbicsError::Config(format!("destination {} has no file name", destination.display())))?;
    let tmp_path = destination.with_file_name(format!(".{}.{tag}.partial", name.to_string_lossy()));

    let written = std::fs::File::create(&tmp_path)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp_path, destination));

    if let Err(e) = written {
        if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp_path.display(), "failed to remove partial download: {cleanup}");
            }
        }
        return Err(EbicsError::io(format!("writing {}", destination.display()), e));
    }
    Ok(())
}

fn expect_direction(tx: &FileTransaction, direction: TransferDirection) -> EbicsResult<()> {
    if tx.direction() != direction {
        return Err(EbicsError::Config(format!(
            "transaction {} is a {:?}, not a {direction:?}",
            tx.id(),
            tx.direction()
        )));
    }
    Ok(())
}

fn expect_open(tx: &FileTransaction) -> EbicsResult<()> {
    if tx.is_finalized() {
        return Err(EbicsError::Config(format!("transaction {} is finalized", tx.id())));
    }
    Ok(())
}

fn check_range(number: u32, num_segments: u32) -> EbicsResult<()> {
    if number == 0 || number > num_segments {
        return Err(EbicsError::protocol(
            EBICS_TX_SEGMENT_NUMBER_EXCEEDED,
            format!("segment {number} out of range 1..={num_segments}"),
        ));
    }
    Ok(())
}
