//! Transient per-transaction segment storage
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/<transaction id>/0000     segment 1
//! <root>/<transaction id>/0001     segment 2
//! ...
//! ```
//!
//! File names are the zero-padded segment index (number − 1). Each file holds
//! the raw transformed bytes of one segment and is written via temp + rename,
//! so a reader never sees a half-written segment.

use ebics_core::{EbicsError, EbicsResult};
use std::path::{Path, PathBuf};

use crate::transaction::TransactionId;

#[derive(Debug, Clone)]
pub struct SegmentStore {
    root: PathBuf,
}

impl SegmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transaction_dir(&self, id: &TransactionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn segment_path(&self, id: &TransactionId, number: u32) -> PathBuf {
        self.transaction_dir(id)
            .join(segment_file_name(number.saturating_sub(1)))
    }

    /// Store segment `number` (1-based), replacing nothing: segments are
    /// immutable once written.
    pub fn write(&self, id: &TransactionId, number: u32, bytes: &[u8]) -> EbicsResult<()> {
        check_number(number)?;
        let dir = self.transaction_dir(id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| EbicsError::io(format!("creating segment dir {}", dir.display()), e))?;

        let path = self.segment_path(id, number);
        if path.exists() {
            return Err(EbicsError::io(
                format!("segment {number} of transaction {id}"),
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "segment already written"),
            ));
        }

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, bytes)
            .map_err(|e| EbicsError::io(format!("writing segment temp {}", tmp_path.display()), e))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| EbicsError::io(format!("renaming segment {}", path.display()), e))?;

        tracing::debug!(transaction = %id, segment = number, bytes = bytes.len(), "segment stored");
        Ok(())
    }

    pub fn read(&self, id: &TransactionId, number: u32) -> EbicsResult<Vec<u8>> {
        check_number(number)?;
        let path = self.segment_path(id, number);
        std::fs::read(&path)
            .map_err(|e| EbicsError::io(format!("reading segment {}", path.display()), e))
    }

    pub fn contains(&self, id: &TransactionId, number: u32) -> bool {
        number > 0 && self.segment_path(id, number).is_file()
    }

    /// Whether any storage exists for the transaction
    pub fn exists(&self, id: &TransactionId) -> bool {
        self.transaction_dir(id).is_dir()
    }

    /// Remove the transaction's storage. Returns whether something was removed.
    ///
    /// Best effort: a missing directory is not an error, other failures are
    /// logged and reported as `false`.
    pub fn delete(&self, id: &TransactionId) -> bool {
        let dir = self.transaction_dir(id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::debug!(transaction = %id, "segment storage removed");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(transaction = %id, dir = %dir.display(), "failed to remove segment storage: {e}");
                false
            }
        }
    }
}

/// Four digits, wider indices print in full.
fn segment_file_name(index: u32) -> String {
    format!("{index:04}")
}

fn check_number(number: u32) -> EbicsResult<()> {
    if number == 0 {
        return Err(EbicsError::Config("segment numbers start at 1".into()));
    }
    Ok(())
}
