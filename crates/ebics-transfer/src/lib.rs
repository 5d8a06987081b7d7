//! ebics-transfer: upload and download transactions over segment storage
//!
//! # Overview
//! - `transaction`: per-transfer state (`FileTransaction`, `TransactionState`)
//! - `store`: one directory per transaction, one file per segment
//! - `manager`: pipeline + segmenter + store, the upload/download operations
//! - `exchange`: drives a transaction segment by segment over a `Transport`

pub mod exchange;
pub mod manager;
pub mod store;
pub mod transaction;

pub use exchange::{download, upload, DownloadSummary, RequestFactory, UploadSummary};
pub use manager::{DownloadOutcome, FileTransferManager};
pub use store::SegmentStore;
pub use transaction::{FileTransaction, TransactionId, TransactionState};
