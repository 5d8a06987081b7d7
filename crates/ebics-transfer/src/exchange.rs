//! Segment-by-segment exchange with the bank
//!
//! ```text
//! upload:   init ─► transfer(1) ─► … ─► transfer(N) ─► finalize
//! download: init (segment 1) ─► transfer(2) ─► … ─► transfer(N) ─► finalize ─► receipt
//! ```
//!
//! Request documents come from the caller's [`RequestFactory`]; responses are
//! parsed here. The first non-OK code stops the exchange. Local storage is
//! cleaned up whichever way the exchange ends. There is no retry at this
//! layer.

use ebics_core::return_code::EBICS_TX_RECOVERY_SYNC;
use ebics_core::{EbicsError, EbicsResult, OrderType, Transport};
use ebics_crypto::{DigestValue, KeyPair};
use ebics_protocol::{parse_download_init, parse_download_transfer, parse_envelope, SegmentInfo};
use std::io::Read;
use std::path::Path;

use crate::manager::{DownloadOutcome, FileTransferManager};
use crate::transaction::FileTransaction;

/// Builds the request documents of one exchange.
///
/// Implementations own the XML layout, the subscriber identity and the bank
/// keys (the upload init carries the session key wrapped for the bank).
pub trait RequestFactory {
    fn upload_init(&self, tx: &FileTransaction) -> EbicsResult<Vec<u8>>;

    /// Transfer request carrying upload segment `number`
    fn upload_segment(
        &self,
        tx: &FileTransaction,
        number: u32,
        last: bool,
        segment: &[u8],
    ) -> EbicsResult<Vec<u8>>;

    fn download_init(&self, order_type: &OrderType) -> EbicsResult<Vec<u8>>;

    /// Transfer request asking for download segment `number`
    fn download_segment(&self, remote_transaction_id: &str, number: u32) -> EbicsResult<Vec<u8>>;

    /// Receipt closing a download; `acknowledged` is false after a local failure.
    fn receipt(&self, remote_transaction_id: &str, acknowledged: bool) -> EbicsResult<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub remote_transaction_id: String,
    pub num_segments: u32,
    pub digest: DigestValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub remote_transaction_id: String,
    pub num_segments: u32,
    pub outcome: DownloadOutcome,
}

/// Upload `payload` as one order of `order_type`.
pub fn upload<T, F, R>(
    manager: &FileTransferManager,
    transport: &T,
    factory: &F,
    order_type: OrderType,
    payload: R,
) -> EbicsResult<UploadSummary>
where
    T: Transport + ?Sized,
    F: RequestFactory + ?Sized,
    R: Read,
{
    let mut tx = manager.begin_upload(order_type, payload)?;
    let result = send_upload(manager, transport, factory, &mut tx);
    manager.finalize_upload(&mut tx);
    result
}

fn send_upload<T, F>(
    manager: &FileTransferManager,
    transport: &T,
    factory: &F,
    tx: &mut FileTransaction,
) -> EbicsResult<UploadSummary>
where
    T: Transport + ?Sized,
    F: RequestFactory + ?Sized,
{
    let response = transport.send(&factory.upload_init(tx)?)?;
    let envelope = parse_envelope(&response)?;
    envelope.report()?;
    let remote = envelope.require_transaction_id()?.to_string();
    tx.set_remote_transaction_id(remote.clone());

    let num_segments = tx.num_segments();
    for number in 1..=num_segments {
        let segment = manager.read_segment(tx, number)?;
        let request = factory.upload_segment(tx, number, number == num_segments, &segment)?;
        parse_envelope(&transport.send(&request)?)?.report()?;
        tracing::debug!(remote = %remote, segment = number, of = num_segments, "segment sent");
    }

    tracing::info!(remote = %remote, segments = num_segments, "upload complete");
    Ok(UploadSummary {
        remote_transaction_id: remote,
        num_segments,
        digest: tx.digest().copied().unwrap_or_default(),
    })
}

/// Download one order of `order_type` into `destination`.
///
/// `own_encryption` is the subscriber's E002 key pair, needed to unwrap the
/// session key the bank sends with segment 1.
pub fn download<T, F>(
    manager: &FileTransferManager,
    transport: &T,
    factory: &F,
    own_encryption: &KeyPair,
    order_type: OrderType,
    destination: &Path,
) -> EbicsResult<DownloadSummary>
where
    T: Transport + ?Sized,
    F: RequestFactory + ?Sized,
{
    let response = transport.send(&factory.download_init(&order_type)?)?;
    let (_, init) = parse_download_init(&response)?;
    let session_key = init.session_key(own_encryption)?;
    let mut tx = manager.begin_download(order_type, init.num_segments, session_key, init.transaction_id.clone())?;

    let result = receive_download(
        manager,
        transport,
        factory,
        &mut tx,
        (init.segment, &init.order_data),
        destination,
    );
    if result.is_err() {
        manager.discard(&mut tx);
    }

    let acknowledged = matches!(result, Ok(DownloadOutcome::Delivered { .. }));
    let receipt = send_receipt(transport, factory, &init.transaction_id, acknowledged);
    let outcome = result?;
    receipt?;

    Ok(DownloadSummary {
        remote_transaction_id: init.transaction_id,
        num_segments: init.num_segments,
        outcome,
    })
}

fn receive_download<T, F>(
    manager: &FileTransferManager,
    transport: &T,
    factory: &F,
    tx: &mut FileTransaction,
    first: (SegmentInfo, &[u8]),
    destination: &Path,
) -> EbicsResult<DownloadOutcome>
where
    T: Transport + ?Sized,
    F: RequestFactory + ?Sized,
{
    let remote = tx.remote_transaction_id().unwrap_or_default().to_string();
    check_received(first.0, 1, tx.num_segments())?;
    manager.write_segment(tx, 1, first.1)?;

    for number in 2..=tx.num_segments() {
        let response = transport.send(&factory.download_segment(&remote, number)?)?;
        let (_, segment) = parse_download_transfer(&response)?;
        check_received(segment.segment, number, tx.num_segments())?;
        manager.write_segment(tx, number, &segment.order_data)?;
        tracing::debug!(remote = %remote, segment = number, of = tx.num_segments(), "segment received");
    }

    manager.finalize_download(tx, destination)
}

/// The bank must answer with exactly the segment asked for, and may flag only
/// the final one as last.
fn check_received(segment: SegmentInfo, expected: u32, num_segments: u32) -> EbicsResult<()> {
    if segment.number != expected {
        return Err(EbicsError::protocol(
            EBICS_TX_RECOVERY_SYNC,
            format!("expected segment {expected}, bank sent {}", segment.number),
        ));
    }
    if segment.last && expected != num_segments {
        return Err(EbicsError::malformed(format!(
            "segment {expected} flagged last of {num_segments}"
        )));
    }
    Ok(())
}

fn send_receipt<T, F>(transport: &T, factory: &F, remote: &str, acknowledged: bool) -> EbicsResult<()>
where
    T: Transport + ?Sized,
    F: RequestFactory + ?Sized,
{
    let sent = factory
        .receipt(remote, acknowledged)
        .and_then(|request| transport.send(&request))
        .and_then(|response| parse_envelope(&response));
    match sent {
        Ok(envelope) if acknowledged => envelope.report_receipt(),
        Ok(_) => Ok(()),
        Err(e) if !acknowledged => {
            tracing::warn!(remote, "negative receipt not delivered: {e}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(number: u32, last: bool) -> SegmentInfo {
        SegmentInfo { number, last }
    }

    #[test]
    fn test_expected_segment_accepted() {
        check_received(info(1, false), 1, 3).unwrap();
        check_received(info(3, true), 3, 3).unwrap();
        check_received(info(1, true), 1, 1).unwrap();
    }

    #[test]
    fn test_wrong_segment_number_is_recovery_sync() {
        let err = check_received(info(2, false), 1, 3).unwrap_err();
        assert_eq!(err.return_code(), Some(EBICS_TX_RECOVERY_SYNC));
    }

    #[test]
    fn test_early_last_flag_is_malformed() {
        let err = check_received(info(1, true), 1, 3).unwrap_err();
        assert!(matches!(err, EbicsError::MalformedResponse(_)), "got {err}");
    }
}
