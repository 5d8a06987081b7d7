//! ebics-protocol: the XML edge of the transfer core
//!
//! Requests are built by the embedding application. This crate reads what the
//! bank sends back (status envelope, download segments, bank keys) and
//! produces the `AuthSignature` a request needs.

pub mod auth;
pub mod bank_keys;
pub mod download;
pub mod envelope;
mod xml;

pub use auth::{build_signature_descriptor, AuthSignature, SignatureDescriptor, SignatureReference};
pub use bank_keys::{parse_bank_keys, parse_key_order_data, BankKeys};
pub use download::{parse_download_init, parse_download_transfer, DownloadInit, DownloadSegment, SegmentInfo};
pub use envelope::{parse_envelope, parse_response, Envelope, Response, ResponseBody, ResponseKind};
