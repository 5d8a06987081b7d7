//! Common envelope of every EBICS response
//!
//! A response carries two status codes. The technical one sits in
//! `header/mutable/ReturnCode` next to `ReportText`; the business one in
//! `body/ReturnCode`. Both must be OK for the order step to have succeeded.

use ebics_core::return_code::{self, ReturnCode, EBICS_DOWNLOAD_POSTPROCESS_DONE};
use ebics_core::{EbicsError, EbicsResult, TransactionPhase};

use crate::download::{DownloadInit, DownloadSegment};
use crate::xml::XmlDocument;

const RESPONSE_ROOTS: [&str; 2] = ["ebicsResponse", "ebicsKeyManagementResponse"];

/// Status and identity fields shared by every response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Technical code from the header, carrying the report text
    pub return_code: ReturnCode,
    /// Business code from the body, when the response has one
    pub business_code: Option<ReturnCode>,
    /// Server-assigned transaction id
    pub transaction_id: Option<String>,
    pub phase: Option<TransactionPhase>,
}

impl Envelope {
    /// Report text of the technical code
    pub fn report_text(&self) -> &str {
        self.return_code.display_text()
    }

    pub fn is_ok(&self) -> bool {
        self.return_code.is_ok() && self.business_code.as_ref().map_or(true, ReturnCode::is_ok)
    }

    /// Fail with the technical code first, then the business code.
    pub fn report(&self) -> EbicsResult<()> {
        if !self.return_code.is_ok() {
            return Err(self.return_code.raise());
        }
        match &self.business_code {
            Some(code) if !code.is_ok() => Err(code.raise()),
            _ => Ok(()),
        }
    }

    /// Like [`report`](Self::report), but a positive download acknowledgement
    /// counts as success.
    pub fn report_receipt(&self) -> EbicsResult<()> {
        if self.return_code == EBICS_DOWNLOAD_POSTPROCESS_DONE {
            return Ok(());
        }
        self.report()
    }

    pub fn require_transaction_id(&self) -> EbicsResult<&str> {
        self.transaction_id
            .as_deref()
            .ok_or_else(|| EbicsError::malformed("response carries no transaction id"))
    }
}

/// What the caller expects the response to contain beyond the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Upload steps, receipts, key management acknowledgements
    Plain,
    DownloadInit,
    DownloadTransfer,
}

/// Per-kind payload of a successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    DownloadInit(DownloadInit),
    DownloadSegment(DownloadSegment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub envelope: Envelope,
    pub body: ResponseBody,
}

/// Parse the envelope of any response.
pub fn parse_envelope(bytes: &[u8]) -> EbicsResult<Envelope> {
    let doc = XmlDocument::parse(bytes)?;
    envelope_from(&doc)
}

/// Parse a response and, when its envelope is OK, the payload `kind` names.
///
/// A rejected response yields [`ResponseBody::Empty`]; the caller decides via
/// [`Envelope::report`] what to do with it.
pub fn parse_response(bytes: &[u8], kind: ResponseKind) -> EbicsResult<Response> {
    let doc = XmlDocument::parse(bytes)?;
    let envelope = envelope_from(&doc)?;
    let body = if !envelope.is_ok() {
        ResponseBody::Empty
    } else {
        match kind {
            ResponseKind::Plain => ResponseBody::Empty,
            ResponseKind::DownloadInit => {
                ResponseBody::DownloadInit(DownloadInit::from_document(&doc)?)
            }
            ResponseKind::DownloadTransfer => {
                ResponseBody::DownloadSegment(DownloadSegment::from_document(&doc)?)
            }
        }
    };
    Ok(Response { envelope, body })
}

pub(crate) fn envelope_from(doc: &XmlDocument) -> EbicsResult<Envelope> {
    let root = doc.root_name();
    if !RESPONSE_ROOTS.contains(&root) {
        return Err(EbicsError::malformed(format!(
            "unexpected document element <{root}>"
        )));
    }

    let code = doc.required_text(&["header", "mutable", "ReturnCode"])?;
    let report_text = doc.text(&["header", "mutable", "ReportText"]);
    let return_code = resolve_logged(code, report_text);
    let business_code = doc
        .text(&["body", "ReturnCode"])
        .filter(|c| !c.is_empty())
        .map(|c| resolve_logged(c, None));

    let transaction_id = doc
        .text(&["header", "static", "TransactionID"])
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let phase = doc
        .text(&["header", "mutable", "TransactionPhase"])
        .filter(|p| !p.is_empty())
        .and_then(|p| match p.parse::<TransactionPhase>() {
            Ok(phase) => Some(phase),
            Err(_) => {
                tracing::warn!(phase = p, "ignoring unrecognised transaction phase");
                None
            }
        });

    tracing::debug!(
        code = %return_code,
        business = ?business_code.as_ref().map(ReturnCode::code),
        transaction = ?transaction_id,
        "response envelope"
    );

    Ok(Envelope {
        return_code,
        business_code,
        transaction_id,
        phase,
    })
}

fn resolve_logged(code: &str, text: Option<&str>) -> ReturnCode {
    if !return_code::is_known(code) {
        tracing::warn!(code, "unknown return code, treating as invalid request content");
    }
    return_code::resolve(code, text)
}
