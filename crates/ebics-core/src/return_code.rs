//! EBICS return-code registry
//!
//! Every response carries a 6-digit status code. The catalogue below is closed:
//! codes the registry does not know resolve to `EBICS_INVALID_REQUEST_CONTENT`.
//!
//! `ReturnCode` is an immutable value. Text supplied by a response travels on
//! the resolved copy and is never written back into the table.
//!
//! `090003` is the one code shared by two symbolic names: the order-type
//! authorisation failure was renamed for order identifiers and both names are
//! still in use by banks.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::EbicsError;

/// Numeric code signalling success.
pub const OK_CODE: &str = "000000";

/// A protocol status code paired with its symbolic name.
///
/// Equality and hashing consider only the numeric code and the symbolic name;
/// the response text is informational.
#[derive(Debug, Clone)]
pub struct ReturnCode {
    code: &'static str,
    symbolic: &'static str,
    default_text: &'static str,
    text: Option<String>,
}

impl ReturnCode {
    const fn define(code: &'static str, symbolic: &'static str, default_text: &'static str) -> Self {
        Self {
            code,
            symbolic,
            default_text,
            text: None,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn symbolic_name(&self) -> &'static str {
        self.symbolic
    }

    /// Built-in English description.
    pub fn default_text(&self) -> &'static str {
        self.default_text
    }

    /// Text supplied by the response this code was resolved from, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Response text when present, otherwise the built-in description.
    pub fn display_text(&self) -> &str {
        self.text.as_deref().unwrap_or(self.default_text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }

    /// Turn this code into a protocol failure whose message names the code,
    /// its symbolic identifier and the text.
    pub fn raise(&self) -> EbicsError {
        let message = format!("{} {}: {}", self.code, self.symbolic, self.display_text());
        EbicsError::Protocol {
            code: self.clone(),
            message: Some(message),
        }
    }
}

impl PartialEq for ReturnCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.symbolic == other.symbolic
    }
}

impl Eq for ReturnCode {}

impl Hash for ReturnCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.symbolic.hash(state);
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.code, self.symbolic)
    }
}

/// Look up `code`, attaching the response-supplied `text`.
///
/// Unknown codes resolve to [`EBICS_INVALID_REQUEST_CONTENT`]; callers decide
/// whether that deserves a warning.
pub fn resolve(code: &str, text: Option<&str>) -> ReturnCode {
    let found = lookup(code).unwrap_or(EBICS_INVALID_REQUEST_CONTENT);
    match text {
        Some(t) => found.with_text(t),
        None => found,
    }
}

/// Exact registry lookup without fallback.
pub fn lookup(code: &str) -> Option<ReturnCode> {
    let code = code.trim();
    REGISTRY.iter().find(|rc| rc.code == code).cloned()
}

pub fn is_known(code: &str) -> bool {
    lookup(code).is_some()
}

/// True only for `000000`.
pub fn is_ok(code: &str) -> bool {
    code.trim() == OK_CODE
}

/// Build the protocol failure for a non-OK code.
pub fn raise(code: &ReturnCode) -> EbicsError {
    code.raise()
}

/// All registered codes, in catalogue order.
pub fn all() -> &'static [ReturnCode] {
    REGISTRY
}

/// Localised text lookup supplied by the embedding application.
pub trait MessageCatalog: Send + Sync {
    fn text(&self, code: &ReturnCode, locale: &str) -> Option<String>;
}

/// Resolve display text for `code`: response text first, then the catalog,
/// then the built-in table.
pub fn describe(code: &ReturnCode, catalog: Option<&dyn MessageCatalog>, locale: &str) -> String {
    if let Some(text) = code.text() {
        return text.to_string();
    }
    catalog
        .and_then(|c| c.text(code, locale))
        .unwrap_or_else(|| code.default_text().to_string())
}

macro_rules! return_codes {
    ($($name:ident = $code:literal, $text:literal;)+) => {
        $(
            pub const $name: ReturnCode = ReturnCode::define($code, stringify!($name), $text);
        )+

        static REGISTRY: &[ReturnCode] = &[$($name),+];
    };
}

return_codes! {
    // success and informational
    EBICS_OK = "000000", "OK";
    EBICS_DOWNLOAD_POSTPROCESS_DONE = "011000", "Positive acknowledgement received";
    EBICS_DOWNLOAD_POSTPROCESS_SKIPPED = "011001", "Negative acknowledgement received";
    EBICS_TX_SEGMENT_NUMBER_UNDERRUN = "011101", "Segment number not reached";
    EBICS_ORDER_PARAMS_IGNORED = "031001", "Unknown order parameters are ignored";

    // authentication and request level
    EBICS_AUTHENTICATION_FAILED = "061001", "Authentication signature error";
    EBICS_INVALID_REQUEST = "061002", "Message not EBICS-conformant";
    EBICS_INTERNAL_ERROR = "061099", "Internal EBICS error";
    EBICS_TX_RECOVERY_SYNC = "061101", "Synchronisation necessary";

    // order level
    EBICS_INVALID_USER_OR_USER_STATE = "091002", "Subscriber unknown or subscriber state inadmissible";
    EBICS_USER_UNKNOWN = "091003", "Subscriber unknown";
    EBICS_INVALID_USER_STATE = "091004", "Subscriber state unknown";
    EBICS_INVALID_ORDER_TYPE = "091005", "Order type inadmissible";
    EBICS_UNSUPPORTED_ORDER_TYPE = "091006", "Order type not supported";
    EBICS_DISTRIBUTED_SIGNATURE_AUTHORISATION_FAILED = "091007", "Subscriber possesses no authorisation of signature for the referenced order";
    EBICS_BANK_PUBKEY_UPDATE_REQUIRED = "091008", "Bank key update required";
    EBICS_SEGMENT_SIZE_EXCEEDED = "091009", "Segment size exceeded";
    EBICS_INVALID_XML = "091010", "XML invalid according to schema";
    EBICS_INVALID_HOST_ID = "091011", "The transmitted host ID is not known to the bank";
    EBICS_AUTHORISATION_ORDER_TYPE_FAILED = "090003", "Subscriber is not entitled to submit orders of the selected order type";
    EBICS_AUTHORISATION_ORDER_IDENTIFIER_FAILED = "090003", "Subscriber is not entitled to submit orders of the selected order identifier";
    EBICS_INVALID_ORDER_DATA_FORMAT = "090004", "Order data format invalid";
    EBICS_NO_DOWNLOAD_DATA_AVAILABLE = "090005", "No data are available at present for the selected download order type";
    EBICS_UNSUPPORTED_REQUEST_FOR_ORDER_INSTANCE = "090006", "Request not supported for this order instance";

    // transaction and segment level
    EBICS_TX_UNKNOWN_TXID = "091101", "Transaction ID invalid";
    EBICS_TX_ABORT = "091102", "Transaction cancelled";
    EBICS_TX_MESSAGE_REPLAY = "091103", "Suspected message replay (wrong time/time zone or nonce error)";
    EBICS_TX_SEGMENT_NUMBER_EXCEEDED = "091104", "Segment number exceeded";
    EBICS_RECOVERY_NOT_SUPPORTED = "091105", "Recovery of the transaction is not supported";
    EBICS_INVALID_SIGNATURE_FILE_FORMAT = "091111", "Invalid signature file format";
    EBICS_INVALID_ORDER_PARAMS = "091112", "Invalid order parameters";
    EBICS_INVALID_REQUEST_CONTENT = "091113", "Message content semantically not compliant to EBICS";
    EBICS_ORDERID_UNKNOWN = "091114", "Order ID unknown";
    EBICS_ORDERID_ALREADY_EXISTS = "091115", "Order ID already exists";
    EBICS_PROCESSING_ERROR = "091116", "Processing error";
    EBICS_MAX_ORDER_DATA_SIZE_EXCEEDED = "091117", "Maximum order data size exceeded";
    EBICS_MAX_SEGMENTS_EXCEEDED = "091118", "Maximum number of segments exceeded";
    EBICS_MAX_TRANSACTIONS_EXCEEDED = "091119", "Maximum number of parallel transactions per customer exceeded";
    EBICS_PARTNER_ID_MISMATCH = "091120", "Partner ID mismatch";
    EBICS_INCOMPATIBLE_ORDER_ATTRIBUTE = "091121", "Incompatible order attribute";

    // key management
    EBICS_KEYMGMT_UNSUPPORTED_VERSION_SIGNATURE = "091201", "Unsupported signature key version";
    EBICS_KEYMGMT_UNSUPPORTED_VERSION_AUTHENTICATION = "091202", "Unsupported authentication key version";
    EBICS_KEYMGMT_UNSUPPORTED_VERSION_ENCRYPTION = "091203", "Unsupported encryption key version";
    EBICS_KEYMGMT_KEYLENGTH_ERROR_SIGNATURE = "091204", "Signature key length not supported";
    EBICS_KEYMGMT_KEYLENGTH_ERROR_AUTHENTICATION = "091205", "Authentication key length not supported";
    EBICS_KEYMGMT_KEYLENGTH_ERROR_ENCRYPTION = "091206", "Encryption key length not supported";
    EBICS_KEYMGMT_NO_X509_SUPPORT = "091207", "X.509 certificates not supported";
    EBICS_KEYMGMT_DUPLICATE_KEY = "091218", "Key already in use";

    // certificates
    EBICS_X509_CERTIFICATE_EXPIRED = "091208", "Certificate expired";
    EBICS_X509_CERTIFICATE_NOT_VALID_YET = "091209", "Certificate not yet valid";
    EBICS_X509_WRONG_KEY_USAGE = "091210", "Wrong key usage";
    EBICS_X509_WRONG_ALGORITHM = "091211", "Wrong algorithm";
    EBICS_X509_INVALID_THUMBPRINT = "091212", "Invalid thumbprint";
    EBICS_X509_CTL_INVALID = "091213", "Certificate trust list invalid";
    EBICS_X509_UNKNOWN_CERTIFICATE_AUTHORITY = "091214", "Unknown certificate authority";
    EBICS_X509_INVALID_POLICY = "091215", "Invalid certificate policy";
    EBICS_X509_INVALID_BASIC_CONSTRAINTS = "091216", "Invalid basic constraints";
    EBICS_ONLY_X509_SUPPORT = "091217", "Only X.509 certificates supported";
    EBICS_CERTIFICATES_VALIDATION_ERROR = "091219", "Certificate validation failed";

    // signatures
    EBICS_SIGNATURE_VERIFICATION_FAILED = "091301", "Verification of the electronic signature failed";
    EBICS_ACCOUNT_AUTHORISATION_FAILED = "091302", "Preliminary verification of the account authorisation failed";
    EBICS_AMOUNT_CHECK_FAILED = "091303", "Preliminary verification of the account amount limit failed";
    EBICS_SIGNER_UNKNOWN = "091304", "Signer unknown";
    EBICS_INVALID_SIGNER_STATE = "091305", "Signer state invalid";
    EBICS_DUPLICATE_SIGNATURE = "091306", "Duplicate signature";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn exactly_one_duplicate_numeric_code() {
        let mut by_code: HashMap<&str, Vec<&str>> = HashMap::new();
        for rc in all() {
            by_code.entry(rc.code()).or_default().push(rc.symbolic_name());
        }
        let dups: Vec<_> = by_code.iter().filter(|(_, names)| names.len() > 1).collect();
        assert_eq!(dups.len(), 1, "duplicates: {dups:?}");
        let (code, names) = dups[0];
        assert_eq!(*code, "090003");
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn symbolic_names_are_unique() {
        let mut names: Vec<_> = all().iter().map(|rc| rc.symbolic_name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn codes_are_six_digits() {
        for rc in all() {
            assert_eq!(rc.code().len(), 6, "{rc}");
            assert!(rc.code().bytes().all(|b| b.is_ascii_digit()), "{rc}");
        }
    }

    #[test]
    fn unknown_code_resolves_to_sentinel() {
        let rc = resolve("999999", Some("whatever the bank said"));
        assert_eq!(rc, EBICS_INVALID_REQUEST_CONTENT);
        assert_eq!(rc.text(), Some("whatever the bank said"));
        assert!(!is_known("999999"));
    }

    #[test]
    fn is_ok_only_for_all_zeroes() {
        assert!(is_ok("000000"));
        assert!(!is_ok("011000"));
        assert!(!is_ok("091102"));
        assert!(!is_ok(""));
        assert!(EBICS_OK.is_ok());
        assert!(!EBICS_TX_ABORT.is_ok());
    }

    #[test]
    fn resolve_does_not_mutate_registry() {
        let first = resolve("091102", Some("first response"));
        let second = resolve("091102", None);
        assert_eq!(first.text(), Some("first response"));
        assert_eq!(second.text(), None);
        assert_eq!(lookup("091102").unwrap().text(), None);
        assert_eq!(first, second, "text is not part of identity");
    }

    #[test]
    fn raise_formats_code_name_and_text() {
        let err = resolve("091116", Some("[EBICS_PROCESSING_ERROR] Processing error")).raise();
        let msg = err.to_string();
        assert!(msg.contains("091116"));
        assert!(msg.contains("EBICS_PROCESSING_ERROR"));
        assert_eq!(err.return_code().unwrap().code(), "091116");
    }

    #[test]
    fn blank_text_falls_back_to_default() {
        let rc = EBICS_TX_ABORT.with_text("   ");
        assert_eq!(rc.text(), None);
        assert_eq!(rc.display_text(), "Transaction cancelled");
    }

    struct German;

    impl MessageCatalog for German {
        fn text(&self, code: &ReturnCode, locale: &str) -> Option<String> {
            (locale == "de" && code.is_ok()).then(|| "Erfolgreich".to_string())
        }
    }

    #[test]
    fn describe_prefers_response_then_catalog_then_builtin() {
        assert_eq!(describe(&EBICS_OK, Some(&German), "de"), "Erfolgreich");
        assert_eq!(describe(&EBICS_OK, Some(&German), "en"), "OK");
        assert_eq!(describe(&EBICS_OK, None, "de"), "OK");
        let from_bank = EBICS_OK.with_text("[EBICS_OK] OK");
        assert_eq!(describe(&from_bank, Some(&German), "de"), "[EBICS_OK] OK");
    }
}
