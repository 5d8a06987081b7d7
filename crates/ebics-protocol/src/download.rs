//! Download responses: the initialisation step carries the segment count, the
//! wrapped session key and segment 1; transfer steps carry the rest.

use ebics_core::return_code::EBICS_TX_SEGMENT_NUMBER_EXCEEDED;
use ebics_core::{EbicsError, EbicsResult};
use ebics_crypto::{decrypt_session_key, DigestValue, KeyFamily, KeyPair, SessionKey};

use crate::envelope::{envelope_from, Envelope};
use crate::xml::{decode_base64, XmlDocument};

/// Segment number and last-segment flag of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    pub number: u32,
    pub last: bool,
}

/// Payload of a download initialisation response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInit {
    pub transaction_id: String,
    pub num_segments: u32,
    pub segment: SegmentInfo,
    /// Session key wrapped with the subscriber's E002 key
    pub transaction_key: Vec<u8>,
    /// Digest of the E002 key the bank encrypted for
    pub encryption_key_digest: Option<Vec<u8>>,
    /// First segment of the encrypted order data
    pub order_data: Vec<u8>,
}

impl DownloadInit {
    pub(crate) fn from_document(doc: &XmlDocument) -> EbicsResult<Self> {
        let transaction_id = doc
            .required_text(&["header", "static", "TransactionID"])?
            .to_string();
        let num_segments = parse_number(doc.required_text(&["static", "NumSegments"])?, "NumSegments")?;
        if num_segments == 0 {
            return Err(EbicsError::malformed("NumSegments must be at least 1"));
        }
        let segment = segment_info(doc)?;
        check_segment_bounds(segment, num_segments)?;

        let transaction_key = decode_base64(
            doc.required_text(&["DataEncryptionInfo", "TransactionKey"])?,
            "TransactionKey",
        )?;
        let encryption_key_digest = doc
            .text(&["DataEncryptionInfo", "EncryptionPubKeyDigest"])
            .filter(|d| !d.is_empty())
            .map(|d| decode_base64(d, "EncryptionPubKeyDigest"))
            .transpose()?;
        let order_data = decode_base64(doc.required_text(&["DataTransfer", "OrderData"])?, "OrderData")?;

        Ok(Self {
            transaction_id,
            num_segments,
            segment,
            transaction_key,
            encryption_key_digest,
            order_data,
        })
    }

    /// Unwrap the session key with our own encryption key.
    ///
    /// Fails before any RSA work when the bank names a different key.
    pub fn session_key(&self, own: &KeyPair) -> EbicsResult<SessionKey> {
        unwrap_transaction_key(
            &self.transaction_key,
            self.encryption_key_digest.as_deref(),
            own,
        )
    }
}

/// Payload of a download transfer response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSegment {
    pub transaction_id: String,
    pub segment: SegmentInfo,
    pub order_data: Vec<u8>,
}

impl DownloadSegment {
    pub(crate) fn from_document(doc: &XmlDocument) -> EbicsResult<Self> {
        let transaction_id = doc
            .required_text(&["header", "static", "TransactionID"])?
            .to_string();
        let segment = segment_info(doc)?;
        if segment.number == 0 {
            return Err(EbicsError::malformed("segment numbers start at 1"));
        }
        let order_data = decode_base64(doc.required_text(&["DataTransfer", "OrderData"])?, "OrderData")?;
        Ok(Self {
            transaction_id,
            segment,
            order_data,
        })
    }
}

/// Parse a download initialisation response, failing on a non-OK envelope.
pub fn parse_download_init(bytes: &[u8]) -> EbicsResult<(Envelope, DownloadInit)> {
    let doc = XmlDocument::parse(bytes)?;
    let envelope = envelope_from(&doc)?;
    envelope.report()?;
    let init = DownloadInit::from_document(&doc)?;
    tracing::debug!(
        transaction = %init.transaction_id,
        segments = init.num_segments,
        "download initialised"
    );
    Ok((envelope, init))
}

/// Parse a download transfer response, failing on a non-OK envelope.
pub fn parse_download_transfer(bytes: &[u8]) -> EbicsResult<(Envelope, DownloadSegment)> {
    let doc = XmlDocument::parse(bytes)?;
    let envelope = envelope_from(&doc)?;
    envelope.report()?;
    let segment = DownloadSegment::from_document(&doc)?;
    Ok((envelope, segment))
}

pub(crate) fn unwrap_transaction_key(
    transaction_key: &[u8],
    key_digest: Option<&[u8]>,
    own: &KeyPair,
) -> EbicsResult<SessionKey> {
    if own.version().family() != KeyFamily::Encryption {
        return Err(EbicsError::crypto(format!(
            "{} key cannot unwrap a transaction key",
            own.version()
        )));
    }
    if let Some(expected) = key_digest {
        let ours: DigestValue = own.public_key_digest();
        if expected != ours.as_slice() {
            return Err(EbicsError::crypto(
                "order data was encrypted for a different encryption key",
            ));
        }
    }
    decrypt_session_key(transaction_key, own.private_key())
}

fn segment_info(doc: &XmlDocument) -> EbicsResult<SegmentInfo> {
    let element = doc
        .find(&["mutable", "SegmentNumber"])
        .ok_or_else(|| EbicsError::malformed("missing element mutable/SegmentNumber"))?;
    let number = parse_number(element.text.trim(), "SegmentNumber")?;
    let last = match element.attribute("lastSegment").map(str::trim) {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") | None => false,
        Some(other) => {
            return Err(EbicsError::malformed(format!(
                "lastSegment must be a boolean, got '{other}'"
            )))
        }
    };
    Ok(SegmentInfo { number, last })
}

fn parse_number(text: &str, what: &str) -> EbicsResult<u32> {
    text.parse()
        .map_err(|_| EbicsError::malformed(format!("{what} is not a number: '{text}'")))
}

pub(crate) fn check_segment_bounds(segment: SegmentInfo, num_segments: u32) -> EbicsResult<()> {
    if segment.number == 0 || segment.number > num_segments {
        return Err(EbicsError::protocol(
            EBICS_TX_SEGMENT_NUMBER_EXCEEDED,
            format!("segment {} of {num_segments}", segment.number),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::tests::response;
    use base64::Engine as _;
    use ebics_crypto::{encrypt_session_key, generate_session_key, KeyVersion};

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn init_xml(num_segments: &str, segment: &str, tx_key: &[u8], digest: Option<&[u8]>, data: &[u8]) -> String {
        let digest = digest
            .map(|d| format!(r#"<EncryptionPubKeyDigest Version="E002" Algorithm="http://www.w3.org/2001/04/xmlenc#sha256">{}</EncryptionPubKeyDigest>"#, b64(d)))
            .unwrap_or_default();
        let header = format!("<NumSegments>{num_segments}</NumSegments>");
        let body = format!(
            "<DataTransfer><DataEncryptionInfo authenticate=\"true\">{digest}\
             <TransactionKey>{}</TransactionKey></DataEncryptionInfo>\
             <OrderData>{}</OrderData></DataTransfer>",
            b64(tx_key),
            b64(data)
        );
        response("000000", "000000", &header, &body).replace(
            "<ReturnCode>000000</ReturnCode>\n      <ReportText>",
            &format!("{segment}<ReturnCode>000000</ReturnCode>\n      <ReportText>"),
        )
    }

    #[test]
    fn test_parse_download_init() {
        let xml = init_xml(
            "3",
            r#"<SegmentNumber lastSegment="false">1</SegmentNumber>"#,
            &[7u8; 128],
            None,
            b"segment one",
        );
        let (env, init) = parse_download_init(xml.as_bytes()).unwrap();
        assert!(env.is_ok());
        assert_eq!(init.transaction_id, "8A5F1C0E4B2D3F6A7B8C9D0E1F2A3B4C");
        assert_eq!(init.num_segments, 3);
        assert_eq!(init.segment, SegmentInfo { number: 1, last: false });
        assert_eq!(init.transaction_key, vec![7u8; 128]);
        assert_eq!(init.order_data, b"segment one");
        assert!(init.encryption_key_digest.is_none());
    }

    #[test]
    fn test_single_segment_download_is_last() {
        let xml = init_xml(
            "1",
            r#"<SegmentNumber lastSegment="true">1</SegmentNumber>"#,
            &[1u8; 4],
            None,
            b"all",
        );
        let (_, init) = parse_download_init(xml.as_bytes()).unwrap();
        assert!(init.segment.last);
    }

    #[test]
    fn test_segment_beyond_count_rejected() {
        let xml = init_xml(
            "1",
            r#"<SegmentNumber lastSegment="true">2</SegmentNumber>"#,
            &[1u8; 4],
            None,
            b"x",
        );
        let err = parse_download_init(xml.as_bytes()).unwrap_err();
        assert_eq!(err.return_code(), Some(EBICS_TX_SEGMENT_NUMBER_EXCEEDED));
    }

    #[test]
    fn test_no_data_available_surfaces_business_code() {
        let xml = response("000000", "090005", "", "");
        let err = parse_download_init(xml.as_bytes()).unwrap_err();
        assert_eq!(err.return_code().unwrap().code(), "090005");
    }

    #[test]
    fn test_session_key_unwrap_checks_key_digest() {
        let own = KeyPair::generate(KeyVersion::E002, 1024).unwrap();
        let session = generate_session_key();
        let wrapped = encrypt_session_key(&session, own.public_key()).unwrap();

        let xml = init_xml(
            "1",
            r#"<SegmentNumber lastSegment="true">1</SegmentNumber>"#,
            &wrapped,
            Some(&own.public_key_digest()),
            b"x",
        );
        let (_, init) = parse_download_init(xml.as_bytes()).unwrap();
        assert_eq!(init.session_key(&own).unwrap().as_bytes(), session.as_bytes());

        let xml = init_xml(
            "1",
            r#"<SegmentNumber lastSegment="true">1</SegmentNumber>"#,
            &wrapped,
            Some(&[0u8; 32]),
            b"x",
        );
        let (_, init) = parse_download_init(xml.as_bytes()).unwrap();
        assert!(init.session_key(&own).is_err());
    }

    #[test]
    fn test_parse_download_transfer() {
        let body = format!("<DataTransfer><OrderData>{}</OrderData></DataTransfer>", b64(b"segment two"));
        let xml = response("000000", "000000", "", &body).replace(
            "<TransactionPhase>Initialisation</TransactionPhase>",
            r#"<TransactionPhase>Transfer</TransactionPhase><SegmentNumber lastSegment="true">2</SegmentNumber>"#,
        );
        let (env, seg) = parse_download_transfer(xml.as_bytes()).unwrap();
        assert_eq!(env.phase, Some(ebics_core::TransactionPhase::Transfer));
        assert_eq!(seg.segment, SegmentInfo { number: 2, last: true });
        assert_eq!(seg.order_data, b"segment two");
    }

    #[test]
    fn test_bad_last_segment_flag() {
        let xml = init_xml(
            "1",
            r#"<SegmentNumber lastSegment="maybe">1</SegmentNumber>"#,
            &[1u8; 4],
            None,
            b"x",
        );
        assert!(matches!(
            parse_download_init(xml.as_bytes()),
            Err(EbicsError::MalformedResponse(_))
        ));
    }
}
