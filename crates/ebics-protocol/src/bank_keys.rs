//! Bank public keys from an HPB response
//!
//! The keys travel as ordinary encrypted order data: the session key is
//! wrapped with the subscriber's E002 key, the `HPBResponseOrderData` document
//! is deflated and AES-encrypted.

use ebics_core::return_code::{
    EBICS_KEYMGMT_UNSUPPORTED_VERSION_AUTHENTICATION, EBICS_KEYMGMT_UNSUPPORTED_VERSION_ENCRYPTION,
};
use ebics_core::{EbicsError, EbicsResult};
use ebics_crypto::{decode_download, KeyFamily, KeyPair, KeyVersion, PublicKeyInfo};

use crate::download::unwrap_transaction_key;
use crate::envelope::envelope_from;
use crate::xml::{decode_base64, XmlDocument};

/// The bank's authentication (X002) and encryption (E002) keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankKeys {
    pub host_id: Option<String>,
    pub authentication: PublicKeyInfo,
    pub encryption: PublicKeyInfo,
}

/// Decrypt and parse an HPB response with the subscriber's encryption key.
pub fn parse_bank_keys(bytes: &[u8], own_encryption: &KeyPair) -> EbicsResult<BankKeys> {
    let doc = XmlDocument::parse(bytes)?;
    envelope_from(&doc)?.report()?;

    let transaction_key = decode_base64(
        doc.required_text(&["DataEncryptionInfo", "TransactionKey"])?,
        "TransactionKey",
    )?;
    let key_digest = doc
        .text(&["DataEncryptionInfo", "EncryptionPubKeyDigest"])
        .filter(|d| !d.is_empty())
        .map(|d| decode_base64(d, "EncryptionPubKeyDigest"))
        .transpose()?;
    let order_data = decode_base64(doc.required_text(&["DataTransfer", "OrderData"])?, "OrderData")?;

    let session = unwrap_transaction_key(&transaction_key, key_digest.as_deref(), own_encryption)?;
    let plain = decode_download(&order_data, &session, None)?;
    let keys = parse_key_order_data(&plain)?;

    tracing::info!(
        host = ?keys.host_id,
        authentication = %keys.authentication.version,
        encryption = %keys.encryption.version,
        "bank keys received"
    );
    Ok(keys)
}

/// Parse a plaintext `HPBResponseOrderData` document.
pub fn parse_key_order_data(bytes: &[u8]) -> EbicsResult<BankKeys> {
    let doc = XmlDocument::parse(bytes)?;
    if doc.root_name() != "HPBResponseOrderData" {
        return Err(EbicsError::malformed(format!(
            "expected HPBResponseOrderData, got <{}>",
            doc.root_name()
        )));
    }

    let authentication = key_info(
        &doc,
        "AuthenticationPubKeyInfo",
        "AuthenticationVersion",
        KeyFamily::Authentication,
    )?;
    let encryption = key_info(
        &doc,
        "EncryptionPubKeyInfo",
        "EncryptionVersion",
        KeyFamily::Encryption,
    )?;
    let host_id = doc
        .text(&["HPBResponseOrderData", "HostID"])
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    Ok(BankKeys {
        host_id,
        authentication,
        encryption,
    })
}

fn key_info(
    doc: &XmlDocument,
    section: &str,
    version_element: &str,
    family: KeyFamily,
) -> EbicsResult<PublicKeyInfo> {
    let unsupported = match family {
        KeyFamily::Encryption => EBICS_KEYMGMT_UNSUPPORTED_VERSION_ENCRYPTION,
        _ => EBICS_KEYMGMT_UNSUPPORTED_VERSION_AUTHENTICATION,
    };

    let version_text = doc
        .text(&[section, version_element])
        .ok_or_else(|| EbicsError::malformed(format!("missing {section}/{version_element}")))?;
    let version: KeyVersion = version_text
        .parse()
        .map_err(|_| EbicsError::protocol(unsupported.clone(), format!("key version '{version_text}'")))?;
    if version.family() != family {
        return Err(EbicsError::protocol(
            unsupported,
            format!("{version} in {section}"),
        ));
    }

    let component = |name: &str| -> EbicsResult<Vec<u8>> {
        let element = doc
            .find_under(section, &["RSAKeyValue", name])
            .ok_or_else(|| EbicsError::malformed(format!("missing {section} RSAKeyValue/{name}")))?;
        decode_base64(&element.text, name)
    };
    PublicKeyInfo::from_components(&component("Modulus")?, &component("Exponent")?, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::tests::response;
    use base64::Engine as _;
    use ebics_crypto::{encode_upload, encrypt_session_key, generate_session_key};

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn key_block(section: &str, version_element: &str, info: &PublicKeyInfo) -> String {
        format!(
            "<{section}><PubKeyValue><ds:RSAKeyValue><ds:Modulus>{}</ds:Modulus>\
             <ds:Exponent>{}</ds:Exponent></ds:RSAKeyValue></PubKeyValue>\
             <{version_element}>{}</{version_element}></{section}>",
            b64(&info.modulus()),
            b64(&info.exponent()),
            info.version
        )
    }

    fn order_data(auth: &PublicKeyInfo, enc: &PublicKeyInfo) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<HPBResponseOrderData xmlns="urn:org:ebics:H004" xmlns:ds="http://www.w3.org/2000/09/xmldsig#">{}{}<HostID>EBIXHOST</HostID></HPBResponseOrderData>"#,
            key_block("AuthenticationPubKeyInfo", "AuthenticationVersion", auth),
            key_block("EncryptionPubKeyInfo", "EncryptionVersion", enc),
        )
    }

    #[test]
    fn test_parse_key_order_data() {
        let auth = KeyPair::generate(KeyVersion::X002, 1024).unwrap().public_info();
        let enc = KeyPair::generate(KeyVersion::E002, 1024).unwrap().public_info();
        let keys = parse_key_order_data(order_data(&auth, &enc).as_bytes()).unwrap();
        assert_eq!(keys.host_id.as_deref(), Some("EBIXHOST"));
        assert_eq!(keys.authentication, auth);
        assert_eq!(keys.encryption, enc);
    }

    #[test]
    fn test_swapped_versions_rejected() {
        let auth = KeyPair::generate(KeyVersion::E002, 1024).unwrap().public_info();
        let enc = KeyPair::generate(KeyVersion::E002, 1024).unwrap().public_info();
        let err = parse_key_order_data(order_data(&auth, &enc).as_bytes()).unwrap_err();
        assert_eq!(
            err.return_code(),
            Some(EBICS_KEYMGMT_UNSUPPORTED_VERSION_AUTHENTICATION)
        );
    }

    #[test]
    fn test_parse_bank_keys_end_to_end() {
        let own = KeyPair::generate(KeyVersion::E002, 1024).unwrap();
        let bank_auth = KeyPair::generate(KeyVersion::X002, 1024).unwrap().public_info();
        let bank_enc = KeyPair::generate(KeyVersion::E002, 1024).unwrap().public_info();

        let session = generate_session_key();
        let plain = order_data(&bank_auth, &bank_enc);
        let encoded = encode_upload(plain.as_bytes(), &session).unwrap();
        let wrapped = encrypt_session_key(&session, own.public_key()).unwrap();

        let body = format!(
            "<DataTransfer><DataEncryptionInfo authenticate=\"true\">\
             <EncryptionPubKeyDigest Version=\"E002\">{}</EncryptionPubKeyDigest>\
             <TransactionKey>{}</TransactionKey></DataEncryptionInfo>\
             <OrderData>{}</OrderData></DataTransfer>",
            b64(&own.public_key_digest()),
            b64(&wrapped),
            b64(&encoded.ciphertext)
        );
        let xml = response("000000", "000000", "", &body)
            .replace("<ebicsResponse", "<ebicsKeyManagementResponse")
            .replace("</ebicsResponse>", "</ebicsKeyManagementResponse>");

        let keys = parse_bank_keys(xml.as_bytes(), &own).unwrap();
        assert_eq!(keys.authentication, bank_auth);
        assert_eq!(keys.encryption, bank_enc);
    }

    #[test]
    fn test_signature_key_cannot_decrypt() {
        let wrong = KeyPair::generate(KeyVersion::A006, 1024).unwrap();
        let body = "<DataTransfer><DataEncryptionInfo><TransactionKey>AAAA</TransactionKey>\
                    </DataEncryptionInfo><OrderData>AAAA</OrderData></DataTransfer>";
        let xml = response("000000", "000000", "", body);
        assert!(matches!(
            parse_bank_keys(xml.as_bytes(), &wrong),
            Err(EbicsError::Crypto(_))
        ));
    }
}
