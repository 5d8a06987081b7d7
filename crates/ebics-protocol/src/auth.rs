//! `AuthSignature` construction (X002)
//!
//! Every request is authenticated over its elements marked
//! `authenticate="true"`. The caller canonicalises those and hashes them; this
//! module renders the `ds:SignedInfo` that references the digest and signs its
//! SHA-256 with the subscriber's X002 key.
//!
//! Inclusive C14N of a `SignedInfo` nested in a request carries every
//! namespace in scope, so the default namespace of the request root is
//! rendered on `SignedInfo` ahead of `xmlns:ds`.

use base64::Engine as _;
use ebics_core::{EbicsError, EbicsResult};
use ebics_crypto::{authenticate, digest, verify_authentication, DigestValue, KeyFamily, KeyPair};
use rsa::RsaPublicKey;

pub const CANONICALIZATION_METHOD: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const SIGNATURE_METHOD: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const DIGEST_METHOD: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const AUTHENTICATED_CONTENT: &str = "#xpointer(//*[@authenticate='true'])";
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
/// Default namespace of H004 requests
pub const EBICS_H004_NAMESPACE: &str = "urn:org:ebics:H004";

/// The single reference inside `SignedInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureReference {
    pub uri: &'static str,
    pub transform: &'static str,
    pub digest_method: &'static str,
    pub digest_value: DigestValue,
}

/// Fixed-shape `SignedInfo` for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDescriptor {
    pub canonicalization_method: &'static str,
    pub signature_method: &'static str,
    pub reference: SignatureReference,
}

/// Describe a signature over the authenticated content with the given digest.
pub fn build_signature_descriptor(digest_value: &DigestValue) -> SignatureDescriptor {
    SignatureDescriptor {
        canonicalization_method: CANONICALIZATION_METHOD,
        signature_method: SIGNATURE_METHOD,
        reference: SignatureReference {
            uri: AUTHENTICATED_CONTENT,
            transform: CANONICALIZATION_METHOD,
            digest_method: DIGEST_METHOD,
            digest_value: *digest_value,
        },
    }
}

impl SignatureDescriptor {
    /// `ds:SignedInfo` in canonical form: no whitespace between elements,
    /// explicit end tags, attribute values with `'` left as is.
    ///
    /// `default_namespace` is the `xmlns` in scope where the element sits in
    /// the request (`None` for a standalone rendering).
    pub fn to_xml(&self, default_namespace: Option<&str>) -> String {
        let uri = canonical_attribute(self.reference.uri);
        let default_ns = default_namespace
            .map(|ns| format!(" xmlns=\"{}\"", canonical_attribute(ns)))
            .unwrap_or_default();
        format!(
            "<ds:SignedInfo{default_ns} xmlns:ds=\"{XMLDSIG_NAMESPACE}\">\
             <ds:CanonicalizationMethod Algorithm=\"{}\"></ds:CanonicalizationMethod>\
             <ds:SignatureMethod Algorithm=\"{}\"></ds:SignatureMethod>\
             <ds:Reference URI=\"{uri}\">\
             <ds:Transforms><ds:Transform Algorithm=\"{}\"></ds:Transform></ds:Transforms>\
             <ds:DigestMethod Algorithm=\"{}\"></ds:DigestMethod>\
             <ds:DigestValue>{}</ds:DigestValue>\
             </ds:Reference>\
             </ds:SignedInfo>",
            self.canonicalization_method,
            self.signature_method,
            self.reference.transform,
            self.reference.digest_method,
            base64::engine::general_purpose::STANDARD.encode(self.reference.digest_value),
        )
    }

    /// Sign the rendered `SignedInfo` with an X002 key.
    pub fn sign(&self, key: &KeyPair, default_namespace: Option<&str>) -> EbicsResult<AuthSignature> {
        if key.version().family() != KeyFamily::Authentication {
            return Err(EbicsError::crypto(format!(
                "{} key cannot authenticate a request",
                key.version()
            )));
        }
        let signed_info = self.to_xml(default_namespace);
        let signature_value = authenticate(&digest(signed_info.as_bytes()), key.private_key())?;
        Ok(AuthSignature {
            signed_info,
            signature_value,
        })
    }
}

/// A signed `SignedInfo`, ready to be placed in the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSignature {
    pub signed_info: String,
    pub signature_value: Vec<u8>,
}

impl AuthSignature {
    /// The `AuthSignature` element of the request
    pub fn to_xml(&self) -> String {
        format!(
            "<AuthSignature>{}<ds:SignatureValue>{}</ds:SignatureValue></AuthSignature>",
            self.signed_info,
            base64::engine::general_purpose::STANDARD.encode(&self.signature_value)
        )
    }

    pub fn verify(&self, public_key: &RsaPublicKey) -> EbicsResult<()> {
        verify_authentication(
            &digest(self.signed_info.as_bytes()),
            &self.signature_value,
            public_key,
        )
    }
}

/// C14N attribute value escaping. Unlike general-purpose XML escaping, `'`
/// and `>` stay literal and whitespace controls become character references.
fn canonical_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}
