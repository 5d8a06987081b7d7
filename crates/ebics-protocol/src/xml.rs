//! Flat element index over a response document
//!
//! Responses are small and read once, so the parser records every element with
//! its full local-name path instead of building a tree. Lookups match a path
//! suffix, which keeps callers independent of namespace prefixes.

use ebics_core::{EbicsError, EbicsResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    /// Local names from the root down to this element
    pub path: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn ends_with(&self, suffix: &[&str]) -> bool {
        suffix.len() <= self.path.len()
            && self.path[self.path.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| a == b)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct XmlDocument {
    elements: Vec<Element>,
}

impl XmlDocument {
    pub fn parse(bytes: &[u8]) -> EbicsResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut elements: Vec<Element> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    path.push(local_name(&e));
                    elements.push(Element {
                        path: path.clone(),
                        attributes: attributes(&e)?,
                        text: String::new(),
                    });
                    open.push(elements.len() - 1);
                }
                Ok(Event::Empty(e)) => {
                    let mut element_path = path.clone();
                    element_path.push(local_name(&e));
                    elements.push(Element {
                        path: element_path,
                        attributes: attributes(&e)?,
                        text: String::new(),
                    });
                }
                Ok(Event::End(_)) => {
                    open.pop();
                    path.pop();
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| EbicsError::malformed(format!("bad character data: {e}")))?;
                    if let Some(&idx) = open.last() {
                        elements[idx].text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(&idx) = open.last() {
                        elements[idx]
                            .text
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(EbicsError::malformed(format!(
                        "XML error at byte {}: {e}",
                        reader.buffer_position()
                    )))
                }
            }
            buf.clear();
        }

        if !open.is_empty() {
            return Err(EbicsError::malformed(format!(
                "document ends inside <{}>",
                path.join("/")
            )));
        }
        if elements.is_empty() {
            return Err(EbicsError::malformed("empty document"));
        }
        Ok(Self { elements })
    }

    pub fn root_name(&self) -> &str {
        self.elements
            .first()
            .and_then(|e| e.path.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// First element whose path ends with `suffix`.
    pub fn find(&self, suffix: &[&str]) -> Option<&Element> {
        self.elements.iter().find(|e| e.ends_with(suffix))
    }

    /// First element ending with `suffix` that sits somewhere below `ancestor`.
    pub fn find_under(&self, ancestor: &str, suffix: &[&str]) -> Option<&Element> {
        self.elements.iter().find(|e| {
            e.ends_with(suffix)
                && e.path[..e.path.len() - suffix.len()]
                    .iter()
                    .any(|p| p == ancestor)
        })
    }

    pub fn text(&self, suffix: &[&str]) -> Option<&str> {
        self.find(suffix).map(|e| e.text.trim())
    }

    pub fn required_text(&self, suffix: &[&str]) -> EbicsResult<&str> {
        match self.text(suffix) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(EbicsError::malformed(format!(
                "missing element {}",
                suffix.join("/")
            ))),
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> EbicsResult<Vec<(String, String)>> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| EbicsError::malformed(format!("bad attribute: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| EbicsError::malformed(format!("bad attribute value: {e}")))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

/// Decode a base64 element body, tolerating line breaks inside it.
pub(crate) fn decode_base64(text: &str, what: &str) -> EbicsResult<Vec<u8>> {
    use base64::Engine as _;
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| EbicsError::malformed(format!("{what} is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ebicsResponse xmlns="urn:org:ebics:H004" Version="H004">
  <header authenticate="true">
    <static><TransactionID>ABCD</TransactionID></static>
    <mutable>
      <ReturnCode>000000</ReturnCode>
      <ReportText>[EBICS_OK] OK &amp; done</ReportText>
    </mutable>
  </header>
  <body>
    <h:ReturnCode xmlns:h="urn:org:ebics:H004">090005</h:ReturnCode>
    <Empty flag="1"/>
  </body>
</ebicsResponse>"#;

    #[test]
    fn test_suffix_lookup_distinguishes_header_and_body() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        assert_eq!(doc.root_name(), "ebicsResponse");
        assert_eq!(doc.text(&["mutable", "ReturnCode"]), Some("000000"));
        assert_eq!(doc.text(&["body", "ReturnCode"]), Some("090005"));
        assert_eq!(doc.text(&["ReportText"]), Some("[EBICS_OK] OK & done"));
    }

    #[test]
    fn test_attributes_and_empty_elements() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        assert_eq!(doc.find(&["header"]).unwrap().attribute("authenticate"), Some("true"));
        assert_eq!(doc.find(&["body", "Empty"]).unwrap().attribute("flag"), Some("1"));
        assert_eq!(doc.find_under("static", &["TransactionID"]).unwrap().text, "ABCD");
        assert!(doc.find_under("body", &["TransactionID"]).is_none());
    }

    #[test]
    fn test_required_text_reports_missing_path() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let err = doc.required_text(&["static", "NumSegments"]).unwrap_err();
        assert!(err.to_string().contains("static/NumSegments"));
    }

    #[test]
    fn test_broken_documents_are_malformed() {
        assert!(XmlDocument::parse(b"").is_err());
        assert!(XmlDocument::parse(b"<a><b></a>").is_err());
        assert!(XmlDocument::parse(b"<a><b>").is_err());
    }

    #[test]
    fn test_base64_with_line_breaks() {
        assert_eq!(decode_base64("aGVs\n bG8=\r\n", "x").unwrap(), b"hello");
        assert!(decode_base64("not base64!", "x").is_err());
    }
}
