//! Self-describing inline encoding
//!
//! Payloads kept inside a record are stored as `data:<mime>;base64,<body>` so
//! they carry their own MIME type and can be rehydrated without a lookup.

use base64::{engine::general_purpose::STANDARD, Engine};

const PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A decoded data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Encode bytes as a base64 data URL
    pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
        let mime_type = if mime_type.trim().is_empty() {
            "application/octet-stream"
        } else {
            mime_type.trim()
        };
        let mut out = String::with_capacity(PREFIX.len() + mime_type.len() + 8 + bytes.len() * 4 / 3 + 4);
        out.push_str(PREFIX);
        out.push_str(mime_type);
        out.push_str(BASE64_MARKER);
        STANDARD.encode_string(bytes, &mut out);
        out
    }

    /// Decode a data URL; `None` if it is not a well-formed base64 data URL
    pub fn parse(s: &str) -> Option<Self> {
        let (mime_type, body) = split(s)?;
        let bytes = STANDARD.decode(body.trim()).ok()?;
        Some(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// MIME type of a data URL without decoding the body
    pub fn mime_of(s: &str) -> Option<&str> {
        split(s).map(|(mime, _)| mime)
    }
}

fn split(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix(PREFIX)?;
    let (mime_type, body) = rest.split_once(BASE64_MARKER)?;
    if mime_type.contains(',') {
        return None;
    }
    Some((mime_type, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_and_parse() {
        let url = DataUrl::encode("image/png", b"\x89PNG\r\n");
        assert!(url.starts_with("data:image/png;base64,"));

        let parsed = DataUrl::parse(&url).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.bytes, b"\x89PNG\r\n");
    }

    #[test]
    fn test_empty_mime_defaults() {
        let url = DataUrl::encode("", b"x");
        assert_eq!(DataUrl::mime_of(&url), Some("application/octet-stream"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(DataUrl::parse("image/png;base64,AAAA").is_none());
        assert!(DataUrl::parse("data:image/png,AAAA").is_none());
        assert!(DataUrl::parse("data:image/png;base64,@@@@").is_none());
    }

    #[test]
    fn test_empty_payload() {
        let url = DataUrl::encode("text/plain", b"");
        assert_eq!(DataUrl::parse(&url).unwrap().bytes, Vec::<u8>::new());
    }
}
