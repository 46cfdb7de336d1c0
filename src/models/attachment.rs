//! Attachment model
//!
//! File attachments on a contact. The payload is either an inline data URL or
//! a reference to an overflow file managed by the attachment codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AttachmentId, ContactId};

/// Broad attachment category, derived from the MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Document,
    Image,
    Video,
    #[default]
    Other,
}

impl AttachmentKind {
    /// Infer the kind from a MIME type
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("text/")
            || mime == "application/pdf"
            || mime == "application/rtf"
            || mime == "application/msword"
            || mime.starts_with("application/vnd.openxmlformats-officedocument")
            || mime.starts_with("application/vnd.oasis.opendocument")
        {
            Self::Document
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        }
    }

    /// Parse attachment kind from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "document" => Some(Self::Document),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a payload stored outside the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowRef {
    /// Always `true`; marks the reference form on disk
    pub overflow: bool,
    /// File name relative to the blob directory
    pub locator: String,
}

/// How an attachment payload is kept in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredPayload {
    /// Self-describing data URL
    Inline(String),
    Overflow(OverflowRef),
}

impl StoredPayload {
    pub fn overflow(locator: impl Into<String>) -> Self {
        Self::Overflow(OverflowRef {
            overflow: true,
            locator: locator.into(),
        })
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow(_))
    }
}

/// A file attached to a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,

    pub contact_id: ContactId,

    /// Original file name
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: AttachmentKind,

    /// Payload length in bytes; always recomputed from the payload itself
    pub size: u64,

    pub mime_type: String,

    pub payload: StoredPayload,

    /// Self-describing image data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Create an attachment record for an already-encoded payload
    ///
    /// `size` must be the length of the raw bytes behind `payload`.
    pub fn new(
        contact_id: ContactId,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        payload: StoredPayload,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: AttachmentId::new(),
            contact_id,
            name: name.into(),
            kind: AttachmentKind::from_mime(&mime_type),
            size,
            mime_type,
            payload,
            thumbnail: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(AttachmentKind::from_mime("image/jpeg"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_mime("video/mp4"), AttachmentKind::Video);
        assert_eq!(
            AttachmentKind::from_mime("application/pdf"),
            AttachmentKind::Document
        );
        assert_eq!(AttachmentKind::from_mime("text/plain"), AttachmentKind::Document);
        assert_eq!(
            AttachmentKind::from_mime("application/zip"),
            AttachmentKind::Other
        );
    }

    #[test]
    fn test_payload_serialization_forms() {
        let inline = StoredPayload::Inline("data:text/plain;base64,aGk=".into());
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            serde_json::json!("data:text/plain;base64,aGk=")
        );

        let overflow = StoredPayload::overflow("abc.bin");
        let json = serde_json::to_value(&overflow).unwrap();
        assert_eq!(json["overflow"], true);
        assert_eq!(json["locator"], "abc.bin");

        let back: StoredPayload = serde_json::from_value(json).unwrap();
        assert!(back.is_overflow());
    }
}
