//! Structured (JSON) backup format
//!
//! Pretty-printed JSON of the whole document with camelCase keys. Lossless.

use crate::backup::BackupDocument;
use crate::crypto::Envelope;
use crate::error::{ContactbookError, ContactbookResult};

/// What a structured file turned out to contain
#[derive(Debug, Clone)]
pub enum StructuredPayload {
    Plain(Box<BackupDocument>),
    Encrypted(Envelope),
}

impl StructuredPayload {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

/// Serialize a document
pub fn encode(document: &BackupDocument) -> ContactbookResult<Vec<u8>> {
    serde_json::to_vec_pretty(document)
        .map_err(|e| ContactbookError::Export(format!("Failed to serialize backup: {}", e)))
}

/// Parse a structured file, recognising the encryption envelope
pub fn decode(bytes: &[u8]) -> ContactbookResult<StructuredPayload> {
    let value: serde_json::Value = serde_json::from_slice(strip_bom(bytes))
        .map_err(|e| ContactbookError::Import(format!("Invalid JSON backup: {}", e)))?;

    if !value.is_object() {
        return Err(ContactbookError::FormatUnsupported(
            "JSON backup must be an object".into(),
        ));
    }

    if Envelope::is_envelope(&value) {
        return Ok(StructuredPayload::Encrypted(Envelope::from_value(value)?));
    }

    let document = serde_json::from_value(value)
        .map_err(|e| ContactbookError::Import(format!("Invalid backup document: {}", e)))?;
    Ok(StructuredPayload::Plain(Box::new(document)))
}

/// Parse the plaintext recovered from an envelope
///
/// The plaintext is only trusted after authentication, so a body that does
/// not parse is still a decryption failure from the caller's point of view.
pub fn decode_decrypted(plaintext: &[u8]) -> ContactbookResult<BackupDocument> {
    serde_json::from_slice(plaintext).map_err(|_| ContactbookError::DecryptionFailed)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
