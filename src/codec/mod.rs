//! Attachment codec
//!
//! Converts attachment payloads between raw bytes and their stored form.
//! Payloads up to the inline threshold become data URLs inside the record;
//! anything larger is written to the blob directory and referenced by a
//! relative locator. `decode` resolves either branch and reports a missing or
//! corrupt payload as [`PayloadResolution::Unavailable`] instead of failing.

pub mod data_url;

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ContactbookError, ContactbookResult};
use crate::models::StoredPayload;
use crate::storage::file_io::write_bytes_atomic;

pub use data_url::DataUrl;

/// Why a payload could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The overflow file does not exist
    MissingFile(String),
    /// The overflow file exists but could not be read
    Unreadable(String),
    /// The locator is not a plain file name
    InvalidLocator(String),
    /// The inline data URL does not decode
    CorruptInline,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFile(locator) => write!(f, "payload file {} is missing", locator),
            Self::Unreadable(msg) => write!(f, "payload file unreadable: {}", msg),
            Self::InvalidLocator(locator) => write!(f, "invalid payload locator {}", locator),
            Self::CorruptInline => write!(f, "inline payload is not valid base64 data"),
        }
    }
}

/// Outcome of resolving a stored payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadResolution {
    Available(Vec<u8>),
    Unavailable(UnavailableReason),
}

impl PayloadResolution {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The bytes, if the payload resolved
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Available(bytes) => Some(bytes),
            Self::Unavailable(_) => None,
        }
    }
}

/// Inline/overflow codec bound to a blob directory and a size threshold
#[derive(Debug, Clone)]
pub struct AttachmentCodec {
    blob_dir: PathBuf,
    threshold: u64,
}

impl AttachmentCodec {
    /// Create a codec; payloads of at most `threshold` bytes stay inline
    pub fn new(blob_dir: PathBuf, threshold: u64) -> Self {
        Self {
            blob_dir,
            threshold,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn blob_dir(&self) -> &PathBuf {
        &self.blob_dir
    }

    /// Whether a payload of `len` bytes goes to the overflow store
    pub fn overflows(&self, len: usize) -> bool {
        len as u64 > self.threshold
    }

    /// Encode a payload into its stored form
    pub fn encode(&self, payload: &[u8], mime_type: &str) -> ContactbookResult<StoredPayload> {
        if !self.overflows(payload.len()) {
            return Ok(StoredPayload::Inline(DataUrl::encode(mime_type, payload)));
        }

        let locator = format!("{}.bin", Uuid::new_v4());
        let path = self.blob_dir.join(&locator);
        write_bytes_atomic(&path, payload).map_err(|e| {
            ContactbookError::Storage(format!("Failed to write overflow payload: {}", e))
        })?;

        debug!(locator = %locator, bytes = payload.len(), "attachment stored in overflow");
        Ok(StoredPayload::overflow(locator))
    }

    /// Resolve a stored payload back to bytes
    pub fn decode(&self, stored: &StoredPayload) -> PayloadResolution {
        match stored {
            StoredPayload::Inline(data) => match DataUrl::parse(data) {
                Some(url) => PayloadResolution::Available(url.bytes),
                None => PayloadResolution::Unavailable(UnavailableReason::CorruptInline),
            },
            StoredPayload::Overflow(reference) => {
                let Some(path) = self.locate(&reference.locator) else {
                    return PayloadResolution::Unavailable(UnavailableReason::InvalidLocator(
                        reference.locator.clone(),
                    ));
                };

                match fs::read(&path) {
                    Ok(bytes) => PayloadResolution::Available(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        warn!(locator = %reference.locator, "overflow payload missing");
                        PayloadResolution::Unavailable(UnavailableReason::MissingFile(
                            reference.locator.clone(),
                        ))
                    }
                    Err(e) => PayloadResolution::Unavailable(UnavailableReason::Unreadable(
                        e.to_string(),
                    )),
                }
            }
        }
    }

    /// Remove the overflow file behind a payload, if any
    ///
    /// Inline payloads and already-missing files are a no-op.
    pub fn discard(&self, stored: &StoredPayload) -> ContactbookResult<()> {
        let StoredPayload::Overflow(reference) = stored else {
            return Ok(());
        };
        let Some(path) = self.locate(&reference.locator) else {
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContactbookError::Storage(format!(
                "Failed to remove overflow payload {}: {}",
                reference.locator, e
            ))),
        }
    }

    /// Map a locator to a path inside the blob directory
    fn locate(&self, locator: &str) -> Option<PathBuf> {
        let plain = !locator.is_empty()
            && !locator.contains(['/', '\\'])
            && locator != "."
            && locator != "..";
        plain.then(|| self.blob_dir.join(locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn codec(threshold: u64) -> (TempDir, AttachmentCodec) {
        let temp_dir = TempDir::new().unwrap();
        let codec = AttachmentCodec::new(temp_dir.path().join("blobs"), threshold);
        (temp_dir, codec)
    }

    #[test]
    fn test_threshold_boundary() {
        let (_temp, codec) = codec(16);

        let at_threshold = vec![7u8; 16];
        let stored = codec.encode(&at_threshold, "application/octet-stream").unwrap();
        assert!(!stored.is_overflow());
        assert_eq!(codec.decode(&stored), PayloadResolution::Available(at_threshold));

        let one_over = vec![9u8; 17];
        let stored = codec.encode(&one_over, "application/octet-stream").unwrap();
        assert!(stored.is_overflow());
        assert_eq!(codec.decode(&stored), PayloadResolution::Available(one_over));
    }

    #[test]
    fn test_overflow_locator_is_relative() {
        let (_temp, codec) = codec(0);
        let stored = codec.encode(b"abc", "text/plain").unwrap();
        let StoredPayload::Overflow(reference) = &stored else {
            panic!("expected overflow");
        };
        assert!(!reference.locator.contains('/'));
        assert!(codec.blob_dir().join(&reference.locator).exists());
    }

    #[test]
    fn test_missing_overflow_file_is_unavailable() {
        let (_temp, codec) = codec(0);
        let stored = codec.encode(b"abc", "text/plain").unwrap();
        codec.discard(&stored).unwrap();

        match codec.decode(&stored) {
            PayloadResolution::Unavailable(UnavailableReason::MissingFile(_)) => {}
            other => panic!("unexpected resolution: {:?}", other),
        }
        // Discarding twice is fine
        codec.discard(&stored).unwrap();
    }

    #[test]
    fn test_corrupt_inline_is_unavailable() {
        let (_temp, codec) = codec(1024);
        let stored = StoredPayload::Inline("data:text/plain;base64,%%%".into());
        assert_eq!(
            codec.decode(&stored),
            PayloadResolution::Unavailable(UnavailableReason::CorruptInline)
        );
    }

    #[test]
    fn test_locator_cannot_escape_blob_dir() {
        let (_temp, codec) = codec(0);
        let stored = StoredPayload::overflow("../config.json");
        assert!(matches!(
            codec.decode(&stored),
            PayloadResolution::Unavailable(UnavailableReason::InvalidLocator(_))
        ));
    }
}
