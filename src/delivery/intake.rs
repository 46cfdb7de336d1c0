//! Import side of delivery
//!
//! A backup arrives either from a file picker (a path) or from a share-target
//! handoff (name plus bytes). Both end up as an [`IncomingArtifact`] with its
//! format already detected.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{ContactbookError, ContactbookResult};
use crate::formats::{detect_format, BackupFormat};

/// Largest backup accepted for import
pub const MAX_IMPORT_BYTES: u64 = 1024 * 1024 * 1024;

/// Where an incoming backup comes from
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    Picker(PathBuf),
    ShareTarget { name: String, bytes: Vec<u8> },
}

/// A backup ready for decoding
#[derive(Debug, Clone)]
pub struct IncomingArtifact {
    pub file_name: Option<String>,
    pub format: BackupFormat,
    pub bytes: Vec<u8>,
}

impl IncomingArtifact {
    /// Read the source and detect its format
    pub fn receive(source: ArtifactSource) -> ContactbookResult<Self> {
        let (file_name, bytes) = match source {
            ArtifactSource::Picker(path) => {
                let len = fs::metadata(&path)
                    .map_err(|e| {
                        ContactbookError::Io(format!("Cannot read {}: {}", path.display(), e))
                    })?
                    .len();
                if len > MAX_IMPORT_BYTES {
                    return Err(ContactbookError::Validation(format!(
                        "{} is too large to import ({} bytes)",
                        path.display(),
                        len
                    )));
                }

                let bytes = fs::read(&path).map_err(|e| {
                    ContactbookError::Io(format!("Cannot read {}: {}", path.display(), e))
                })?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                (name, bytes)
            }
            ArtifactSource::ShareTarget { name, bytes } => {
                let name = (!name.trim().is_empty()).then_some(name);
                (name, bytes)
            }
        };

        Self::from_bytes(file_name, bytes)
    }

    pub fn from_bytes(file_name: Option<String>, bytes: Vec<u8>) -> ContactbookResult<Self> {
        let format = detect_format(file_name.as_deref(), &bytes)?;
        debug!(?file_name, %format, bytes = bytes.len(), "incoming backup");
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("shared backup")
    }
}
