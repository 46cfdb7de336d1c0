//! Custom error types for Contactbook
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for Contactbook operations
#[derive(Error, Debug)]
pub enum ContactbookError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed input: missing required fields, bad ids, invalid options
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Wrong password or corrupt envelope. Deliberately carries no detail.
    #[error("Decryption failed: wrong password or corrupted backup")]
    DecryptionFailed,

    /// An encrypted backup was supplied without a password
    #[error("This backup is encrypted; a password is required")]
    PasswordRequired,

    /// Unrecognized backup file
    #[error("Unsupported backup format: {0}")]
    FormatUnsupported(String),

    /// Every delivery strategy was exhausted
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Another export or import is already running
    #[error("Busy: {0} already in progress")]
    Busy(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Encryption errors (wrapping side only)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ContactbookError {
    /// Create a "not found" error for contacts
    pub fn contact_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Contact",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for notes
    pub fn note_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Note",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for attachments
    pub fn attachment_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Attachment",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a decryption failure
    pub fn is_decryption_failed(&self) -> bool {
        matches!(self, Self::DecryptionFailed)
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ContactbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ContactbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for ContactbookError {
    fn from(err: csv::Error) -> Self {
        Self::Import(format!("CSV error: {}", err))
    }
}

impl From<zip::result::ZipError> for ContactbookError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Import(format!("Workbook archive error: {}", err))
    }
}

/// Result type alias for Contactbook operations
pub type ContactbookResult<T> = Result<T, ContactbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContactbookError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = ContactbookError::contact_not_found("Ada Lovelace");
        assert_eq!(err.to_string(), "Contact not found: Ada Lovelace");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_decryption_failed_is_generic() {
        let err = ContactbookError::DecryptionFailed;
        assert!(err.is_decryption_failed());
        assert!(!err.to_string().contains("nonce"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ContactbookError = io_err.into();
        assert!(matches!(err, ContactbookError::Io(_)));
    }
}
