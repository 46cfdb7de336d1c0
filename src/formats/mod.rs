//! Backup format adapters
//!
//! Two encodings of a [`BackupDocument`]: lossless structured JSON, and a
//! lossy tabular workbook (zip archive, one CSV member per sheet) that cuts
//! oversized cells. Import sniffs the format from the content.
//!
//! [`BackupDocument`]: crate::backup::BackupDocument

pub mod structured;
pub mod tabular;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContactbookError, ContactbookResult};

/// Appended to every cut cell
pub const TRUNCATION_SENTINEL: &str = "...[TRUNCATED]";

/// Smallest budget that can still hold the sentinel
pub const MIN_CELL_BUDGET: usize = TRUNCATION_SENTINEL.len();

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Backup file format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackupFormat {
    /// Lossless JSON; the only format that can be encrypted
    #[default]
    Structured,
    /// Spreadsheet workbook; large binary cells are truncated
    Tabular,
}

impl BackupFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Tabular => "zip",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Tabular => "application/zip",
        }
    }

    pub fn supports_encryption(&self) -> bool {
        matches!(self, Self::Structured)
    }

    /// Guess from a file name's extension
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Structured),
            "zip" | "xlsx" => Some(Self::Tabular),
            _ => None,
        }
    }
}

impl fmt::Display for BackupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Tabular => write!(f, "tabular"),
        }
    }
}

/// Character budgets for large tabular cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationLimits {
    #[serde(default = "default_profile_picture")]
    pub profile_picture: usize,
    #[serde(default = "default_file_data")]
    pub file_data: usize,
    #[serde(default = "default_thumbnail")]
    pub thumbnail: usize,
}

fn default_profile_picture() -> usize {
    32_000
}

fn default_file_data() -> usize {
    20_000
}

fn default_thumbnail() -> usize {
    5_000
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self {
            profile_picture: default_profile_picture(),
            file_data: default_file_data(),
            thumbnail: default_thumbnail(),
        }
    }
}

impl TruncationLimits {
    /// Every budget must leave room for the sentinel
    pub fn validate(&self) -> ContactbookResult<()> {
        for (name, budget) in [
            ("profile_picture", self.profile_picture),
            ("file_data", self.file_data),
            ("thumbnail", self.thumbnail),
        ] {
            if budget < MIN_CELL_BUDGET {
                return Err(ContactbookError::Validation(format!(
                    "Truncation budget {} must be at least {} characters, got {}",
                    name, MIN_CELL_BUDGET, budget
                )));
            }
        }
        Ok(())
    }
}

/// Cut `value` to at most `budget` characters, ending with the sentinel
///
/// Returns the cell and whether it was cut.
pub fn truncate_cell(value: &str, budget: usize) -> (String, bool) {
    if value.chars().count() <= budget {
        return (value.to_string(), false);
    }

    let keep = budget.saturating_sub(MIN_CELL_BUDGET);
    let mut cell: String = value.chars().take(keep).collect();
    cell.push_str(TRUNCATION_SENTINEL);
    (cell, true)
}

/// Whether a cell was cut on export
pub fn is_truncated(cell: &str) -> bool {
    cell.ends_with(TRUNCATION_SENTINEL)
}

/// Work out the format of an incoming file
///
/// Content wins; the file name is only consulted when the bytes are
/// inconclusive.
pub fn detect_format(file_name: Option<&str>, bytes: &[u8]) -> ContactbookResult<BackupFormat> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(ZIP_EMPTY_MAGIC) {
        return Ok(BackupFormat::Tabular);
    }

    let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(first) = text.iter().find(|b| !b.is_ascii_whitespace()) {
        if *first == b'{' {
            return Ok(BackupFormat::Structured);
        }
    }

    if let Some(format) = file_name.and_then(BackupFormat::from_extension) {
        if !bytes.is_empty() {
            return Ok(format);
        }
    }

    Err(ContactbookError::FormatUnsupported(
        file_name.unwrap_or("input").to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_cell_budget() {
        let value = "x".repeat(100);
        let (cell, cut) = truncate_cell(&value, 40);
        assert!(cut);
        assert_eq!(cell.chars().count(), 40);
        assert!(is_truncated(&cell));

        let (cell, cut) = truncate_cell(&value, 100);
        assert!(!cut);
        assert_eq!(cell, value);
    }

    #[test]
    fn test_truncate_at_minimum_budget() {
        let (cell, cut) = truncate_cell("abcdefghijklmnopqrstuvwxyz", MIN_CELL_BUDGET);
        assert!(cut);
        assert_eq!(cell, TRUNCATION_SENTINEL);
    }

    #[test]
    fn test_limits_validate() {
        TruncationLimits::default().validate().unwrap();
        let limits = TruncationLimits {
            thumbnail: 3,
            ..TruncationLimits::default()
        };
        assert!(limits.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_detect_by_content() {
        assert_eq!(
            detect_format(Some("backup.zip"), b"  {\"contacts\": []}").unwrap(),
            BackupFormat::Structured
        );
        assert_eq!(
            detect_format(Some("backup.json"), b"PK\x03\x04rest").unwrap(),
            BackupFormat::Tabular
        );
        assert_eq!(
            detect_format(None, b"\xEF\xBB\xBF{}").unwrap(),
            BackupFormat::Structured
        );
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        assert_eq!(
            detect_format(Some("Backup.JSON"), b"[1,2]").unwrap(),
            BackupFormat::Structured
        );
    }

    #[test]
    fn test_detect_unsupported() {
        let err = detect_format(Some("notes.txt"), b"hello").unwrap_err();
        assert!(matches!(err, ContactbookError::FormatUnsupported(_)));
        assert!(detect_format(Some("empty.json"), b"").is_err());
    }
}
