//! Non-fatal problems found while building or reading a backup

use std::fmt;

/// Why a binary field did not make it through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LossReason {
    /// The cell was cut to fit the spreadsheet budget
    Truncated,
    /// The payload could not be read from the local store
    Unavailable(String),
    /// The backup holds no data for it
    MissingData,
    /// The stored value is not a valid data URL
    Corrupt,
    /// Writing it into the local store failed
    StoreFailed(String),
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated in the spreadsheet export"),
            Self::Unavailable(msg) => write!(f, "unavailable ({})", msg),
            Self::MissingData => write!(f, "no data in the backup"),
            Self::Corrupt => write!(f, "not valid encoded data"),
            Self::StoreFailed(msg) => write!(f, "could not be stored ({})", msg),
        }
    }
}

/// A warning attached to an export or import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupWarning {
    /// A binary field (attachment data, thumbnail, profile picture) was lost
    PartialAttachmentLoss {
        /// "Attachment" or "Contact"
        entity_type: &'static str,
        /// Full UUID of the entity
        entity_id: String,
        /// File or contact name
        label: String,
        /// Column or field that was dropped
        field: &'static str,
        reason: LossReason,
    },
    /// A tabular cell was cut on export
    FieldTruncated {
        entity_type: &'static str,
        entity_id: String,
        field: &'static str,
    },
    /// A spreadsheet row could not be read
    RowSkipped {
        sheet: &'static str,
        /// 1-based data row
        row: usize,
        reason: String,
    },
}

/// Warnings reported by an import
pub type ImportWarning = BackupWarning;

impl BackupWarning {
    pub fn is_partial_attachment_loss(&self) -> bool {
        matches!(self, Self::PartialAttachmentLoss { .. })
    }

    /// Entity the warning is about, if any
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::PartialAttachmentLoss { entity_id, .. } | Self::FieldTruncated { entity_id, .. } => {
                Some(entity_id)
            }
            Self::RowSkipped { .. } => None,
        }
    }
}

impl fmt::Display for BackupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialAttachmentLoss {
                entity_type,
                entity_id,
                label,
                field,
                reason,
            } => write!(
                f,
                "{} '{}' ({}): {} {}",
                entity_type, label, entity_id, field, reason
            ),
            Self::FieldTruncated {
                entity_type,
                entity_id,
                field,
            } => write!(f, "{} {}: {} truncated", entity_type, entity_id, field),
            Self::RowSkipped { sheet, row, reason } => {
                write!(f, "{} row {} skipped: {}", sheet, row, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_entity() {
        let warning = BackupWarning::PartialAttachmentLoss {
            entity_type: "Attachment",
            entity_id: "550e8400-e29b-41d4-a716-446655440000".into(),
            label: "scan.pdf".into(),
            field: "File Data",
            reason: LossReason::Truncated,
        };
        let text = warning.to_string();
        assert!(text.contains("scan.pdf"));
        assert!(text.contains("truncated"));
        assert!(warning.is_partial_attachment_loss());
        assert_eq!(
            warning.entity_id(),
            Some("550e8400-e29b-41d4-a716-446655440000")
        );
    }
}
