//! User settings for Contactbook
//!
//! The single keyed settings record: backup format preference, the attachment
//! overflow threshold, tabular truncation budgets and key-derivation cost.
//! Passwords are never part of it.

use serde::{Deserialize, Serialize};

use super::paths::ContactbookPaths;
use crate::crypto::key_derivation::KdfCost;
use crate::error::ContactbookError;
use crate::formats::{BackupFormat, TruncationLimits};

/// Attachments at or below this many bytes are stored inline
pub const DEFAULT_INLINE_THRESHOLD: u64 = 2 * 1024 * 1024;

/// Backup preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Format used when none is given on the command line
    #[serde(default)]
    pub default_format: BackupFormat,

    /// Attachment overflow threshold in bytes
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold_bytes: u64,

    /// Character budgets for large tabular cells
    #[serde(default)]
    pub truncation: TruncationLimits,

    /// Hand the written file to the share sheet after export
    #[serde(default)]
    pub share_after_export: bool,
}

fn default_inline_threshold() -> u64 {
    DEFAULT_INLINE_THRESHOLD
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            default_format: BackupFormat::default(),
            inline_threshold_bytes: default_inline_threshold(),
            truncation: TruncationLimits::default(),
            share_after_export: false,
        }
    }
}

/// Encryption preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EncryptionSettings {
    /// Argon2id cost used for newly encrypted backups
    #[serde(default)]
    pub kdf: KdfCost,
}

/// User settings for Contactbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub encryption: EncryptionSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
            encryption: EncryptionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &ContactbookPaths) -> Result<Self, ContactbookError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                ContactbookError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                ContactbookError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ContactbookPaths) -> Result<(), ContactbookError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            ContactbookError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(&settings_path, contents).map_err(|e| {
            ContactbookError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backup.default_format, BackupFormat::Structured);
        assert_eq!(settings.backup.inline_threshold_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.backup.truncation.profile_picture, 32_000);
        assert_eq!(settings.backup.truncation.file_data, 20_000);
        assert_eq!(settings.backup.truncation.thumbnail, 5_000);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup.default_format = BackupFormat::Tabular;
        settings.backup.inline_threshold_bytes = 1024;

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"backup": {"share_after_export": true}}"#)
            .unwrap();
        assert!(loaded.backup.share_after_export);
        assert_eq!(loaded.backup.inline_threshold_bytes, DEFAULT_INLINE_THRESHOLD);
        assert_eq!(loaded.schema_version, 1);
    }
}
