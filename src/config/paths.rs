//! Path management for Contactbook
//!
//! Resolves where the store, overflow blobs, settings and exported backups live.
//!
//! ## Path Resolution Order
//!
//! 1. `CONTACTBOOK_DATA_DIR` environment variable (if set)
//! 2. The platform data directory reported by `directories::ProjectDirs`
//!
//! Delivery directories (Documents, cache, Downloads) come from
//! `directories::UserDirs` / `ProjectDirs` and fall back to folders under the
//! base directory when the platform does not report one.

use std::path::PathBuf;

use directories::{ProjectDirs, UserDirs};

use crate::error::ContactbookError;

/// Manages all paths used by Contactbook
#[derive(Debug, Clone)]
pub struct ContactbookPaths {
    /// Base directory for all Contactbook data
    base_dir: PathBuf,
    documents_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    downloads_dir: Option<PathBuf>,
}

impl ContactbookPaths {
    /// Create a new ContactbookPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined.
    pub fn new() -> Result<Self, ContactbookError> {
        // An explicit data dir keeps every path, delivery folders included, under it
        if let Ok(custom) = std::env::var("CONTACTBOOK_DATA_DIR") {
            return Ok(Self::with_base_dir(PathBuf::from(custom)));
        }

        let project = ProjectDirs::from("", "", "contactbook");
        let user = UserDirs::new();

        let base_dir = project
            .as_ref()
            .map(|p| p.data_dir().to_path_buf())
            .ok_or_else(|| ContactbookError::Config("Could not determine a data directory".into()))?;

        Ok(Self {
            base_dir,
            documents_dir: user
                .as_ref()
                .and_then(|u| u.document_dir().map(|d| d.join("Contactbook"))),
            cache_dir: project.as_ref().map(|p| p.cache_dir().to_path_buf()),
            downloads_dir: user
                .as_ref()
                .and_then(|u| u.download_dir().map(|d| d.to_path_buf())),
        })
    }

    /// Create ContactbookPaths rooted entirely under one directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            documents_dir: None,
            cache_dir: None,
            downloads_dir: None,
        }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (entity tables)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the directory holding overflow attachment payloads
    pub fn blob_dir(&self) -> PathBuf {
        self.base_dir.join("blobs")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn contacts_file(&self) -> PathBuf {
        self.data_dir().join("contacts.json")
    }

    pub fn notes_file(&self) -> PathBuf {
        self.data_dir().join("notes.json")
    }

    pub fn links_file(&self) -> PathBuf {
        self.data_dir().join("links.json")
    }

    pub fn attachments_file(&self) -> PathBuf {
        self.data_dir().join("attachments.json")
    }

    /// Primary export directory (Documents-like)
    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("Documents"))
    }

    /// Secondary export directory
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("cache"))
    }

    /// Tertiary export directory, private to the application
    pub fn private_dir(&self) -> PathBuf {
        self.base_dir.join("private")
    }

    /// Where simulated browser downloads land
    pub fn downloads_dir(&self) -> PathBuf {
        self.downloads_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("Downloads"))
    }

    /// Ensure the store directories exist
    ///
    /// Delivery directories are created lazily by the delivery strategies so
    /// a failing primary directory never leaves empty folders behind.
    pub fn ensure_directories(&self) -> Result<(), ContactbookError> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            ContactbookError::Io(format!("Failed to create base directory: {}", e))
        })?;

        std::fs::create_dir_all(self.data_dir()).map_err(|e| {
            ContactbookError::Io(format!("Failed to create data directory: {}", e))
        })?;

        std::fs::create_dir_all(self.blob_dir()).map_err(|e| {
            ContactbookError::Io(format!("Failed to create blob directory: {}", e))
        })?;

        Ok(())
    }

    /// Check if Contactbook has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.blob_dir(), temp_dir.path().join("blobs"));
        assert_eq!(paths.documents_dir(), temp_dir.path().join("Documents"));
        assert_eq!(paths.cache_dir(), temp_dir.path().join("cache"));
        assert_eq!(paths.private_dir(), temp_dir.path().join("private"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("CONTACTBOOK_DATA_DIR", custom_path);

        let paths = ContactbookPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.downloads_dir(), temp_dir.path().join("Downloads"));

        env::remove_var("CONTACTBOOK_DATA_DIR");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.blob_dir().exists());
        assert!(!paths.documents_dir().exists());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.contacts_file(),
            temp_dir.path().join("data").join("contacts.json")
        );
    }
}
