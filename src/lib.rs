//! Contactbook - personal contact manager with portable backups
//!
//! This library provides the core functionality for Contactbook: a local
//! store of contacts with their notes, links and file attachments, and a
//! backup pipeline that exports the whole store to one artifact and restores
//! it again.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (contacts, notes, links, attachments)
//! - `codec`: Inline/overflow attachment payload storage
//! - `storage`: JSON file storage layer and the operation gate
//! - `audit`: Audit logging system
//! - `crypto`: Password-based encryption envelope
//! - `formats`: Structured (JSON) and tabular (workbook) adapters
//! - `backup`: Snapshot, restore and the export/import pipeline
//! - `delivery`: Platform delivery fallback chain and import intake
//! - `display`, `cli`: Terminal front end
//!
//! # Example
//!
//! ```rust,ignore
//! use contactbook::backup::BackupService;
//! use contactbook::config::{paths::ContactbookPaths, settings::Settings};
//! use contactbook::storage::Storage;
//!
//! let paths = ContactbookPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let mut storage = Storage::new(paths, settings.backup.inline_threshold_bytes)?;
//! storage.load_all()?;
//! let outcome = BackupService::new(&storage, &settings).export_backup(settings.backup.default_format, None)?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod delivery;
pub mod display;
pub mod error;
pub mod formats;
pub mod models;
pub mod storage;

pub use error::{ContactbookError, ContactbookResult};
