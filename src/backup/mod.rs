//! Backup system for Contactbook
//!
//! Exports the whole store into a single self-contained artifact and restores
//! it again.
//!
//! # Architecture
//!
//! - `document`: the backup document (every table plus metadata)
//! - `serializer`: snapshot of the live store, and replace-mode restore
//! - `warnings`: non-fatal losses reported by export and import
//! - `pipeline`: `BackupService`, which ties snapshot, format adapters,
//!   encryption and audit together under the store's operation gate
//!
//! # Example
//!
//! ```rust,ignore
//! use contactbook::backup::BackupService;
//! use contactbook::formats::BackupFormat;
//!
//! let service = BackupService::new(&storage, &settings);
//! let outcome = service.export_backup(BackupFormat::Structured, Some(&password))?;
//! broker.deliver(outcome.artifact, false)?;
//! ```

mod document;
mod pipeline;
mod serializer;
mod warnings;

pub use document::{BackupAttachment, BackupDocument, EntityCounts, BACKUP_SCHEMA_VERSION};
pub use pipeline::{inspect, BackupInspection, BackupService, ExportOutcome, ImportReport};
pub use serializer::{restore, snapshot, RestoreMode, RestoreReport, Snapshot};
pub use warnings::{BackupWarning, ImportWarning, LossReason};
