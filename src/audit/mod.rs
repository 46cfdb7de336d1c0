//! Audit logging for Contactbook
//!
//! Records create, update and delete of contacts, notes, links and
//! attachments, plus backup export/import events, in an append-only JSONL
//! file.
//!
//! - `AuditEntry`: one event with timestamp, operation and entity.
//! - `AuditLogger`: appends entries to the log and reads them back.

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
