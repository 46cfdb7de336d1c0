//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the store and backup services.

pub mod attachment;
pub mod backup;
pub mod contact;
pub mod note;

pub use attachment::{handle_attachment_command, AttachmentCommands};
pub use backup::{handle_backup_command, BackupCommands};
pub use contact::{handle_contact_command, ContactCommands};
pub use note::{handle_link_command, handle_note_command, LinkCommands, NoteCommands};
