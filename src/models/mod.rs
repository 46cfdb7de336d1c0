//! Core data models for Contactbook
//!
//! The entity tables: contacts and the notes, links and attachments that
//! reference them by `contact_id`.

pub mod attachment;
pub mod contact;
pub mod ids;
pub mod link;
pub mod note;

pub use attachment::{Attachment, AttachmentKind, OverflowRef, StoredPayload};
pub use contact::{Contact, ContactValidationError, CustomField};
pub use ids::{AttachmentId, ContactId, LinkId, NoteId};
pub use link::{Link, LinkType};
pub use note::Note;
