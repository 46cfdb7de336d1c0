//! Display formatting for terminal output
//!
//! Provides utilities for formatting contacts, their related records and
//! backup results for terminal display.

pub mod backup;
pub mod contact;

pub use backup::{format_delivery, format_import_report, format_inspection, format_warnings};
pub use contact::{
    format_attachment_list, format_contact_details, format_contact_list, format_link_list,
    format_note_list, format_size,
};
