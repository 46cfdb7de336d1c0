//! Artifact delivery and intake
//!
//! Gets a finished backup onto durable storage through a platform-specific
//! fallback chain, and turns picked or shared files back into bytes for
//! import.

pub mod broker;
pub mod host;
pub mod intake;
pub mod platform;

use chrono::{DateTime, Utc};

use crate::formats::BackupFormat;

pub use broker::{
    AttemptFailure, DeliveryBroker, DeliveryFailure, DeliveryReceipt, Location, Strategy,
};
pub use intake::{ArtifactSource, IncomingArtifact};
pub use platform::PlatformCapability;

/// A finished backup file, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub format: BackupFormat,
    pub encrypted: bool,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(format: BackupFormat, encrypted: bool, bytes: Vec<u8>, created_at: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name_for(format, created_at),
            mime_type: format.mime_type(),
            format,
            encrypted,
            bytes,
        }
    }
}

/// `contacts-backup-<YYYYMMDD-HHMMSS>.<json|zip>`
pub fn file_name_for(format: BackupFormat, at: DateTime<Utc>) -> String {
    format!(
        "contacts-backup-{}.{}",
        at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}
