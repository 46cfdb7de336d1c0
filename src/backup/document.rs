//! In-memory backup document
//!
//! The complete, self-contained copy of every table that both backup formats
//! encode. Attachments carry their bytes inline as data URLs; an attachment
//! whose payload could not be read has `data: null`.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::settings::Settings;
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::{AttachmentId, AttachmentKind, Contact, ContactId, Link, Note};

/// Current backup schema version
pub const BACKUP_SCHEMA_VERSION: u32 = 1;

/// An attachment as it appears in a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupAttachment {
    pub id: AttachmentId,
    pub contact_id: ContactId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: AttachmentKind,
    /// Informational only; recomputed from `data` on restore
    #[serde(default)]
    pub size: u64,
    pub mime_type: String,
    /// Payload as a data URL, or `None` when it was unavailable at export
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub attachments: Vec<BackupAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl BackupDocument {
    /// An empty document stamped with the current version and time
    pub fn empty() -> Self {
        Self {
            schema_version: BACKUP_SCHEMA_VERSION,
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            contacts: Vec::new(),
            notes: Vec::new(),
            links: Vec::new(),
            attachments: Vec::new(),
            settings: None,
        }
    }

    /// Row counts per table
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            contacts: self.contacts.len(),
            notes: self.notes.len(),
            links: self.links.len(),
            attachments: self.attachments.len(),
        }
    }

    /// Structural checks run before anything is written
    ///
    /// Rows pointing at a contact that is not in the document are allowed.
    pub fn validate(&self) -> ContactbookResult<()> {
        if self.schema_version != BACKUP_SCHEMA_VERSION {
            return Err(ContactbookError::Validation(format!(
                "Schema version mismatch: expected {}, got {}",
                BACKUP_SCHEMA_VERSION, self.schema_version
            )));
        }

        for contact in &self.contacts {
            if contact.name.trim().is_empty() {
                return Err(ContactbookError::Validation(format!(
                    "Contact {} has a blank name",
                    contact.id
                )));
            }
        }

        check_unique("contact", self.contacts.iter().map(|c| c.id))?;
        check_unique("note", self.notes.iter().map(|n| n.id))?;
        check_unique("link", self.links.iter().map(|l| l.id))?;
        check_unique("attachment", self.attachments.iter().map(|a| a.id))?;

        Ok(())
    }

    /// Number of notes, links and attachments whose contact is not present
    pub fn orphan_count(&self) -> usize {
        let contact_ids: HashSet<_> = self.contacts.iter().map(|c| c.id).collect();
        self.notes
            .iter()
            .map(|n| n.contact_id)
            .chain(self.links.iter().map(|l| l.contact_id))
            .chain(self.attachments.iter().map(|a| a.contact_id))
            .filter(|id| !contact_ids.contains(id))
            .count()
    }
}

fn check_unique<I, T>(entity: &str, ids: I) -> ContactbookResult<()>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + std::fmt::Display,
{
    let mut seen = HashSet::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(ContactbookError::Validation(format!(
                "Duplicate {} id {} in backup",
                entity, id
            )));
        }
        seen.insert(id);
    }
    Ok(())
}

/// Rows per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub contacts: usize,
    pub notes: usize,
    pub links: usize,
    pub attachments: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.contacts + self.notes + self.links + self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackupDocument {
        let mut doc = BackupDocument::empty();
        let ada = Contact::new("Ada");
        doc.notes.push(Note::new(ada.id, "Met", "salon"));
        doc.contacts.push(ada);
        doc
    }

    #[test]
    fn test_valid_document() {
        sample().validate().unwrap();
    }

    #[test]
    fn test_schema_mismatch() {
        let mut doc = sample();
        doc.schema_version = 7;
        assert!(doc.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_duplicate_ids() {
        let mut doc = sample();
        let dup = doc.contacts[0].clone();
        doc.contacts.push(dup);
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate contact"));
    }

    #[test]
    fn test_blank_name() {
        let mut doc = sample();
        doc.contacts[0].name = "   ".into();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_orphans_are_allowed() {
        let mut doc = sample();
        doc.links
            .push(Link::new(ContactId::new(), "Gone", "https://example.com"));
        doc.validate().unwrap();
        assert_eq!(doc.orphan_count(), 1);
    }

    #[test]
    fn test_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("schemaVersion").is_some());
        assert!(json.get("exportedAt").is_some());
        assert!(json.get("appVersion").is_some());
        assert!(json.get("settings").is_none());
        assert!(json["notes"][0].get("contactId").is_some());
    }
}
