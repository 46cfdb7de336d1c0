//! Note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::{ContactId, NoteId};

/// A free-form note attached to a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,

    /// Owning contact. Not enforced by the store on load; orphans are tolerated.
    pub contact_id: ContactId,

    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note for a contact
    pub fn new(contact_id: ContactId, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new(),
            contact_id,
            title: title.into(),
            content: content.into(),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the body and bump the modification timestamp
    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_bumps_updated_at() {
        let mut note = Note::new(ContactId::new(), "Met at conference", "");
        let created = note.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        note.edit("Talked about difference engines");
        assert!(note.updated_at > created);
        assert_eq!(note.created_at, created);
    }

    #[test]
    fn test_contact_id_key() {
        let note = Note::new(ContactId::new(), "t", "c");
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("contactId").is_some());
    }
}
