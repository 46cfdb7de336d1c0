//! Generic JSON-backed entity table
//!
//! Each entity table is an in-memory map guarded by a `RwLock`, loaded from and
//! saved to a single JSON file with atomic writes.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ContactbookError;
use crate::models::{Attachment, AttachmentId, Contact, ContactId, Link, LinkId, Note, NoteId};

use super::file_io::{read_json, stage_json, write_json_atomic, StagedFile};

/// A row that can live in a [`Table`]
pub trait Record: Clone + Serialize + DeserializeOwned {
    type Id: Copy + Eq + Hash + Ord + std::fmt::Display;

    /// Human-readable table name, used in error messages
    const ENTITY: &'static str;

    fn id(&self) -> Self::Id;
    fn set_id(&mut self, id: Self::Id);
    fn fresh_id() -> Self::Id;
    fn created_at(&self) -> DateTime<Utc>;
}

/// A row that belongs to a contact
pub trait ContactOwned {
    fn contact_id(&self) -> ContactId;
}

macro_rules! impl_record {
    ($ty:ty, $id:ty, $entity:literal) => {
        impl Record for $ty {
            type Id = $id;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn set_id(&mut self, id: Self::Id) {
                self.id = id;
            }

            fn fresh_id() -> Self::Id {
                <$id>::new()
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

impl_record!(Contact, ContactId, "Contact");
impl_record!(Note, NoteId, "Note");
impl_record!(Link, LinkId, "Link");
impl_record!(Attachment, AttachmentId, "Attachment");

impl ContactOwned for Note {
    fn contact_id(&self) -> ContactId {
        self.contact_id
    }
}

impl ContactOwned for Link {
    fn contact_id(&self) -> ContactId {
        self.contact_id
    }
}

impl ContactOwned for Attachment {
    fn contact_id(&self) -> ContactId {
        self.contact_id
    }
}

/// Serializable file layout: `{ "rows": [...] }`
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
struct TableFile<T> {
    rows: Vec<T>,
}

impl<T> Default for TableFile<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

/// Repository for one entity table
pub struct Table<T: Record> {
    path: PathBuf,
    data: RwLock<HashMap<T::Id, T>>,
}

impl<T: Record> Table<T> {
    /// Create a new, empty table backed by `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load rows from disk, replacing whatever is in memory
    pub fn load(&self) -> Result<(), ContactbookError> {
        let file: TableFile<T> = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        for row in file.rows {
            data.insert(row.id(), row);
        }

        Ok(())
    }

    /// Save rows to disk
    pub fn save(&self) -> Result<(), ContactbookError> {
        let rows = self.get_all()?;
        write_json_atomic(&self.path, &TableFile { rows })
    }

    /// Write rows to the table's temp file, leaving the table file untouched
    pub fn stage(&self) -> Result<StagedFile, ContactbookError> {
        let rows = self.get_all()?;
        stage_json(&self.path, &TableFile { rows })
    }

    /// Get a row by ID
    pub fn get(&self, id: T::Id) -> Result<Option<T>, ContactbookError> {
        let data = self.data.read().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.get(&id).cloned())
    }

    /// Get all rows, oldest first
    pub fn get_all(&self) -> Result<Vec<T>, ContactbookError> {
        let data = self.data.read().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut rows: Vec<_> = data.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(rows)
    }

    /// Insert a new row, assigning it a fresh ID
    pub fn insert(&self, mut row: T) -> Result<T::Id, ContactbookError> {
        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let mut id = T::fresh_id();
        while data.contains_key(&id) {
            id = T::fresh_id();
        }
        row.set_id(id);
        data.insert(id, row);
        Ok(id)
    }

    /// Update an existing row in place
    pub fn update(&self, row: T) -> Result<(), ContactbookError> {
        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        match data.get_mut(&row.id()) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(ContactbookError::NotFound {
                entity_type: T::ENTITY,
                identifier: row.id().to_string(),
            }),
        }
    }

    /// Delete a row, returning it if present
    pub fn delete(&self, id: T::Id) -> Result<Option<T>, ContactbookError> {
        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(data.remove(&id))
    }

    /// Replace every row at once, keeping the rows' own IDs
    pub fn replace_all(&self, rows: Vec<T>) -> Result<(), ContactbookError> {
        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        for row in rows {
            data.insert(row.id(), row);
        }
        Ok(())
    }

    /// Count rows
    pub fn count(&self) -> Result<usize, ContactbookError> {
        let data = self.data.read().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.len())
    }
}

impl<T: Record + ContactOwned> Table<T> {
    /// All rows belonging to a contact, oldest first
    pub fn by_contact(&self, contact_id: ContactId) -> Result<Vec<T>, ContactbookError> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|row| row.contact_id() == contact_id)
            .collect())
    }

    /// Remove all rows belonging to a contact, returning them
    pub fn delete_by_contact(&self, contact_id: ContactId) -> Result<Vec<T>, ContactbookError> {
        let mut data = self.data.write().map_err(|e| {
            ContactbookError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let ids: Vec<_> = data
            .values()
            .filter(|row| row.contact_id() == contact_id)
            .map(|row| row.id())
            .collect();

        Ok(ids.into_iter().filter_map(|id| data.remove(&id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_table<T: Record>(file: &str) -> (TempDir, Table<T>) {
        let temp_dir = TempDir::new().unwrap();
        let table = Table::new(temp_dir.path().join(file));
        (temp_dir, table)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, table) = create_test_table::<Contact>("contacts.json");
        table.load().unwrap();
        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_assigns_id() {
        let (_temp_dir, table) = create_test_table::<Contact>("contacts.json");

        let draft = Contact::new("Ada");
        let draft_id = draft.id;
        let id = table.insert(draft).unwrap();

        assert_ne!(id, draft_id);
        assert_eq!(table.get(id).unwrap().unwrap().name, "Ada");
        assert!(table.get(draft_id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_row_fails() {
        let (_temp_dir, table) = create_test_table::<Contact>("contacts.json");
        let err = table.update(Contact::new("Ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, table) = create_test_table::<Contact>("contacts.json");
        let id = table.insert(Contact::new("Ada")).unwrap();
        table.save().unwrap();

        let reloaded: Table<Contact> = Table::new(temp_dir.path().join("contacts.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(id).unwrap().unwrap().name, "Ada");
    }

    #[test]
    fn test_delete_by_contact() {
        let (_temp_dir, table) = create_test_table::<Note>("notes.json");
        let ada = ContactId::new();
        let grace = ContactId::new();

        table.insert(Note::new(ada, "one", "")).unwrap();
        table.insert(Note::new(ada, "two", "")).unwrap();
        table.insert(Note::new(grace, "three", "")).unwrap();

        assert_eq!(table.by_contact(ada).unwrap().len(), 2);

        let removed = table.delete_by_contact(ada).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(table.count().unwrap(), 1);
        assert_eq!(table.by_contact(grace).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_all_keeps_ids() {
        let (_temp_dir, table) = create_test_table::<Contact>("contacts.json");
        table.insert(Contact::new("Old")).unwrap();

        let incoming = Contact::new("New");
        let incoming_id = incoming.id;
        table.replace_all(vec![incoming]).unwrap();

        assert_eq!(table.count().unwrap(), 1);
        assert!(table.get(incoming_id).unwrap().is_some());
    }
}
