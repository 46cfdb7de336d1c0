//! Storage layer for Contactbook
//!
//! Provides the entity tables (JSON files with atomic writes), the attachment
//! codec bound to the store's blob directory, and the re-entrancy gate used by
//! export/import.

pub mod file_io;
pub mod gate;
pub mod table;

pub use file_io::{commit_all, read_json, stage_json, write_bytes_atomic, write_json_atomic, StagedFile};
pub use gate::{GateGuard, OperationGate};
pub use table::{ContactOwned, Record, Table};

use tracing::{debug, warn};

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::codec::AttachmentCodec;
use crate::config::paths::ContactbookPaths;
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::{
    Attachment, AttachmentId, Contact, ContactId, Link, LinkId, Note, NoteId, StoredPayload,
};

/// Rows removed by a cascading contact delete
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeReport {
    pub contact: Contact,
    pub notes: usize,
    pub links: usize,
    pub attachments: usize,
}

/// Full contents of every entity table, used for bulk replacement
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub contacts: Vec<Contact>,
    pub notes: Vec<Note>,
    pub links: Vec<Link>,
    pub attachments: Vec<Attachment>,
}

/// Main storage coordinator that provides access to all tables
pub struct Storage {
    paths: ContactbookPaths,
    codec: AttachmentCodec,
    gate: OperationGate,
    audit: AuditLogger,
    pub contacts: Table<Contact>,
    pub notes: Table<Note>,
    pub links: Table<Link>,
    pub attachments: Table<Attachment>,
}

impl Storage {
    /// Create a new Storage instance
    ///
    /// Attachments of at most `inline_threshold` bytes are stored inline.
    pub fn new(paths: ContactbookPaths, inline_threshold: u64) -> Result<Self, ContactbookError> {
        paths.ensure_directories()?;

        Ok(Self {
            codec: AttachmentCodec::new(paths.blob_dir(), inline_threshold),
            gate: OperationGate::new(),
            audit: AuditLogger::new(paths.audit_log()),
            contacts: Table::new(paths.contacts_file()),
            notes: Table::new(paths.notes_file()),
            links: Table::new(paths.links_file()),
            attachments: Table::new(paths.attachments_file()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &ContactbookPaths {
        &self.paths
    }

    /// Codec bound to this store's blob directory
    pub fn codec(&self) -> &AttachmentCodec {
        &self.codec
    }

    /// Audit log shared by every write
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Take the store-wide gate for an export or import
    pub fn begin_exclusive(&self, operation: &'static str) -> ContactbookResult<GateGuard<'_>> {
        self.gate.try_enter(operation)
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), ContactbookError> {
        self.reload()
    }

    fn reload(&self) -> Result<(), ContactbookError> {
        self.contacts.load()?;
        self.notes.load()?;
        self.links.load()?;
        self.attachments.load()?;
        Ok(())
    }

    /// Save all data to disk
    ///
    /// Every table is staged before any is renamed, so a failed write leaves
    /// all four table files as they were.
    pub fn save_all(&self) -> Result<(), ContactbookError> {
        let staged = vec![
            self.contacts.stage()?,
            self.notes.stage()?,
            self.links.stage()?,
            self.attachments.stage()?,
        ];
        commit_all(staged)
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.settings_file().exists()
    }

    /// Persist, or put memory back in line with disk if persisting fails
    fn commit(&self) -> ContactbookResult<()> {
        if let Err(e) = self.save_all() {
            warn!(error = %e, "commit failed, reloading tables from disk");
            self.reload()?;
            return Err(e);
        }
        Ok(())
    }

    // ---- single-entity writes ----

    /// Insert a contact; the store assigns its ID
    pub fn create_contact(&self, contact: Contact) -> ContactbookResult<ContactId> {
        self.gate.ensure_idle()?;
        contact
            .validate()
            .map_err(|e| ContactbookError::Validation(e.to_string()))?;

        let name = contact.name.clone();
        let id = self.contacts.insert(contact)?;
        self.contacts.save()?;

        self.audit
            .log(&AuditEntry::create(EntityType::Contact, id.to_string(), Some(name)))?;
        Ok(id)
    }

    /// Update a contact in place, bumping `updated_at`
    pub fn update_contact(&self, mut contact: Contact) -> ContactbookResult<()> {
        self.gate.ensure_idle()?;
        contact
            .validate()
            .map_err(|e| ContactbookError::Validation(e.to_string()))?;

        let before = self
            .contacts
            .get(contact.id)?
            .ok_or_else(|| ContactbookError::contact_not_found(contact.id.to_string()))?;

        contact.touch();
        self.contacts.update(contact.clone())?;
        self.contacts.save()?;

        self.audit.log(&AuditEntry::update(
            EntityType::Contact,
            contact.id.to_string(),
            Some(contact.name.clone()),
            &before,
            &contact,
        ))
    }

    /// Delete a contact together with its notes, links and attachments
    ///
    /// Children are removed before the contact and everything is persisted as
    /// one unit; on failure the tables are reloaded from disk. Overflow files
    /// are removed only after the commit succeeded.
    pub fn delete_contact(&self, id: ContactId) -> ContactbookResult<CascadeReport> {
        self.gate.ensure_idle()?;

        if self.contacts.get(id)?.is_none() {
            return Err(ContactbookError::contact_not_found(id.to_string()));
        }

        let notes = self.notes.delete_by_contact(id)?;
        let links = self.links.delete_by_contact(id)?;
        let attachments = self.attachments.delete_by_contact(id)?;
        let contact = self
            .contacts
            .delete(id)?
            .ok_or_else(|| ContactbookError::contact_not_found(id.to_string()))?;

        self.commit()?;

        let mut entries: Vec<AuditEntry> = notes
            .iter()
            .map(|n| AuditEntry::delete(EntityType::Note, n.id.to_string(), Some(n.title.clone())))
            .chain(links.iter().map(|l| {
                AuditEntry::delete(EntityType::Link, l.id.to_string(), Some(l.title.clone()))
            }))
            .chain(attachments.iter().map(|a| {
                AuditEntry::delete(EntityType::Attachment, a.id.to_string(), Some(a.name.clone()))
            }))
            .collect();
        entries.push(AuditEntry::delete(
            EntityType::Contact,
            id.to_string(),
            Some(contact.name.clone()),
        ));
        self.audit.log_batch(&entries)?;

        for attachment in &attachments {
            if let Err(e) = self.codec.discard(&attachment.payload) {
                warn!(attachment = %attachment.id, error = %e, "could not remove overflow payload");
            }
        }

        debug!(
            contact = %id,
            notes = notes.len(),
            links = links.len(),
            attachments = attachments.len(),
            "contact deleted with cascade"
        );

        Ok(CascadeReport {
            contact,
            notes: notes.len(),
            links: links.len(),
            attachments: attachments.len(),
        })
    }

    fn require_contact(&self, id: ContactId) -> ContactbookResult<()> {
        match self.contacts.get(id)? {
            Some(_) => Ok(()),
            None => Err(ContactbookError::contact_not_found(id.to_string())),
        }
    }

    pub fn add_note(&self, note: Note) -> ContactbookResult<NoteId> {
        self.gate.ensure_idle()?;
        self.require_contact(note.contact_id)?;
        if note.title.trim().is_empty() {
            return Err(ContactbookError::Validation("Note title cannot be empty".into()));
        }

        let title = note.title.clone();
        let id = self.notes.insert(note)?;
        self.notes.save()?;

        self.audit
            .log(&AuditEntry::create(EntityType::Note, id.to_string(), Some(title)))?;
        Ok(id)
    }

    pub fn delete_note(&self, id: NoteId) -> ContactbookResult<Note> {
        self.gate.ensure_idle()?;
        let note = self
            .notes
            .delete(id)?
            .ok_or_else(|| ContactbookError::note_not_found(id.to_string()))?;
        self.notes.save()?;

        self.audit.log(&AuditEntry::delete(
            EntityType::Note,
            id.to_string(),
            Some(note.title.clone()),
        ))?;
        Ok(note)
    }

    pub fn add_link(&self, link: Link) -> ContactbookResult<LinkId> {
        self.gate.ensure_idle()?;
        self.require_contact(link.contact_id)?;
        if link.url.trim().is_empty() {
            return Err(ContactbookError::Validation("Link URL cannot be empty".into()));
        }

        let title = link.title.clone();
        let id = self.links.insert(link)?;
        self.links.save()?;

        self.audit
            .log(&AuditEntry::create(EntityType::Link, id.to_string(), Some(title)))?;
        Ok(id)
    }

    /// Store a new attachment from raw bytes
    ///
    /// The size is taken from `bytes`, and the payload goes inline or to the
    /// overflow store according to the codec threshold.
    pub fn add_attachment(
        &self,
        contact_id: ContactId,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
        thumbnail: Option<String>,
    ) -> ContactbookResult<AttachmentId> {
        self.gate.ensure_idle()?;
        self.require_contact(contact_id)?;

        let payload = self.codec.encode(bytes, mime_type)?;
        let mut attachment =
            Attachment::new(contact_id, name, mime_type, bytes.len() as u64, payload.clone());
        attachment.thumbnail = thumbnail;

        let id = self.attachments.insert(attachment)?;
        if let Err(e) = self.attachments.save() {
            if let Err(discard_err) = self.codec.discard(&payload) {
                warn!(attachment = %id, error = %discard_err, "could not remove overflow payload");
            }
            self.attachments.delete(id)?;
            return Err(e);
        }

        self.audit.log(
            &AuditEntry::create(EntityType::Attachment, id.to_string(), Some(name.to_string()))
                .with_details(serde_json::json!({ "size": bytes.len(), "mimeType": mime_type })),
        )?;
        Ok(id)
    }

    pub fn delete_attachment(&self, id: AttachmentId) -> ContactbookResult<Attachment> {
        self.gate.ensure_idle()?;
        let attachment = self
            .attachments
            .delete(id)?
            .ok_or_else(|| ContactbookError::attachment_not_found(id.to_string()))?;
        self.attachments.save()?;
        self.codec.discard(&attachment.payload)?;

        self.audit.log(&AuditEntry::delete(
            EntityType::Attachment,
            id.to_string(),
            Some(attachment.name.clone()),
        ))?;
        Ok(attachment)
    }

    /// Find a contact by ID, ID prefix, or case-insensitive name
    pub fn resolve_contact(&self, query: &str) -> ContactbookResult<Contact> {
        let query = query.trim();
        let contacts = self.contacts.get_all()?;

        if let Ok(id) = query.parse::<ContactId>() {
            if let Some(contact) = contacts.iter().find(|c| c.id == id) {
                return Ok(contact.clone());
            }
        }

        let by_name: Vec<_> = contacts
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(query))
            .collect();
        if by_name.len() == 1 {
            return Ok(by_name[0].clone());
        }

        let by_prefix: Vec<_> = contacts
            .iter()
            .filter(|c| c.id.matches_prefix(query))
            .collect();
        match (by_name.len(), by_prefix.len()) {
            (0, 1) => Ok(by_prefix[0].clone()),
            (0, 0) => Err(ContactbookError::contact_not_found(query)),
            _ => Err(ContactbookError::Validation(format!(
                "'{}' matches more than one contact; use the contact ID",
                query
            ))),
        }
    }

    // ---- whole-store operations ----

    /// Swap every table for `incoming` and persist as one unit
    ///
    /// Must be called while holding the gate. On failure the previous on-disk
    /// state is reloaded and the error returned.
    pub fn replace_all(&self, incoming: TableSet) -> ContactbookResult<()> {
        self.contacts.replace_all(incoming.contacts)?;
        self.notes.replace_all(incoming.notes)?;
        self.links.replace_all(incoming.links)?;
        self.attachments.replace_all(incoming.attachments)?;
        self.commit()
    }

    /// Remove overflow files for payloads that are no longer referenced
    pub fn discard_payloads<'a>(&self, payloads: impl IntoIterator<Item = &'a StoredPayload>) {
        for payload in payloads {
            if let Err(e) = self.codec.discard(payload) {
                warn!(error = %e, "could not remove overflow payload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage(threshold: u64) -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = ContactbookPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths, threshold).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_test_storage(1024);
        assert!(temp_dir.path().join("data").exists());
        assert!(temp_dir.path().join("blobs").exists());
        assert!(!storage.is_initialized());
    }

    #[test]
    fn test_create_contact_validates() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let err = storage.create_contact(Contact::new("  ")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.contacts.count().unwrap(), 0);
    }

    #[test]
    fn test_attachment_size_comes_from_bytes() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let contact_id = storage.create_contact(Contact::new("Ada")).unwrap();

        let id = storage
            .add_attachment(contact_id, "notes.txt", "text/plain", b"hello", None)
            .unwrap();
        let attachment = storage.attachments.get(id).unwrap().unwrap();
        assert_eq!(attachment.size, 5);
        assert!(!attachment.payload.is_overflow());
    }

    #[test]
    fn test_delete_contact_cascades() {
        let (_temp_dir, storage) = create_test_storage(4);
        let ada = storage.create_contact(Contact::new("Ada")).unwrap();
        let grace = storage.create_contact(Contact::new("Grace")).unwrap();

        storage.add_note(Note::new(ada, "Met", "at the salon")).unwrap();
        storage.add_note(Note::new(grace, "Met", "at Harvard")).unwrap();
        storage
            .add_link(Link::new(ada, "Code", "https://github.com/ada"))
            .unwrap();
        let att = storage
            .add_attachment(ada, "big.bin", "application/octet-stream", &[0u8; 64], None)
            .unwrap();
        let payload = storage.attachments.get(att).unwrap().unwrap().payload;
        assert!(payload.is_overflow());

        let report = storage.delete_contact(ada).unwrap();
        assert_eq!(report.notes, 1);
        assert_eq!(report.links, 1);
        assert_eq!(report.attachments, 1);

        assert_eq!(storage.notes.count().unwrap(), 1);
        assert_eq!(storage.links.count().unwrap(), 0);
        assert_eq!(storage.attachments.count().unwrap(), 0);
        assert!(!storage.codec().decode(&payload).is_available());
    }

    #[test]
    fn test_writes_are_audited() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let id = storage.create_contact(Contact::new("Ada")).unwrap();
        let mut contact = storage.contacts.get(id).unwrap().unwrap();
        contact.email = Some("ada@example.com".into());
        storage.update_contact(contact).unwrap();
        storage.delete_contact(id).unwrap();

        let entries = storage.audit().read_all().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].changed_fields, vec!["email"]);
        assert_eq!(entries[2].entity_type, EntityType::Contact);
    }

    #[test]
    fn test_writes_refused_while_gate_held() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let _guard = storage.begin_exclusive("export").unwrap();

        let err = storage.create_contact(Contact::new("Ada")).unwrap_err();
        assert!(matches!(err, ContactbookError::Busy(_)));
    }

    #[test]
    fn test_resolve_contact() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let id = storage.create_contact(Contact::new("Ada Lovelace")).unwrap();
        storage.create_contact(Contact::new("Grace Hopper")).unwrap();

        assert_eq!(storage.resolve_contact("ada lovelace").unwrap().id, id);
        assert_eq!(storage.resolve_contact(&id.to_string()).unwrap().id, id);
        assert!(storage.resolve_contact("Charles").unwrap_err().is_not_found());
    }

    #[test]
    fn test_note_requires_existing_contact() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let err = storage
            .add_note(Note::new(ContactId::new(), "Orphan", ""))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Occupy a table's temp path with a directory so staging it fails
    fn block_temp_file(table_file: std::path::PathBuf) {
        std::fs::create_dir_all(file_io::temp_path_for(&table_file)).unwrap();
    }

    #[test]
    fn test_failed_cascade_leaves_disk_and_memory_untouched() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let ada = storage.create_contact(Contact::new("Ada")).unwrap();
        storage.add_note(Note::new(ada, "Met", "at the salon")).unwrap();

        block_temp_file(storage.paths().notes_file());
        assert!(storage.delete_contact(ada).is_err());

        assert_eq!(storage.contacts.count().unwrap(), 1);
        assert_eq!(storage.notes.count().unwrap(), 1);

        // Disk agrees with memory
        storage.reload().unwrap();
        assert!(storage.contacts.get(ada).unwrap().is_some());
        assert_eq!(storage.notes.by_contact(ada).unwrap().len(), 1);
        assert!(!file_io::temp_path_for(&storage.paths().contacts_file()).exists());
    }

    #[test]
    fn test_failed_replace_all_keeps_previous_tables() {
        let (_temp_dir, storage) = create_test_storage(1024);
        let ada = storage.create_contact(Contact::new("Ada")).unwrap();
        storage
            .add_link(Link::new(ada, "Code", "https://github.com/ada"))
            .unwrap();

        let grace = Contact::new("Grace");
        let incoming = TableSet {
            contacts: vec![grace.clone()],
            notes: vec![Note::new(grace.id, "Met", "at Harvard")],
            ..TableSet::default()
        };

        block_temp_file(storage.paths().links_file());
        assert!(storage.replace_all(incoming).is_err());

        storage.reload().unwrap();
        let contacts = storage.contacts.get_all().unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, ada);
        assert_eq!(storage.notes.count().unwrap(), 0);
        assert_eq!(storage.links.count().unwrap(), 1);
    }

    #[test]
    fn test_failed_attachment_save_removes_overflow_file() {
        let (_temp_dir, storage) = create_test_storage(4);
        let ada = storage.create_contact(Contact::new("Ada")).unwrap();

        block_temp_file(storage.paths().attachments_file());
        assert!(storage
            .add_attachment(ada, "big.bin", "application/octet-stream", &[1u8; 64], None)
            .is_err());

        assert_eq!(storage.attachments.count().unwrap(), 0);
        assert_eq!(
            std::fs::read_dir(storage.paths().blob_dir()).unwrap().count(),
            0
        );
    }
}
