//! Audit entry data structures
//!
//! Entries record what happened to which entity. They never carry payloads
//! (attachment bytes, pictures) or passwords; updates list the names of the
//! changed fields instead of before/after values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// A backup artifact was produced
    Export,
    /// The store was replaced from a backup
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Export => write!(f, "EXPORT"),
            Operation::Import => write!(f, "IMPORT"),
        }
    }
}

/// Types of entities that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Contact,
    Note,
    Link,
    Attachment,
    Backup,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Contact => write!(f, "Contact"),
            EntityType::Note => write!(f, "Note"),
            EntityType::Link => write!(f, "Link"),
            EntityType::Attachment => write!(f, "Attachment"),
            EntityType::Backup => write!(f, "Backup"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_type: EntityType,

    pub entity_id: String,

    /// Human-readable label (contact name, file name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    /// Field names touched by an update
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,

    /// Small structured summary (counts, format); never payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    fn new(
        operation: Operation,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id: entity_id.into(),
            entity_name,
            changed_fields: Vec::new(),
            details: None,
        }
    }

    pub fn create(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
    ) -> Self {
        Self::new(Operation::Create, entity_type, entity_id, entity_name)
    }

    /// Update entry listing the top-level fields that differ
    pub fn update<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) -> Self {
        let mut entry = Self::new(Operation::Update, entity_type, entity_id, entity_name);
        entry.changed_fields = changed_fields(before, after);
        entry
    }

    pub fn delete(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
    ) -> Self {
        Self::new(Operation::Delete, entity_type, entity_id, entity_name)
    }

    /// Export/import event with a summary
    pub fn backup(operation: Operation, file_name: impl Into<String>, details: serde_json::Value) -> Self {
        let mut entry = Self::new(operation, EntityType::Backup, file_name, None);
        entry.details = Some(details);
        entry
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(name) = &self.entity_name {
            output.push_str(&format!(" ({})", name));
        }

        if !self.changed_fields.is_empty() {
            output.push_str(&format!("\n  Changed: {}", self.changed_fields.join(", ")));
        }

        output
    }
}

/// Top-level keys whose values differ, ignoring `updatedAt`
fn changed_fields<T: Serialize>(before: &T, after: &T) -> Vec<String> {
    let (Ok(serde_json::Value::Object(before)), Ok(serde_json::Value::Object(after))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return Vec::new();
    };

    let mut keys: Vec<String> = before
        .keys()
        .chain(after.keys())
        .filter(|k| k.as_str() != "updatedAt")
        .filter(|k| before.get(*k) != after.get(*k))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "CREATE");
        assert_eq!(Operation::Export.to_string(), "EXPORT");
        assert_eq!(Operation::Import.to_string(), "IMPORT");
    }

    #[test]
    fn test_update_lists_changed_fields_only() {
        let before = json!({"name": "Ada", "email": "a@x.io", "updatedAt": "1"});
        let after = json!({"name": "Ada", "email": "ada@x.io", "phone": "1", "updatedAt": "2"});
        let entry = AuditEntry::update(EntityType::Contact, "con-1", None, &before, &after);
        assert_eq!(entry.changed_fields, vec!["email", "phone"]);
    }

    #[test]
    fn test_backup_entry_serialization() {
        let entry = AuditEntry::backup(
            Operation::Export,
            "contacts-backup-20240101-120000.json",
            json!({"format": "structured", "encrypted": true, "contacts": 3}),
        );
        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains("\"operation\":\"export\""));
        assert!(line.contains("\"entity_type\":\"backup\""));
        assert!(!line.contains("changed_fields"));
    }

    #[test]
    fn test_format_human_readable() {
        let entry = AuditEntry::create(EntityType::Contact, "con-12345678", Some("Ada".into()));
        let output = entry.format_human_readable();
        assert!(output.contains("CREATE Contact con-12345678 (Ada)"));
    }
}
