//! Snapshot and restore of the whole store
//!
//! `snapshot` reads every table and rehydrates each attachment so the
//! document carries its own bytes. `restore` replaces every table with a
//! document's rows, re-running the inline/overflow decision per attachment.

use tracing::{debug, info, warn};

use super::document::{BackupAttachment, BackupDocument, EntityCounts};
use super::warnings::{BackupWarning, LossReason};
use crate::codec::{DataUrl, PayloadResolution};
use crate::config::settings::Settings;
use crate::error::ContactbookResult;
use crate::models::{Attachment, StoredPayload};
use crate::storage::{Storage, TableSet};

/// Self-contained copy of the store, plus what could not be included
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: BackupDocument,
    pub warnings: Vec<BackupWarning>,
}

/// How a restore treats existing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreMode {
    /// Clear every table, then insert the document's rows
    #[default]
    Replace,
}

/// Outcome of a restore
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub inserted: EntityCounts,
    /// Notes, links and attachments whose contact is not in the backup
    pub orphans: usize,
    pub warnings: Vec<BackupWarning>,
}

/// Read the whole store into a backup document
pub fn snapshot(storage: &Storage, settings: Option<&Settings>) -> ContactbookResult<Snapshot> {
    let mut document = BackupDocument::empty();
    let mut warnings = Vec::new();

    document.contacts = storage.contacts.get_all()?;
    document.notes = storage.notes.get_all()?;
    document.links = storage.links.get_all()?;
    document.settings = settings.cloned();

    for attachment in storage.attachments.get_all()? {
        let (data, size) = match storage.codec().decode(&attachment.payload) {
            PayloadResolution::Available(bytes) => (
                Some(DataUrl::encode(&attachment.mime_type, &bytes)),
                bytes.len() as u64,
            ),
            PayloadResolution::Unavailable(reason) => {
                warn!(attachment = %attachment.id, %reason, "attachment payload unavailable, exporting metadata only");
                warnings.push(BackupWarning::PartialAttachmentLoss {
                    entity_type: "Attachment",
                    entity_id: attachment.id.as_uuid().to_string(),
                    label: attachment.name.clone(),
                    field: "File Data",
                    reason: LossReason::Unavailable(reason.to_string()),
                });
                (None, attachment.size)
            }
        };

        document.attachments.push(BackupAttachment {
            id: attachment.id,
            contact_id: attachment.contact_id,
            name: attachment.name,
            kind: attachment.kind,
            size,
            mime_type: attachment.mime_type,
            data,
            thumbnail: attachment.thumbnail,
            created_at: attachment.created_at,
        });
    }

    debug!(
        contacts = document.contacts.len(),
        attachments = document.attachments.len(),
        "store snapshot taken"
    );
    Ok(Snapshot { document, warnings })
}

/// Replace the store's contents with `document`
///
/// New rows are staged in memory first; the four tables are then swapped and
/// persisted together. If persisting fails the previous state is reloaded,
/// overflow files written for the attempt are removed and the error is
/// returned. Overflow files of the replaced attachments are removed only
/// after the commit.
pub fn restore(
    storage: &Storage,
    document: BackupDocument,
    mode: RestoreMode,
) -> ContactbookResult<RestoreReport> {
    document.validate()?;
    let RestoreMode::Replace = mode;

    let orphans = document.orphan_count();
    let mut warnings = Vec::new();

    let mut contacts = document.contacts;
    for contact in &mut contacts {
        let Some(picture) = contact.profile_picture.as_deref() else {
            continue;
        };
        if DataUrl::parse(picture).is_none() {
            warnings.push(BackupWarning::PartialAttachmentLoss {
                entity_type: "Contact",
                entity_id: contact.id.as_uuid().to_string(),
                label: contact.name.clone(),
                field: "Profile Picture",
                reason: LossReason::Corrupt,
            });
            contact.profile_picture = None;
        }
    }

    let previous: Vec<StoredPayload> = storage
        .attachments
        .get_all()?
        .into_iter()
        .map(|a| a.payload)
        .collect();

    let mut attachments = Vec::with_capacity(document.attachments.len());
    let mut written = Vec::new();
    for incoming in document.attachments {
        match stage_attachment(storage, incoming, &mut warnings) {
            Some(attachment) => {
                written.push(attachment.payload.clone());
                attachments.push(attachment);
            }
            None => continue,
        }
    }

    let inserted = EntityCounts {
        contacts: contacts.len(),
        notes: document.notes.len(),
        links: document.links.len(),
        attachments: attachments.len(),
    };

    let staged = TableSet {
        contacts,
        notes: document.notes,
        links: document.links,
        attachments,
    };

    if let Err(e) = storage.replace_all(staged) {
        warn!(error = %e, "restore commit failed, previous data kept");
        storage.discard_payloads(&written);
        return Err(e);
    }

    storage.discard_payloads(&previous);

    info!(
        contacts = inserted.contacts,
        notes = inserted.notes,
        links = inserted.links,
        attachments = inserted.attachments,
        warnings = warnings.len(),
        "restore committed"
    );

    Ok(RestoreReport {
        inserted,
        orphans,
        warnings,
    })
}

/// Decode one backup attachment and store its payload
///
/// Returns `None` (with a warning) when the attachment cannot be restored.
fn stage_attachment(
    storage: &Storage,
    incoming: BackupAttachment,
    warnings: &mut Vec<BackupWarning>,
) -> Option<Attachment> {
    let loss = |field: &'static str, reason: LossReason| BackupWarning::PartialAttachmentLoss {
        entity_type: "Attachment",
        entity_id: incoming.id.as_uuid().to_string(),
        label: incoming.name.clone(),
        field,
        reason,
    };

    let Some(data) = incoming.data.as_deref() else {
        warnings.push(loss("File Data", LossReason::MissingData));
        return None;
    };

    let Some(decoded) = DataUrl::parse(data) else {
        warn!(attachment = %incoming.id, "attachment data does not decode");
        warnings.push(loss("File Data", LossReason::Corrupt));
        return None;
    };

    let payload = match storage.codec().encode(&decoded.bytes, &incoming.mime_type) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(attachment = %incoming.id, error = %e, "could not store attachment payload");
            warnings.push(loss("File Data", LossReason::StoreFailed(e.to_string())));
            return None;
        }
    };

    let thumbnail = match incoming.thumbnail.as_deref() {
        Some(thumb) if DataUrl::parse(thumb).is_none() => {
            warnings.push(loss("Thumbnail", LossReason::Corrupt));
            None
        }
        _ => incoming.thumbnail.clone(),
    };

    Some(Attachment {
        id: incoming.id,
        contact_id: incoming.contact_id,
        name: incoming.name.clone(),
        kind: incoming.kind,
        size: decoded.bytes.len() as u64,
        mime_type: incoming.mime_type.clone(),
        payload,
        thumbnail,
        created_at: incoming.created_at,
    })
}
