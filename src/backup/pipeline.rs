//! Export and import pipelines
//!
//! Export: snapshot → format adapter → optional envelope → artifact.
//! Import: detect → optional unwrap → format adapter → restore.
//!
//! Both hold the store's operation gate for their whole run, so CRUD
//! mutations and a second backup operation are refused with `Busy` until
//! they finish.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::document::{BackupDocument, EntityCounts};
use super::serializer::{restore, snapshot, RestoreMode};
use super::warnings::BackupWarning;
use crate::audit::{AuditEntry, Operation};
use crate::config::settings::Settings;
use crate::crypto::{self, SecureString};
use crate::delivery::{Artifact, IncomingArtifact};
use crate::error::{ContactbookError, ContactbookResult};
use crate::formats::structured::{self, StructuredPayload};
use crate::formats::{tabular, BackupFormat};
use crate::storage::Storage;

/// A finished export, not yet delivered
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub artifact: Artifact,
    pub counts: EntityCounts,
    pub warnings: Vec<BackupWarning>,
}

/// Result of an import
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub format: BackupFormat,
    pub encrypted: bool,
    pub inserted: EntityCounts,
    /// Rows restored whose contact is not in the backup
    pub orphans: usize,
    pub warnings: Vec<BackupWarning>,
}

impl ImportReport {
    pub fn partial_losses(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.is_partial_attachment_loss())
            .count()
    }
}

/// What a backup file contains, without importing it
#[derive(Debug, Clone)]
pub struct BackupInspection {
    pub format: BackupFormat,
    pub encrypted: bool,
    /// `None` when the file is encrypted and no password was given
    pub counts: Option<EntityCounts>,
    pub exported_at: Option<DateTime<Utc>>,
    pub app_version: Option<String>,
    pub warnings: Vec<BackupWarning>,
}

/// Runs backup export and import against one store
pub struct BackupService<'a> {
    storage: &'a Storage,
    settings: &'a Settings,
}

impl<'a> BackupService<'a> {
    pub fn new(storage: &'a Storage, settings: &'a Settings) -> Self {
        Self { storage, settings }
    }

    /// Produce a backup artifact of the whole store
    ///
    /// A password is only accepted for the structured format.
    pub fn export_backup(
        &self,
        format: BackupFormat,
        password: Option<&SecureString>,
    ) -> ContactbookResult<ExportOutcome> {
        if password.is_some() && !format.supports_encryption() {
            return Err(ContactbookError::Validation(format!(
                "{} backups cannot be encrypted; use the structured format",
                format
            )));
        }

        let _guard = self.storage.begin_exclusive("export")?;
        info!(%format, encrypted = password.is_some(), "export started");

        let snapshot = snapshot(self.storage, Some(self.settings))?;
        let counts = snapshot.document.counts();
        let mut warnings = snapshot.warnings;

        let bytes = match format {
            BackupFormat::Structured => {
                let plain = Zeroizing::new(structured::encode(&snapshot.document)?);
                match password {
                    Some(password) => {
                        let envelope =
                            crypto::wrap(&plain, password.as_str(), self.settings.encryption.kdf)?;
                        envelope.to_bytes()?
                    }
                    None => plain.to_vec(),
                }
            }
            BackupFormat::Tabular => {
                let export = tabular::encode(&snapshot.document, &self.settings.backup.truncation)?;
                warnings.extend(export.warnings);
                export.bytes
            }
        };

        let artifact = Artifact::new(format, password.is_some(), bytes, Utc::now());

        self.storage.audit().log(&AuditEntry::backup(
            Operation::Export,
            artifact.file_name.clone(),
            json!({
                "format": format,
                "encrypted": artifact.encrypted,
                "counts": counts,
                "warnings": warnings.len(),
            }),
        ))?;

        info!(
            file = %artifact.file_name,
            bytes = artifact.bytes.len(),
            warnings = warnings.len(),
            "export finished"
        );

        Ok(ExportOutcome {
            artifact,
            counts,
            warnings,
        })
    }

    /// Replace the store with the contents of a backup
    ///
    /// Nothing is written unless the whole file decodes (and, if encrypted,
    /// authenticates).
    pub fn import_backup(
        &self,
        incoming: &IncomingArtifact,
        password: Option<&SecureString>,
    ) -> ContactbookResult<ImportReport> {
        let _guard = self.storage.begin_exclusive("import")?;
        info!(file = incoming.display_name(), format = %incoming.format, "import started");

        let decoded = decode(incoming, password)?;
        let report = restore(self.storage, decoded.document, RestoreMode::Replace)?;

        let mut warnings = decoded.warnings;
        warnings.extend(report.warnings);

        let entry = AuditEntry::backup(
            Operation::Import,
            incoming.display_name().to_string(),
            json!({
                "format": incoming.format,
                "encrypted": decoded.encrypted,
                "counts": report.inserted,
                "orphans": report.orphans,
                "warnings": warnings.len(),
            }),
        );
        // The store is already replaced; a failed audit write must not report the import as failed
        if let Err(e) = self.storage.audit().log(&entry) {
            warn!(error = %e, "could not record import in audit log");
        }

        info!(
            inserted = report.inserted.total(),
            warnings = warnings.len(),
            "import finished"
        );

        Ok(ImportReport {
            format: incoming.format,
            encrypted: decoded.encrypted,
            inserted: report.inserted,
            orphans: report.orphans,
            warnings,
        })
    }
}

/// Describe a backup file without touching any store
pub fn inspect(
    incoming: &IncomingArtifact,
    password: Option<&SecureString>,
) -> ContactbookResult<BackupInspection> {
    if incoming.format == BackupFormat::Structured {
        if let StructuredPayload::Encrypted(_) = structured::decode(&incoming.bytes)? {
            if password.is_none() {
                return Ok(BackupInspection {
                    format: incoming.format,
                    encrypted: true,
                    counts: None,
                    exported_at: None,
                    app_version: None,
                    warnings: Vec::new(),
                });
            }
        }
    }

    let decoded = decode(incoming, password)?;
    Ok(BackupInspection {
        format: incoming.format,
        encrypted: decoded.encrypted,
        counts: Some(decoded.document.counts()),
        exported_at: Some(decoded.document.exported_at),
        app_version: Some(decoded.document.app_version.clone()),
        warnings: decoded.warnings,
    })
}

struct Decoded {
    document: BackupDocument,
    encrypted: bool,
    warnings: Vec<BackupWarning>,
}

fn decode(incoming: &IncomingArtifact, password: Option<&SecureString>) -> ContactbookResult<Decoded> {
    match incoming.format {
        BackupFormat::Structured => match structured::decode(&incoming.bytes)? {
            StructuredPayload::Plain(document) => Ok(Decoded {
                document: *document,
                encrypted: false,
                warnings: Vec::new(),
            }),
            StructuredPayload::Encrypted(envelope) => {
                let password = password.ok_or(ContactbookError::PasswordRequired)?;
                let plaintext = Zeroizing::new(crypto::unwrap(&envelope, password.as_str())?);
                debug!(bytes = plaintext.len(), "backup decrypted");
                Ok(Decoded {
                    document: structured::decode_decrypted(&plaintext)?,
                    encrypted: true,
                    warnings: Vec::new(),
                })
            }
        },
        BackupFormat::Tabular => {
            if password.is_some() {
                debug!("password ignored for tabular backup");
            }
            let import = tabular::decode(&incoming.bytes)?;
            Ok(Decoded {
                document: import.document,
                encrypted: false,
                warnings: import.warnings,
            })
        }
    }
}
