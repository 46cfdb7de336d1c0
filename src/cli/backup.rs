//! Backup CLI commands
//!
//! Export the store to a backup file, import one back, or inspect a file
//! without importing it.

use std::io::Read;
use std::path::PathBuf;

use clap::Subcommand;
use tracing::debug;

use super::contact::confirm;
use crate::backup::{inspect, BackupService};
use crate::config::paths::ContactbookPaths;
use crate::config::settings::Settings;
use crate::crypto::SecureString;
use crate::delivery::{ArtifactSource, DeliveryBroker, IncomingArtifact, PlatformCapability};
use crate::display::backup::{format_delivery, format_import_report, format_inspection, format_warnings};
use crate::error::{ContactbookError, ContactbookResult};
use crate::formats::BackupFormat;
use crate::storage::Storage;

/// Environment variable read instead of prompting for a backup password
pub const PASSWORD_ENV: &str = "CONTACTBOOK_BACKUP_PASSWORD";

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Export every contact, note, link and attachment to one file
    Export {
        /// Backup format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<BackupFormat>,

        /// Protect the backup with a password (structured format only)
        #[arg(short, long)]
        encrypt: bool,

        /// Try this directory before the platform defaults
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hand the file to the share sheet / system handler afterwards
        #[arg(short, long)]
        share: bool,
    },

    /// Replace all data with the contents of a backup
    Import {
        /// Backup file, or '-' to read from stdin
        file: String,

        /// File name for data read from stdin
        #[arg(long)]
        name: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show what a backup contains without importing it
    Inspect {
        /// Backup file, or '-' to read from stdin
        file: String,

        /// File name for data read from stdin
        #[arg(long)]
        name: Option<String>,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    paths: &ContactbookPaths,
    platform: PlatformCapability,
    cmd: BackupCommands,
) -> ContactbookResult<()> {
    let service = BackupService::new(storage, settings);

    match cmd {
        BackupCommands::Export {
            format,
            encrypt,
            output,
            share,
        } => {
            let format = format.unwrap_or(settings.backup.default_format);
            let password = if encrypt {
                Some(new_password()?)
            } else {
                None
            };

            let outcome = service.export_backup(format, password.as_ref())?;

            let mut broker = DeliveryBroker::for_platform(platform, paths);
            if let Some(dir) = output {
                broker = broker.prefer_directory(dir);
            }

            let counts = outcome.counts;
            let receipt = broker.deliver(
                outcome.artifact,
                share || settings.backup.share_after_export,
            )?;

            print!("{}", format_delivery(&receipt, &counts));
            print!("{}", format_warnings(&outcome.warnings));
            if format == BackupFormat::Tabular {
                println!("Note: spreadsheet backups are not complete; large images and files may be cut.");
            }
        }

        BackupCommands::Import { file, name, force } => {
            let incoming = receive(&file, name)?;

            if !force
                && !confirm(&format!(
                    "Replace ALL contacts with the contents of {}?",
                    incoming.display_name()
                ))?
            {
                println!("Aborted.");
                return Ok(());
            }

            let password = password_from_env();
            let report = match service.import_backup(&incoming, password.as_ref()) {
                Err(ContactbookError::PasswordRequired) if password.is_none() => {
                    let password = prompt_password("Backup password: ")?;
                    service.import_backup(&incoming, Some(&password))?
                }
                other => other?,
            };

            print!("{}", format_import_report(&report));
        }

        BackupCommands::Inspect { file, name } => {
            let incoming = receive(&file, name)?;
            let inspection = inspect(&incoming, password_from_env().as_ref())?;
            print!("{}", format_inspection(&inspection));
        }
    }

    Ok(())
}

/// Picker path, or stdin treated as a share-target handoff
fn receive(file: &str, name: Option<String>) -> ContactbookResult<IncomingArtifact> {
    let source = if file == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        ArtifactSource::ShareTarget {
            name: name.unwrap_or_default(),
            bytes,
        }
    } else {
        ArtifactSource::Picker(PathBuf::from(file))
    };

    IncomingArtifact::receive(source)
}

fn password_from_env() -> Option<SecureString> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| {
            debug!("backup password taken from {}", PASSWORD_ENV);
            SecureString::from(p)
        })
}

fn new_password() -> ContactbookResult<SecureString> {
    if let Some(password) = password_from_env() {
        return Ok(password);
    }

    loop {
        let first = prompt_password("New backup password: ")?;
        if first.is_empty() {
            println!("Password cannot be empty. Please try again.");
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first.as_str() != second.as_str() {
            println!("Passwords do not match. Please try again.");
            continue;
        }

        return Ok(first);
    }
}

/// Prompt for a password (hidden input)
fn prompt_password(prompt: &str) -> ContactbookResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| ContactbookError::Io(format!("Failed to read password: {}", e)))
}
