//! Attachment CLI commands

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::display::contact::{format_attachment_list, format_size};
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::Attachment;
use crate::storage::{write_bytes_atomic, Storage};

/// Attachment subcommands
#[derive(Subcommand)]
pub enum AttachmentCommands {
    /// Attach a file to a contact
    Add {
        /// Contact name or ID
        contact: String,
        /// File to attach
        file: PathBuf,
        /// Stored name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
        /// MIME type (guessed from the extension if omitted)
        #[arg(short, long)]
        mime: Option<String>,
    },
    /// List a contact's attachments
    List {
        /// Contact name or ID
        contact: String,
    },
    /// Write an attachment back to a file
    Extract {
        /// Contact name or ID
        contact: String,
        /// Attachment name or ID
        attachment: String,
        /// Output path (defaults to the attachment name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove an attachment
    Delete {
        /// Contact name or ID
        contact: String,
        /// Attachment name or ID
        attachment: String,
    },
}

/// Handle an attachment command
pub fn handle_attachment_command(storage: &Storage, cmd: AttachmentCommands) -> ContactbookResult<()> {
    match cmd {
        AttachmentCommands::Add {
            contact,
            file,
            name,
            mime,
        } => {
            let owner = storage.resolve_contact(&contact)?;
            let bytes = read_file(&file)?;
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        ContactbookError::Validation(format!("{} has no file name", file.display()))
                    })?,
            };
            let mime = mime.unwrap_or_else(|| mime_from_path(&file).to_string());

            let id = storage.add_attachment(owner.id, &name, &mime, &bytes, None)?;
            println!(
                "Attached {} ({}) to {}: {}",
                name,
                format_size(bytes.len() as u64),
                owner.name,
                id
            );
        }

        AttachmentCommands::List { contact } => {
            let owner = storage.resolve_contact(&contact)?;
            let attachments = storage.attachments.by_contact(owner.id)?;
            print!("{}", format_attachment_list(&attachments));
        }

        AttachmentCommands::Extract {
            contact,
            attachment,
            output,
        } => {
            let owner = storage.resolve_contact(&contact)?;
            let found = find_attachment(storage, owner.id, &attachment)?;

            let bytes = storage
                .codec()
                .decode(&found.payload)
                .into_bytes()
                .ok_or_else(|| {
                    ContactbookError::Storage(format!("Data for '{}' is unavailable", found.name))
                })?;

            let output = output.unwrap_or_else(|| PathBuf::from(&found.name));
            write_bytes_atomic(&output, &bytes)?;
            println!("Wrote {} to {}", found.name, output.display());
        }

        AttachmentCommands::Delete {
            contact,
            attachment,
        } => {
            let owner = storage.resolve_contact(&contact)?;
            let found = find_attachment(storage, owner.id, &attachment)?;
            storage.delete_attachment(found.id)?;
            println!("Deleted attachment: {}", found.name);
        }
    }

    Ok(())
}

fn find_attachment(
    storage: &Storage,
    contact_id: crate::models::ContactId,
    query: &str,
) -> ContactbookResult<Attachment> {
    let attachments = storage.attachments.by_contact(contact_id)?;

    let mut matches: Vec<Attachment> = attachments
        .iter()
        .filter(|a| a.name == query)
        .cloned()
        .collect();
    if matches.is_empty() {
        matches = attachments
            .into_iter()
            .filter(|a| a.id.matches_prefix(query))
            .collect();
    }

    match matches.len() {
        0 => Err(ContactbookError::attachment_not_found(query)),
        1 => Ok(matches.remove(0)),
        n => Err(ContactbookError::Validation(format!(
            "'{}' matches {} attachments; use the ID",
            query, n
        ))),
    }
}

pub(crate) fn read_file(path: &Path) -> ContactbookResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| ContactbookError::Io(format!("Cannot read {}: {}", path.display(), e)))
}

/// MIME type guessed from a file extension
pub(crate) fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(Path::new("me.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(mime_from_path(Path::new("blob")), "application/octet-stream");
    }
}
