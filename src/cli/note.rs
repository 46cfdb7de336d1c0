//! Note and link CLI commands

use clap::Subcommand;

use crate::display::contact::{format_link_list, format_note_list};
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::{Link, LinkType, Note};
use crate::storage::Storage;

/// Note subcommands
#[derive(Subcommand)]
pub enum NoteCommands {
    /// Add a note to a contact
    Add {
        /// Contact name or ID
        contact: String,
        /// Note title
        title: String,
        /// Note body
        #[arg(short, long, default_value = "")]
        content: String,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// List a contact's notes
    List {
        /// Contact name or ID
        contact: String,
    },
    /// Delete a note
    Delete {
        /// Note ID
        note: String,
    },
}

/// Link subcommands
#[derive(Subcommand)]
pub enum LinkCommands {
    /// Save a link for a contact
    Add {
        /// Contact name or ID
        contact: String,
        /// Link title
        title: String,
        /// URL
        url: String,
        /// Link type (detected from the URL if omitted)
        #[arg(short = 't', long = "type")]
        link_type: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List a contact's links
    List {
        /// Contact name or ID
        contact: String,
    },
}

pub fn handle_note_command(storage: &Storage, cmd: NoteCommands) -> ContactbookResult<()> {
    match cmd {
        NoteCommands::Add {
            contact,
            title,
            content,
            tags,
        } => {
            let owner = storage.resolve_contact(&contact)?;
            let mut note = Note::new(owner.id, title, content);
            note.tags = tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let id = storage.add_note(note)?;
            println!("Added note to {}: {}", owner.name, id);
        }

        NoteCommands::List { contact } => {
            let owner = storage.resolve_contact(&contact)?;
            let mut notes = storage.notes.by_contact(owner.id)?;
            notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            print!("{}", format_note_list(&notes));
        }

        NoteCommands::Delete { note } => {
            let matches: Vec<Note> = storage
                .notes
                .get_all()?
                .into_iter()
                .filter(|n| n.id.matches_prefix(&note))
                .collect();
            let found = match matches.as_slice() {
                [only] => only.clone(),
                [] => return Err(ContactbookError::note_not_found(&note)),
                _ => {
                    return Err(ContactbookError::Validation(format!(
                        "'{}' matches {} notes; use a longer ID",
                        note,
                        matches.len()
                    )))
                }
            };
            storage.delete_note(found.id)?;
            println!("Deleted note: {}", found.title);
        }
    }

    Ok(())
}

pub fn handle_link_command(storage: &Storage, cmd: LinkCommands) -> ContactbookResult<()> {
    match cmd {
        LinkCommands::Add {
            contact,
            title,
            url,
            link_type,
            description,
        } => {
            let owner = storage.resolve_contact(&contact)?;
            let mut link = Link::new(owner.id, title, url);
            if let Some(link_type) = link_type {
                link.link_type = LinkType::parse(&link_type).ok_or_else(|| {
                    ContactbookError::Validation(format!("Invalid link type: '{}'", link_type))
                })?;
            }
            link.description = description;
            let kind = link.link_type;
            let id = storage.add_link(link)?;
            println!("Added {} link to {}: {}", kind, owner.name, id);
        }

        LinkCommands::List { contact } => {
            let owner = storage.resolve_contact(&contact)?;
            let links = storage.links.by_contact(owner.id)?;
            print!("{}", format_link_list(&links));
        }
    }

    Ok(())
}
