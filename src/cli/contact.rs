//! Contact CLI commands
//!
//! Implements CLI commands for contact management.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;

use super::attachment::{mime_from_path, read_file};
use crate::display::contact::{format_contact_details, format_contact_list};
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::{Contact, CustomField};
use crate::storage::Storage;

/// Contact subcommands
#[derive(Subcommand)]
pub enum ContactCommands {
    /// Add a new contact
    Add {
        /// Contact name
        name: String,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        phone: Option<String>,
        /// Birthday (YYYY-MM-DD)
        #[arg(short, long)]
        birthday: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Custom field as LABEL=VALUE (repeatable)
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,
        /// Profile picture image file
        #[arg(long)]
        picture: Option<PathBuf>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },
    /// List contacts
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only contacts with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show contact details
    Show {
        /// Contact name or ID
        contact: String,
    },
    /// Edit a contact
    Edit {
        /// Contact name or ID
        contact: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        phone: Option<String>,
        /// Birthday (YYYY-MM-DD)
        #[arg(short, long)]
        birthday: Option<String>,
        /// Add a tag (repeatable)
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Remove a tag (repeatable)
        #[arg(long = "remove-tag")]
        remove_tags: Vec<String>,
        /// Replace the profile picture
        #[arg(long, conflicts_with = "clear_picture")]
        picture: Option<PathBuf>,
        /// Remove the profile picture
        #[arg(long)]
        clear_picture: bool,
    },
    /// Mark or unmark a contact as favorite
    Favorite {
        /// Contact name or ID
        contact: String,
        /// Remove the favorite mark instead
        #[arg(long)]
        unset: bool,
    },
    /// Delete a contact with its notes, links and attachments
    Delete {
        /// Contact name or ID
        contact: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Handle a contact command
pub fn handle_contact_command(storage: &Storage, cmd: ContactCommands) -> ContactbookResult<()> {
    match cmd {
        ContactCommands::Add {
            name,
            email,
            phone,
            birthday,
            tags,
            fields,
            picture,
            favorite,
        } => {
            let mut contact = Contact::new(name);
            contact.email = email;
            contact.phone = phone;
            contact.birthday = birthday.as_deref().map(parse_date).transpose()?;
            contact.is_favorite = favorite;
            for tag in &tags {
                contact.add_tag(tag);
            }
            contact.custom_fields = fields
                .iter()
                .map(|f| parse_field(f))
                .collect::<ContactbookResult<_>>()?;
            if let Some(path) = picture {
                let bytes = read_file(&path)?;
                contact.set_profile_picture(mime_from_path(&path), &bytes);
            }

            let id = storage.create_contact(contact)?;
            println!("Created contact: {}", id);
        }

        ContactCommands::List { favorites, tag } => {
            let mut contacts = storage.contacts.get_all()?;
            contacts.retain(|c| !favorites || c.is_favorite);
            if let Some(tag) = &tag {
                contacts.retain(|c| c.tags.contains(tag));
            }
            contacts.sort_by_key(|c| c.name.to_lowercase());
            print!("{}", format_contact_list(&contacts));
        }

        ContactCommands::Show { contact } => {
            let found = storage.resolve_contact(&contact)?;
            let notes = storage.notes.by_contact(found.id)?;
            let links = storage.links.by_contact(found.id)?;
            let attachments = storage.attachments.by_contact(found.id)?;
            print!(
                "{}",
                format_contact_details(&found, &notes, &links, &attachments)
            );
        }

        ContactCommands::Edit {
            contact,
            name,
            email,
            phone,
            birthday,
            add_tags,
            remove_tags,
            picture,
            clear_picture,
        } => {
            let mut found = storage.resolve_contact(&contact)?;
            let original = found.clone();

            if let Some(name) = name {
                found.name = name;
            }
            if let Some(email) = email {
                found.email = (!email.is_empty()).then_some(email);
            }
            if let Some(phone) = phone {
                found.phone = (!phone.is_empty()).then_some(phone);
            }
            if let Some(birthday) = birthday {
                found.birthday = Some(parse_date(&birthday)?);
            }
            for tag in &add_tags {
                found.add_tag(tag);
            }
            for tag in &remove_tags {
                found.tags.remove(tag.trim());
            }
            if let Some(path) = picture {
                let bytes = read_file(&path)?;
                found.set_profile_picture(mime_from_path(&path), &bytes);
            }
            if clear_picture {
                found.profile_picture = None;
            }

            if found == original {
                println!("No changes specified.");
                return Ok(());
            }

            let name = found.name.clone();
            storage.update_contact(found)?;
            println!("Updated contact: {}", name);
        }

        ContactCommands::Favorite { contact, unset } => {
            let mut found = storage.resolve_contact(&contact)?;
            found.is_favorite = !unset;
            let name = found.name.clone();
            storage.update_contact(found)?;
            if unset {
                println!("Removed from favorites: {}", name);
            } else {
                println!("Added to favorites: {}", name);
            }
        }

        ContactCommands::Delete { contact, force } => {
            let found = storage.resolve_contact(&contact)?;

            if !force && !confirm(&format!("Delete '{}' and everything attached to it?", found.name))? {
                println!("Aborted.");
                return Ok(());
            }

            let report = storage.delete_contact(found.id)?;
            println!("Deleted contact: {}", found.name);
            println!(
                "  Also removed {} notes, {} links, {} attachments",
                report.notes, report.links, report.attachments
            );
        }
    }

    Ok(())
}

fn parse_date(s: &str) -> ContactbookResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
        ContactbookError::Validation(format!("Invalid date '{}': use YYYY-MM-DD ({})", s, e))
    })
}

fn parse_field(s: &str) -> ContactbookResult<CustomField> {
    match s.split_once('=') {
        Some((label, value)) if !label.trim().is_empty() => {
            Ok(CustomField::new(label.trim(), value.trim()))
        }
        _ => Err(ContactbookError::Validation(format!(
            "Invalid custom field '{}': use LABEL=VALUE",
            s
        ))),
    }
}

pub(crate) fn confirm(question: &str) -> ContactbookResult<bool> {
    print!("{} (yes/no): ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        let field = parse_field("Company = Analytical Engines").unwrap();
        assert_eq!(field.label, "Company");
        assert_eq!(field.value, "Analytical Engines");
        assert!(parse_field("=value").is_err());
        assert!(parse_field("novalue").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("1815-12-10").unwrap(),
            NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()
        );
        assert!(parse_date("10/12/1815").unwrap_err().is_validation());
    }
}
