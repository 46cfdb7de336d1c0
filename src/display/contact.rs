//! Contact display formatting
//!
//! Lists are rendered as tables with `tabled`; single contacts as a detail
//! block.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::codec::DataUrl;
use crate::models::{Attachment, Contact, Link, Note};

#[derive(Tabled)]
struct ContactRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "★")]
    favorite: &'static str,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&Contact> for ContactRow {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.to_string(),
            name: contact.name.clone(),
            email: contact.email.clone().unwrap_or_default(),
            phone: contact.phone.clone().unwrap_or_default(),
            favorite: if contact.is_favorite { "*" } else { "" },
            tags: contact.tags.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

/// Format a list of contacts as a table
pub fn format_contact_list(contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return "No contacts found.\n".to_string();
    }

    let rows: Vec<ContactRow> = contacts.iter().map(ContactRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

/// Format a single contact with its related record counts
pub fn format_contact_details(
    contact: &Contact,
    notes: &[Note],
    links: &[Link],
    attachments: &[Attachment],
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Contact: {}\n", contact.name));
    output.push_str(&format!("  ID:          {}\n", contact.id.as_uuid()));
    if let Some(email) = &contact.email {
        output.push_str(&format!("  Email:       {}\n", email));
    }
    if let Some(phone) = &contact.phone {
        output.push_str(&format!("  Phone:       {}\n", phone));
    }
    if let Some(birthday) = contact.birthday {
        output.push_str(&format!("  Birthday:    {}\n", birthday.format("%Y-%m-%d")));
    }
    output.push_str(&format!(
        "  Favorite:    {}\n",
        if contact.is_favorite { "Yes" } else { "No" }
    ));
    if !contact.tags.is_empty() {
        output.push_str(&format!(
            "  Tags:        {}\n",
            contact.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if let Some(picture) = &contact.profile_picture {
        output.push_str(&format!(
            "  Picture:     {}\n",
            DataUrl::mime_of(picture).unwrap_or("unknown")
        ));
    }
    for field in &contact.custom_fields {
        output.push_str(&format!("  {}: {}\n", field.label, field.value));
    }
    output.push_str(&format!(
        "  Created:     {}\n",
        contact.created_at.format("%Y-%m-%d %H:%M")
    ));
    output.push_str(&format!(
        "  Related:     {} notes, {} links, {} attachments\n",
        notes.len(),
        links.len(),
        attachments.len()
    ));

    output
}

#[derive(Tabled)]
struct NoteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Content")]
    content: String,
}

pub fn format_note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes found.\n".to_string();
    }

    let rows: Vec<NoteRow> = notes
        .iter()
        .map(|note| NoteRow {
            id: note.id.to_string(),
            title: note.title.clone(),
            updated: note.updated_at.format("%Y-%m-%d").to_string(),
            content: preview(&note.content, 40),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    link_type: String,
    #[tabled(rename = "URL")]
    url: String,
}

pub fn format_link_list(links: &[Link]) -> String {
    if links.is_empty() {
        return "No links found.\n".to_string();
    }

    let rows: Vec<LinkRow> = links
        .iter()
        .map(|link| LinkRow {
            id: link.id.to_string(),
            title: link.title.clone(),
            link_type: link.link_type.to_string(),
            url: link.url.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

#[derive(Tabled)]
struct AttachmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Stored")]
    stored: &'static str,
}

pub fn format_attachment_list(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return "No attachments found.\n".to_string();
    }

    let rows: Vec<AttachmentRow> = attachments
        .iter()
        .map(|a| AttachmentRow {
            id: a.id.to_string(),
            name: a.name.clone(),
            kind: a.kind.to_string(),
            size: format_size(a.size),
            stored: if a.payload.is_overflow() { "overflow" } else { "inline" },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{:.1} MB", b / (KIB * KIB))
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list() {
        assert_eq!(format_contact_list(&[]), "No contacts found.\n");
    }

    #[test]
    fn test_list_contains_names() {
        let mut ada = Contact::new("Ada Lovelace");
        ada.email = Some("ada@example.com".into());
        ada.is_favorite = true;
        let output = format_contact_list(&[ada, Contact::new("Grace Hopper")]);

        assert!(output.contains("Ada Lovelace"));
        assert!(output.contains("ada@example.com"));
        assert!(output.contains("Grace Hopper"));
    }

    #[test]
    fn test_details() {
        let mut ada = Contact::new("Ada Lovelace");
        ada.add_tag("math");
        let note = Note::new(ada.id, "Engine", "notes");
        let output = format_contact_details(&ada, &[note], &[], &[]);

        assert!(output.contains("Contact: Ada Lovelace"));
        assert!(output.contains("Tags:        math"));
        assert!(output.contains("1 notes, 0 links, 0 attachments"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(60 * 1024), "60.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_preview_cuts_long_lines() {
        assert_eq!(preview("short\nsecond", 10), "short");
        assert_eq!(preview("abcdefghijkl", 5), "abcde…");
    }
}
