//! Tabular (workbook) backup format
//!
//! A zip archive with one CSV member per sheet, readable by any spreadsheet
//! tool. Binary columns are cut to their character budget and marked with
//! the truncation sentinel; on import a marked cell is never decoded, the
//! field is dropped and a warning names the entity.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::{Cursor, Read, Write};

use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{is_truncated, truncate_cell, TruncationLimits, TRUNCATION_SENTINEL};
use crate::backup::{BackupAttachment, BackupDocument, BackupWarning, LossReason};
use crate::codec::DataUrl;
use crate::error::{ContactbookError, ContactbookResult};
use crate::models::{
    AttachmentId, AttachmentKind, Contact, ContactId, CustomField, Link, LinkId, LinkType, Note,
    NoteId,
};

pub const CONTACTS_SHEET: &str = "Contacts";
pub const NOTES_SHEET: &str = "Notes";
pub const LINKS_SHEET: &str = "Links";
pub const ATTACHMENTS_SHEET: &str = "Attachments";
pub const WARNING_SHEET: &str = "IMPORTANT - READ FIRST";

pub const CONTACT_COLUMNS: [&str; 9] = [
    "ID",
    "Name",
    "Email",
    "Phone",
    "Birthday",
    "Tags",
    "Favorite",
    "Custom Fields",
    "Profile Picture",
];

pub const NOTE_COLUMNS: [&str; 7] = [
    "ID",
    "Contact ID",
    "Title",
    "Content",
    "Tags",
    "Created At",
    "Updated At",
];

pub const LINK_COLUMNS: [&str; 7] = [
    "ID",
    "Contact ID",
    "Title",
    "URL",
    "Type",
    "Description",
    "Created At",
];

pub const ATTACHMENT_COLUMNS: [&str; 9] = [
    "ID",
    "Contact ID",
    "Name",
    "Type",
    "Size",
    "MIME Type",
    "File Data",
    "Thumbnail",
    "Created At",
];

const TAG_SEPARATOR: &str = ", ";
const FIELD_SEPARATOR: &str = "; ";
const LABEL_SEPARATOR: &str = ": ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encoded workbook plus the cells that had to be cut
#[derive(Debug, Clone)]
pub struct TabularExport {
    pub bytes: Vec<u8>,
    pub warnings: Vec<BackupWarning>,
}

/// Document recovered from a workbook
#[derive(Debug, Clone)]
pub struct TabularImport {
    pub document: BackupDocument,
    pub warnings: Vec<BackupWarning>,
}

fn warning_lines() -> Vec<String> {
    vec![
        "This workbook is a spreadsheet-friendly copy of your contacts. It is NOT a complete backup.".into(),
        format!(
            "Profile pictures, attachment files and thumbnails longer than the cell limit are cut and end with {}.",
            TRUNCATION_SENTINEL
        ),
        "Cut images and files cannot be restored from this workbook; importing it skips them.".into(),
        "For a complete backup that can be restored exactly, export in the structured (JSON) format.".into(),
        "Keep sheet names and column headers unchanged if you plan to import this file.".into(),
    ]
}

// ---- encode ----

/// Encode a document as a workbook
pub fn encode(
    document: &BackupDocument,
    limits: &TruncationLimits,
) -> ContactbookResult<TabularExport> {
    limits.validate()?;
    let mut warnings = Vec::new();

    let mut cut = |cell: &str,
                   budget: usize,
                   entity_type: &'static str,
                   entity_id: String,
                   field: &'static str| {
        let (value, truncated) = truncate_cell(cell, budget);
        if truncated {
            warnings.push(BackupWarning::FieldTruncated {
                entity_type,
                entity_id,
                field,
            });
        }
        value
    };

    let mut contacts = Vec::with_capacity(document.contacts.len());
    for c in &document.contacts {
        let picture = c
            .profile_picture
            .as_deref()
            .map(|p| {
                cut(
                    p,
                    limits.profile_picture,
                    "Contact",
                    c.id.as_uuid().to_string(),
                    "Profile Picture",
                )
            })
            .unwrap_or_default();

        contacts.push(vec![
            c.id.as_uuid().to_string(),
            c.name.clone(),
            c.email.clone().unwrap_or_default(),
            c.phone.clone().unwrap_or_default(),
            c.birthday
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            join_tags(c.tags.iter()),
            if c.is_favorite { "Yes" } else { "No" }.to_string(),
            flatten_custom_fields(&c.custom_fields),
            picture,
        ]);
    }

    let notes = document
        .notes
        .iter()
        .map(|n| {
            vec![
                n.id.as_uuid().to_string(),
                n.contact_id.as_uuid().to_string(),
                n.title.clone(),
                n.content.clone(),
                join_tags(n.tags.iter()),
                n.created_at.to_rfc3339(),
                n.updated_at.to_rfc3339(),
            ]
        })
        .collect();

    let links = document
        .links
        .iter()
        .map(|l| {
            vec![
                l.id.as_uuid().to_string(),
                l.contact_id.as_uuid().to_string(),
                l.title.clone(),
                l.url.clone(),
                l.link_type.as_str().to_string(),
                l.description.clone().unwrap_or_default(),
                l.created_at.to_rfc3339(),
            ]
        })
        .collect();

    let mut attachments = Vec::with_capacity(document.attachments.len());
    for a in &document.attachments {
        let id = a.id.as_uuid().to_string();
        let data = a
            .data
            .as_deref()
            .map(|d| cut(d, limits.file_data, "Attachment", id.clone(), "File Data"))
            .unwrap_or_default();
        let thumbnail = a
            .thumbnail
            .as_deref()
            .map(|t| cut(t, limits.thumbnail, "Attachment", id.clone(), "Thumbnail"))
            .unwrap_or_default();

        attachments.push(vec![
            id,
            a.contact_id.as_uuid().to_string(),
            a.name.clone(),
            a.kind.as_str().to_string(),
            a.size.to_string(),
            a.mime_type.clone(),
            data,
            thumbnail,
            a.created_at.to_rfc3339(),
        ]);
    }

    let notice = warning_lines().into_iter().map(|line| vec![line]).collect();

    let sheets = [
        (CONTACTS_SHEET, sheet_csv(&CONTACT_COLUMNS, contacts)?),
        (NOTES_SHEET, sheet_csv(&NOTE_COLUMNS, notes)?),
        (LINKS_SHEET, sheet_csv(&LINK_COLUMNS, links)?),
        (ATTACHMENTS_SHEET, sheet_csv(&ATTACHMENT_COLUMNS, attachments)?),
        (WARNING_SHEET, sheet_csv(&["IMPORTANT"], notice)?),
    ];

    let bytes = write_workbook(&sheets)
        .map_err(|e| ContactbookError::Export(format!("Failed to write workbook: {}", e)))?;

    debug!(
        bytes = bytes.len(),
        truncated = warnings.len(),
        "tabular backup encoded"
    );
    Ok(TabularExport { bytes, warnings })
}

fn sheet_csv(header: &[&str], rows: Vec<Vec<String>>) -> ContactbookResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ContactbookError::Export(format!("Failed to finish sheet: {}", e)))
}

fn write_workbook(sheets: &[(&str, Vec<u8>)]) -> Result<Vec<u8>, ZipError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in sheets {
        zip.start_file(member_name(name), options)?;
        zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn member_name(sheet: &str) -> String {
    format!("{}.csv", sheet)
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a String>) -> String {
    tags.map(String::as_str).collect::<Vec<_>>().join(TAG_SEPARATOR)
}

fn flatten_custom_fields(fields: &[CustomField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}{}{}", f.label, LABEL_SEPARATOR, f.value))
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

// ---- decode ----

/// One sheet, addressed by column header
struct Sheet {
    name: &'static str,
    columns: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl Sheet {
    fn parse(name: &'static str, data: &[u8], required: &[&str]) -> ContactbookResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        let columns: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();

        for column in required {
            if !columns.contains_key(*column) {
                return Err(ContactbookError::Import(format!(
                    "Sheet '{}' is missing column '{}'",
                    name, column
                )));
            }
        }

        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    fn empty(name: &'static str) -> Self {
        Self {
            name,
            columns: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn cell<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.columns
            .get(column)
            .and_then(|i| row.get(*i))
            .unwrap_or("")
    }

    fn optional(&self, row: &StringRecord, column: &str) -> Option<String> {
        let value = self.cell(row, column).trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Read every sheet out of a workbook
pub fn decode(bytes: &[u8]) -> ContactbookResult<TabularImport> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ContactbookError::Import(format!("Invalid workbook: {}", e)))?;

    let contacts_sheet = match read_member(&mut archive, CONTACTS_SHEET)? {
        Some(data) => Sheet::parse(CONTACTS_SHEET, &data, &["ID", "Name"])?,
        None => {
            return Err(ContactbookError::FormatUnsupported(format!(
                "workbook has no '{}' sheet",
                CONTACTS_SHEET
            )))
        }
    };
    let notes_sheet = optional_sheet(&mut archive, NOTES_SHEET, &["ID", "Contact ID", "Title"])?;
    let links_sheet = optional_sheet(&mut archive, LINKS_SHEET, &["ID", "Contact ID", "URL"])?;
    let attachments_sheet = optional_sheet(
        &mut archive,
        ATTACHMENTS_SHEET,
        &["ID", "Contact ID", "Name", "MIME Type", "File Data"],
    )?;

    let mut warnings = Vec::new();
    let mut document = BackupDocument::empty();

    let mut seen = HashSet::new();
    for (i, row) in contacts_sheet.rows.iter().enumerate() {
        match read_contact(&contacts_sheet, row, &mut warnings)
            .and_then(|c| first_sighting(&mut seen, c.id).map(|_| c))
        {
            Ok(contact) => document.contacts.push(contact),
            Err(reason) => warnings.push(skipped(&contacts_sheet, i, reason)),
        }
    }
    let mut seen = HashSet::new();
    for (i, row) in notes_sheet.rows.iter().enumerate() {
        match read_note(&notes_sheet, row).and_then(|n| first_sighting(&mut seen, n.id).map(|_| n)) {
            Ok(note) => document.notes.push(note),
            Err(reason) => warnings.push(skipped(&notes_sheet, i, reason)),
        }
    }
    let mut seen = HashSet::new();
    for (i, row) in links_sheet.rows.iter().enumerate() {
        match read_link(&links_sheet, row).and_then(|l| first_sighting(&mut seen, l.id).map(|_| l)) {
            Ok(link) => document.links.push(link),
            Err(reason) => warnings.push(skipped(&links_sheet, i, reason)),
        }
    }
    let mut seen = HashSet::new();
    for (i, row) in attachments_sheet.rows.iter().enumerate() {
        match read_attachment(&attachments_sheet, row, &mut warnings) {
            Ok(Some(attachment)) => match first_sighting(&mut seen, attachment.id) {
                Ok(()) => document.attachments.push(attachment),
                Err(reason) => warnings.push(skipped(&attachments_sheet, i, reason)),
            },
            Ok(None) => {}
            Err(reason) => warnings.push(skipped(&attachments_sheet, i, reason)),
        }
    }

    debug!(
        contacts = document.contacts.len(),
        warnings = warnings.len(),
        "tabular backup decoded"
    );
    Ok(TabularImport { document, warnings })
}

fn read_member(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    sheet: &str,
) -> ContactbookResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(&member_name(sheet)) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn optional_sheet(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &'static str,
    required: &[&str],
) -> ContactbookResult<Sheet> {
    match read_member(archive, name)? {
        Some(data) => Sheet::parse(name, &data, required),
        None => {
            warn!(sheet = name, "workbook sheet missing, treating as empty");
            Ok(Sheet::empty(name))
        }
    }
}

fn skipped(sheet: &Sheet, index: usize, reason: String) -> BackupWarning {
    BackupWarning::RowSkipped {
        sheet: sheet.name,
        row: index + 1,
        reason,
    }
}

/// Later rows repeating an ID are skipped; the first one wins
fn first_sighting<T>(seen: &mut HashSet<T>, id: T) -> Result<(), String>
where
    T: Eq + Hash + std::fmt::Display,
{
    let label = id.to_string();
    if seen.insert(id) {
        Ok(())
    } else {
        Err(format!("duplicate ID {}", label))
    }
}

fn parse_id<T: std::str::FromStr>(sheet: &Sheet, row: &StringRecord, column: &str) -> Result<T, String> {
    let raw = sheet.cell(row, column);
    raw.parse()
        .map_err(|_| format!("invalid {} '{}'", column, raw))
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_tags(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1" | "y"
    )
}

fn parse_custom_fields(value: &str) -> Vec<CustomField> {
    value
        .split(FIELD_SEPARATOR)
        .filter(|f| !f.trim().is_empty())
        .map(|field| match field.split_once(LABEL_SEPARATOR) {
            Some((label, value)) => CustomField::new(label.trim(), value.trim()),
            None => CustomField::new(field.trim(), ""),
        })
        .collect()
}

/// Check a binary cell; `Err` carries why it cannot be used
fn usable_data_url(cell: &str) -> Result<Option<DataUrl>, LossReason> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    if is_truncated(cell) {
        return Err(LossReason::Truncated);
    }
    DataUrl::parse(cell).map(Some).ok_or(LossReason::Corrupt)
}

fn read_contact(
    sheet: &Sheet,
    row: &StringRecord,
    warnings: &mut Vec<BackupWarning>,
) -> Result<Contact, String> {
    let id: ContactId = parse_id(sheet, row, "ID")?;
    let name = sheet.cell(row, "Name").trim();
    if name.is_empty() {
        return Err("missing Name".to_string());
    }
    let mut contact = Contact::new(name);
    contact.id = id;
    contact.email = sheet.optional(row, "Email");
    contact.phone = sheet.optional(row, "Phone");
    contact.birthday = sheet
        .optional(row, "Birthday")
        .and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok());
    contact.is_favorite = parse_bool(sheet.cell(row, "Favorite"));
    contact.custom_fields = parse_custom_fields(sheet.cell(row, "Custom Fields"));
    for tag in parse_tags(sheet.cell(row, "Tags")) {
        contact.tags.insert(tag);
    }

    let picture = sheet.cell(row, "Profile Picture");
    match usable_data_url(picture) {
        Ok(Some(_)) => contact.profile_picture = Some(picture.trim().to_string()),
        Ok(None) => {}
        Err(reason) => warnings.push(BackupWarning::PartialAttachmentLoss {
            entity_type: "Contact",
            entity_id: id.as_uuid().to_string(),
            label: contact.name.clone(),
            field: "Profile Picture",
            reason,
        }),
    }

    Ok(contact)
}

fn read_note(sheet: &Sheet, row: &StringRecord) -> Result<Note, String> {
    let id: NoteId = parse_id(sheet, row, "ID")?;
    let contact_id: ContactId = parse_id(sheet, row, "Contact ID")?;

    let mut note = Note::new(contact_id, sheet.cell(row, "Title"), sheet.cell(row, "Content"));
    note.id = id;
    note.tags = parse_tags(sheet.cell(row, "Tags")).collect();
    note.created_at = parse_timestamp(sheet.cell(row, "Created At"));
    note.updated_at = parse_timestamp(sheet.cell(row, "Updated At"));
    Ok(note)
}

fn read_link(sheet: &Sheet, row: &StringRecord) -> Result<Link, String> {
    let id: LinkId = parse_id(sheet, row, "ID")?;
    let contact_id: ContactId = parse_id(sheet, row, "Contact ID")?;

    let mut link = Link::new(contact_id, sheet.cell(row, "Title"), sheet.cell(row, "URL").trim());
    link.id = id;
    if let Some(link_type) = LinkType::parse(sheet.cell(row, "Type")) {
        link.link_type = link_type;
    }
    link.description = sheet.optional(row, "Description");
    link.created_at = parse_timestamp(sheet.cell(row, "Created At"));
    Ok(link)
}

/// `Ok(None)` when the row is readable but its file data is not usable
fn read_attachment(
    sheet: &Sheet,
    row: &StringRecord,
    warnings: &mut Vec<BackupWarning>,
) -> Result<Option<BackupAttachment>, String> {
    let id: AttachmentId = parse_id(sheet, row, "ID")?;
    let contact_id: ContactId = parse_id(sheet, row, "Contact ID")?;
    let name = sheet.cell(row, "Name").to_string();
    let mime_type = sheet.cell(row, "MIME Type").trim().to_string();

    let loss = |field: &'static str, reason: LossReason| BackupWarning::PartialAttachmentLoss {
        entity_type: "Attachment",
        entity_id: id.as_uuid().to_string(),
        label: name.clone(),
        field,
        reason,
    };

    let data_cell = sheet.cell(row, "File Data");
    let size = match usable_data_url(data_cell) {
        Ok(Some(url)) => url.bytes.len() as u64,
        Ok(None) => {
            warnings.push(loss("File Data", LossReason::MissingData));
            return Ok(None);
        }
        Err(reason) => {
            warnings.push(loss("File Data", reason));
            return Ok(None);
        }
    };

    let thumbnail_cell = sheet.cell(row, "Thumbnail");
    let thumbnail = match usable_data_url(thumbnail_cell) {
        Ok(Some(_)) => Some(thumbnail_cell.trim().to_string()),
        Ok(None) => None,
        Err(reason) => {
            warnings.push(loss("Thumbnail", reason));
            None
        }
    };

    let kind = AttachmentKind::parse(sheet.cell(row, "Type"))
        .unwrap_or_else(|| AttachmentKind::from_mime(&mime_type));

    Ok(Some(BackupAttachment {
        id,
        contact_id,
        name,
        kind,
        size,
        mime_type,
        data: Some(data_cell.trim().to_string()),
        thumbnail,
        created_at: parse_timestamp(sheet.cell(row, "Created At")),
    }))
}
