//! Contact model
//!
//! The identity-bearing record every note, link and attachment hangs off.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::ids::ContactId;
use crate::codec::data_url::DataUrl;

/// A user-defined label/value pair shown on the contact card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub value: String,
}

impl CustomField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Unique identifier, assigned by the store on insert
    pub id: ContactId,

    /// Display name (the only required field)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,

    /// Self-describing image data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(default)]
    pub is_favorite: bool,

    /// Ordered as the user entered them
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Create a new contact
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::new(),
            name: name.into(),
            email: None,
            phone: None,
            birthday: None,
            profile_picture: None,
            is_favorite: false,
            custom_fields: Vec::new(),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if !tag.is_empty() {
            self.tags.insert(tag.to_string());
        }
    }

    /// Set the profile picture from raw image bytes
    pub fn set_profile_picture(&mut self, mime_type: &str, bytes: &[u8]) {
        self.profile_picture = Some(DataUrl::encode(mime_type, bytes));
        self.touch();
    }

    /// Validate the contact
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::EmptyName);
        }

        if self.name.len() > 200 {
            return Err(ContactValidationError::NameTooLong(self.name.len()));
        }

        if let Some(picture) = &self.profile_picture {
            if DataUrl::parse(picture).is_none() {
                return Err(ContactValidationError::InvalidProfilePicture);
            }
        }

        Ok(())
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validation errors for contacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyName,
    NameTooLong(usize),
    InvalidProfilePicture,
}

impl fmt::Display for ContactValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Contact name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Contact name too long ({} chars, max 200)", len)
            }
            Self::InvalidProfilePicture => {
                write!(f, "Profile picture must be a data URL")
            }
        }
    }
}

impl std::error::Error for ContactValidationError {}
