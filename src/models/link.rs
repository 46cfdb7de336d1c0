//! Link model
//!
//! URLs saved against a contact, classified by the service they point at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ContactId, LinkId};

/// Category of a saved link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Website,
    LinkedIn,
    Twitter,
    Facebook,
    Instagram,
    GitHub,
    YouTube,
    TikTok,
    Reddit,
    Discord,
    Telegram,
    WhatsApp,
    Email,
    #[default]
    Other,
}

/// Host suffix -> link type, checked in order
const HOST_RULES: &[(&str, LinkType)] = &[
    ("linkedin.com", LinkType::LinkedIn),
    ("twitter.com", LinkType::Twitter),
    ("x.com", LinkType::Twitter),
    ("facebook.com", LinkType::Facebook),
    ("fb.com", LinkType::Facebook),
    ("instagram.com", LinkType::Instagram),
    ("github.com", LinkType::GitHub),
    ("youtube.com", LinkType::YouTube),
    ("youtu.be", LinkType::YouTube),
    ("tiktok.com", LinkType::TikTok),
    ("reddit.com", LinkType::Reddit),
    ("discord.gg", LinkType::Discord),
    ("discord.com", LinkType::Discord),
    ("t.me", LinkType::Telegram),
    ("telegram.me", LinkType::Telegram),
    ("wa.me", LinkType::WhatsApp),
    ("whatsapp.com", LinkType::WhatsApp),
];

impl LinkType {
    /// Classify a URL by scheme and host
    pub fn classify(url: &str) -> Self {
        let url = url.trim();
        let lower = url.to_lowercase();

        if lower.starts_with("mailto:") {
            return Self::Email;
        }

        // Bare address such as ada@example.com
        if !lower.contains("://") && lower.contains('@') && !lower.contains('/') {
            return Self::Email;
        }

        let Some(host) = host_of(&lower) else {
            return Self::Other;
        };

        for (suffix, link_type) in HOST_RULES {
            if host == *suffix || host.ends_with(&format!(".{}", suffix)) {
                return *link_type;
            }
        }

        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Website
        } else {
            Self::Other
        }
    }

    /// Stable lowercase name, as stored in backups
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::GitHub => "github",
            Self::YouTube => "youtube",
            Self::TikTok => "tiktok",
            Self::Reddit => "reddit",
            Self::Discord => "discord",
            Self::Telegram => "telegram",
            Self::WhatsApp => "whatsapp",
            Self::Email => "email",
            Self::Other => "other",
        }
    }

    /// Parse link type from string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        ALL_LINK_TYPES.iter().copied().find(|t| t.as_str() == s)
    }
}

const ALL_LINK_TYPES: [LinkType; 14] = [
    LinkType::Website,
    LinkType::LinkedIn,
    LinkType::Twitter,
    LinkType::Facebook,
    LinkType::Instagram,
    LinkType::GitHub,
    LinkType::YouTube,
    LinkType::TikTok,
    LinkType::Reddit,
    LinkType::Discord,
    LinkType::Telegram,
    LinkType::WhatsApp,
    LinkType::Email,
    LinkType::Other,
];

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extract the host part of a lowercase URL, without `www.` or a port
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = authority.split(':').next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// A saved link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,

    pub contact_id: ContactId,

    pub title: String,

    pub url: String,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Create a new link, classifying it from the URL
    pub fn new(contact_id: ContactId, title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: LinkId::new(),
            contact_id,
            title: title.into(),
            link_type: LinkType::classify(&url),
            url,
            description: None,
            created_at: Utc::now(),
        }
    }
}
