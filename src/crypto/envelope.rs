//! Encryption envelope for structured backups
//!
//! An encrypted backup replaces the whole document with
//! `{encrypted: true, data, nonce, kdf, timestamp, version}`. The `encrypted`
//! marker lets import detect the envelope before asking for a password.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ContactbookError, ContactbookResult};

use super::encryption::{decrypt, encrypt};
use super::key_derivation::{derive_key, KdfCost, KeyDerivationParams};

/// Current envelope layout
pub const ENVELOPE_VERSION: u32 = 1;

/// Password-encrypted backup body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub encrypted: bool,
    /// Ciphertext with tag (base64)
    pub data: String,
    /// AES-GCM nonce (base64)
    pub nonce: String,
    pub kdf: KeyDerivationParams,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl Envelope {
    /// Whether a parsed JSON value carries the envelope marker
    pub fn is_envelope(value: &serde_json::Value) -> bool {
        value
            .get("encrypted")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Read an envelope out of a JSON value that carries the marker
    ///
    /// A malformed envelope is indistinguishable from a wrong password.
    pub fn from_value(value: serde_json::Value) -> ContactbookResult<Self> {
        serde_json::from_value(value).map_err(|_| ContactbookError::DecryptionFailed)
    }

    pub fn to_bytes(&self) -> ContactbookResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Encrypt `plaintext` under a key derived from `password`
pub fn wrap(plaintext: &[u8], password: &str, cost: KdfCost) -> ContactbookResult<Envelope> {
    if password.is_empty() {
        return Err(ContactbookError::Validation(
            "Backup password cannot be empty".into(),
        ));
    }

    let kdf = KeyDerivationParams::generate(cost);
    let key = derive_key(password, &kdf)?;
    let sealed = encrypt(plaintext, &key)?;

    debug!(bytes = plaintext.len(), "backup body encrypted");
    Ok(Envelope {
        encrypted: true,
        data: STANDARD.encode(&sealed.ciphertext),
        nonce: STANDARD.encode(sealed.nonce),
        kdf,
        timestamp: Utc::now(),
        version: ENVELOPE_VERSION,
    })
}

/// Decrypt an envelope
///
/// Every failure is reported as `DecryptionFailed` so the caller cannot tell
/// a wrong password from a damaged file.
pub fn unwrap(envelope: &Envelope, password: &str) -> ContactbookResult<Vec<u8>> {
    if !envelope.encrypted || envelope.version != ENVELOPE_VERSION {
        return Err(ContactbookError::DecryptionFailed);
    }
    if !envelope.kdf.cost.is_plausible() {
        return Err(ContactbookError::DecryptionFailed);
    }

    let nonce = STANDARD
        .decode(&envelope.nonce)
        .map_err(|_| ContactbookError::DecryptionFailed)?;
    let ciphertext = STANDARD
        .decode(&envelope.data)
        .map_err(|_| ContactbookError::DecryptionFailed)?;
    let key = derive_key(password, &envelope.kdf).map_err(|_| ContactbookError::DecryptionFailed)?;

    decrypt(&nonce, &ciphertext, &key)
}
