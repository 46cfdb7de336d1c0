//! AES-256-GCM encryption/decryption
//!
//! Authenticated encryption of a whole backup body. Each call generates a
//! fresh 96-bit nonce.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::error::{ContactbookError, ContactbookResult};

use super::DerivedKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Ciphertext (with tag) and the nonce it was sealed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypt plaintext with a random nonce
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> ContactbookResult<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| ContactbookError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| ContactbookError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(Sealed { nonce, ciphertext })
}

/// Decrypt and authenticate
///
/// Any failure, including a nonce of the wrong length, is `DecryptionFailed`.
pub fn decrypt(nonce: &[u8], ciphertext: &[u8], key: &DerivedKey) -> ContactbookResult<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(ContactbookError::DecryptionFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| ContactbookError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| ContactbookError::DecryptionFailed)
}
