//! Key derivation using Argon2id
//!
//! Derives encryption keys from user passwords using Argon2id. The cost is
//! configurable and travels with every envelope, so a backup written with one
//! profile can be opened by an install configured with another.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ContactbookError, ContactbookResult};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Upper bounds accepted when reading parameters back from a file
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;
pub const MAX_ITERATIONS: u32 = 64;
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfCost {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_kib: u32,
    /// Iterations (default: 3)
    pub iterations: u32,
    /// Lanes (default: 4)
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfCost {
    /// Cheapest profile Argon2 accepts; only for tests and scripting
    pub fn light() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Whether the profile is inside the bounds this build will run
    pub fn is_plausible(&self) -> bool {
        (1..=MAX_ITERATIONS).contains(&self.iterations)
            && (1..=MAX_PARALLELISM).contains(&self.parallelism)
            && self.memory_kib >= 8 * self.parallelism
            && self.memory_kib <= MAX_MEMORY_KIB
    }
}

/// Salt and cost needed to re-derive a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivationParams {
    /// Random salt (base64 encoded)
    pub salt: String,
    #[serde(flatten)]
    pub cost: KdfCost,
}

impl KeyDerivationParams {
    /// Fresh params with a random salt
    pub fn generate(cost: KdfCost) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self {
            salt: STANDARD.encode(salt),
            cost,
        }
    }
}

/// A derived 256-bit key, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// Derive an encryption key from a password
pub fn derive_key(password: &str, params: &KeyDerivationParams) -> ContactbookResult<DerivedKey> {
    if !params.cost.is_plausible() {
        return Err(ContactbookError::Encryption(format!(
            "Argon2 parameters out of range: {:?}",
            params.cost
        )));
    }

    let salt = STANDARD
        .decode(&params.salt)
        .map_err(|e| ContactbookError::Encryption(format!("Invalid salt: {}", e)))?;

    let argon2_params = Params::new(
        params.cost.memory_kib,
        params.cost.iterations,
        params.cost.parallelism,
        Some(32),
    )
    .map_err(|e| ContactbookError::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = DerivedKey { key: [0u8; 32] };
    argon2
        .hash_password_into(password.as_bytes(), &salt, &mut key.key)
        .map_err(|e| ContactbookError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_password_same_key() {
        let params = KeyDerivationParams::generate(KdfCost::light());
        let key1 = derive_key("test_password", &params).unwrap();
        let key2 = derive_key("test_password", &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let params = KeyDerivationParams::generate(KdfCost::light());
        let key1 = derive_key("password1", &params).unwrap();
        let key2 = derive_key("password2", &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let params1 = KeyDerivationParams::generate(KdfCost::light());
        let params2 = KeyDerivationParams::generate(KdfCost::light());
        let key1 = derive_key("same", &params1).unwrap();
        let key2 = derive_key("same", &params2).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_implausible_cost_rejected() {
        let mut params = KeyDerivationParams::generate(KdfCost::light());
        params.cost.memory_kib = u32::MAX;
        assert!(derive_key("pw", &params).is_err());

        params.cost = KdfCost {
            iterations: 0,
            ..KdfCost::light()
        };
        assert!(derive_key("pw", &params).is_err());
    }

    #[test]
    fn test_params_serialize_flat() {
        let params = KeyDerivationParams::generate(KdfCost::default());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["memoryKib"], 65536);
        assert_eq!(json["iterations"], 3);
        assert!(json["salt"].is_string());
    }
}
