//! Cryptographic functions for Contactbook
//!
//! AES-256-GCM with Argon2id key derivation, wrapped into the envelope used
//! for password-protected structured backups.

pub mod encryption;
pub mod envelope;
pub mod key_derivation;
pub mod secure_memory;

pub use envelope::{unwrap, wrap, Envelope};
pub use key_derivation::{derive_key, DerivedKey, KdfCost, KeyDerivationParams};
pub use secure_memory::SecureString;
