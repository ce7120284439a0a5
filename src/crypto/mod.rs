//! Cryptographic primitives for RabbitHole.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 vault key derivation (`kdf`)
//! - AES-256-GCM encryption and decryption of secret values (`encryption`)
//! - Argon2id hashing of the unlock password (`password`)
//! - The zeroize-on-drop `SymmetricKey` holder (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod password;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, SealedSecret};
pub use kdf::{derive_key, Salt};
pub use keys::SymmetricKey;
pub use password::{hash_password, verify_password, Argon2Params, PasswordHash};
