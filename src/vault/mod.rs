//! Vault module: encrypted secret storage.
//!
//! This module provides:
//! - `SecretRecord` and `SecretMetadata` types (`secret`)
//! - The SQLite-backed `VaultDatabase` (`database`)
//! - The `LockedVault` / `UnlockedVault` session types (`store`)

pub mod database;
pub mod secret;
pub mod store;

// Re-export the most commonly used items.
pub use database::VaultDatabase;
pub use secret::{SecretMetadata, SecretRecord};
pub use store::{LockedVault, UnlockedVault, Vault};
