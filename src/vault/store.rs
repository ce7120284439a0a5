//! High-level vault operations used by CLI commands.
//!
//! A vault session has two states:
//!
//! - `LockedVault`: the database is open but no password has been
//!   verified, so nothing can be decrypted.
//! - `UnlockedVault`: the password matched the stored hash and the
//!   symmetric key has been re-derived from it and the stored salt.
//!
//! `LockedVault::unlock` is the only transition.  There is no way back
//! to `Locked`; dropping the `UnlockedVault` ends the session and wipes
//! the key.

use std::path::Path;

use chrono::Utc;
use zeroize::Zeroizing;

use crate::crypto::{self, Argon2Params, Salt, SymmetricKey};
use crate::errors::{RabbitHoleError, Result};

use super::database::VaultDatabase;
use super::secret::{validate_label, SecretMetadata, SecretRecord};

/// Entry point for creating new vaults.
pub struct Vault;

impl Vault {
    /// Create a brand-new vault file at `path`.
    ///
    /// Generates the per-vault salt, hashes the unlock password, and
    /// writes both to a fresh database.  The returned vault is still
    /// locked; callers unlock it like any other.
    ///
    /// Pass `None` for `argon2_params` to use the defaults.
    pub fn create(
        path: &Path,
        password: &[u8],
        argon2_params: Option<&Argon2Params>,
    ) -> Result<LockedVault> {
        if password.is_empty() {
            return Err(RabbitHoleError::CommandFailed(
                "vault password cannot be empty".into(),
            ));
        }

        // Do the slow, fallible work before touching the filesystem.
        let salt = Salt::generate()?;
        let hash = crypto::hash_password(password, &argon2_params.copied().unwrap_or_default())?;

        let db = VaultDatabase::create(path, &salt, &hash)?;

        tracing::info!(path = %path.display(), "vault initialized");
        Ok(LockedVault { db })
    }
}

/// An open vault whose password has not been verified yet.
pub struct LockedVault {
    db: VaultDatabase,
}

impl LockedVault {
    /// Open an existing vault file.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: VaultDatabase::open(path)?,
        })
    }

    /// Verify `password` and, on success, derive the session key.
    ///
    /// A wrong password yields `PasswordMismatch` and leaves this vault
    /// usable for another attempt.  A vault with no stored hash or salt
    /// yields `MissingCredentialState`.
    pub fn unlock(&self, password: &[u8]) -> Result<UnlockedVault<'_>> {
        let hash = self
            .db
            .load_password_hash()?
            .ok_or(RabbitHoleError::MissingCredentialState("password hash"))?;

        if !crypto::verify_password(&hash, password)? {
            tracing::warn!(path = %self.db.path().display(), "vault unlock rejected");
            return Err(RabbitHoleError::PasswordMismatch);
        }

        let salt = self
            .db
            .load_salt()?
            .ok_or(RabbitHoleError::MissingCredentialState("salt"))?;

        // Re-derive on every unlock; the key is never persisted.
        let key = crypto::derive_key(password, &salt)?;

        tracing::info!(path = %self.db.path().display(), "vault unlocked");
        Ok(UnlockedVault { db: &self.db, key })
    }

    /// List secret labels without unlocking.  Labels are not encrypted.
    pub fn list_secrets(&self) -> Result<Vec<SecretMetadata>> {
        self.db.list_secrets()
    }
}

/// A vault with a verified password and a live symmetric key.
pub struct UnlockedVault<'v> {
    db: &'v VaultDatabase,

    /// The derived key (zeroized on drop).
    key: SymmetricKey,
}

impl UnlockedVault<'_> {
    /// Encrypt and store a new secret.
    ///
    /// Labels are unique; storing an existing label fails with
    /// `SecretAlreadyExists`.
    pub fn add_secret(&self, label: &str, value: &str) -> Result<()> {
        validate_label(label)?;
        if value.is_empty() {
            return Err(RabbitHoleError::CommandFailed(
                "secret value cannot be empty".into(),
            ));
        }

        let record = SecretRecord {
            label: label.to_string(),
            sealed: crypto::encrypt(&self.key, value)?,
            created_at: Utc::now(),
        };
        self.db.insert_secret(&record)?;

        tracing::info!(label, "secret stored");
        Ok(())
    }

    /// Decrypt and return the plaintext value of a secret.
    ///
    /// The result wipes itself when dropped.
    pub fn reveal_secret(&self, label: &str) -> Result<Zeroizing<String>> {
        let record = self
            .db
            .find_secret(label)?
            .ok_or_else(|| RabbitHoleError::SecretNotFound(label.to_string()))?;

        let value = crypto::decrypt(&self.key, &record.sealed).inspect_err(|_| {
            tracing::error!(label, "secret could not be decrypted");
        })?;

        tracing::info!(label, "secret decrypted");
        Ok(value)
    }

    /// List metadata for all secrets, sorted by label.
    pub fn list_secrets(&self) -> Result<Vec<SecretMetadata>> {
        self.db.list_secrets()
    }

    /// Returns `true` if the vault contains a secret with the given label.
    ///
    /// This is a metadata-only check; no decryption is performed.
    pub fn contains(&self, label: &str) -> Result<bool> {
        Ok(self.db.find_secret(label)?.is_some())
    }

    /// Returns the number of secrets in the vault.
    pub fn secret_count(&self) -> Result<usize> {
        self.db.secret_count()
    }
}
