//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The vault key is never stored.  Every unlock re-derives it from the
//! password and the vault's salt, so the same `(password, salt)` pair
//! must always produce the same key.

use std::fmt;

use hmac::Hmac;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Sha256;

use super::keys::SymmetricKey;
use crate::errors::{RabbitHoleError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// The per-vault KDF salt.
///
/// Generated once when the vault is created and persisted inside it.
/// Regenerating it would make every stored secret unrecoverable.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the operating system CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            RabbitHoleError::KeyDerivationFailed(format!("salt generation failed: {e}"))
        })?;
        Ok(Self(bytes))
    }

    /// Rebuild a salt read back from storage.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            RabbitHoleError::InvalidVaultFormat(format!(
                "salt must be exactly {SALT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// Derive the 32-byte vault key from a password and the vault salt.
///
/// The same password + salt will always produce the same key.
pub fn derive_key(password: &[u8], salt: &Salt) -> Result<SymmetricKey> {
    // Fill the key's own buffer so no unwiped copy of the output exists.
    let mut key = SymmetricKey::zeroed();
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password,
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut key.as_mut_bytes()[..],
    )
    .map_err(|e| RabbitHoleError::KeyDerivationFailed(format!("PBKDF2 failed: {e}")))?;

    tracing::debug!(rounds = PBKDF2_ROUNDS, "vault key derived");
    Ok(key)
}
