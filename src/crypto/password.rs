//! Unlock-password hashing and verification using Argon2id.
//!
//! The stored hash is a self-describing PHC string that embeds the
//! algorithm, cost parameters, and a random per-hash salt:
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=4$<salt b64>$<hash b64>
//! ```
//!
//! It gates access to the vault only.  The symmetric key that encrypts
//! secrets is derived separately (see `kdf`), so this hash reveals
//! nothing about it.

use std::fmt;

use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::errors::{RabbitHoleError, Result};

/// Length of the random salt embedded in each hash.
const HASH_SALT_LEN: usize = 16;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters for new password hashes.
///
/// These map 1:1 to the fields in `Settings`.  Verification always uses
/// the parameters embedded in the stored hash, so changing them only
/// affects vaults created afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Build an Argon2id hasher, enforcing minimum parameters to prevent
    /// dangerously weak settings.
    fn hasher(&self) -> Result<Argon2<'static>> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(RabbitHoleError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(RabbitHoleError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(RabbitHoleError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }

        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| {
                RabbitHoleError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
            })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A stored unlock-password hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC string read back from storage.
    ///
    /// The string is parsed lazily by `verify_password`.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the parameter prefix is safe to show in logs.
        let prefix = self.0.rsplitn(3, '$').last().unwrap_or_default();
        write!(f, "PasswordHash({prefix}$..)")
    }
}

/// Hash an unlock password with a freshly generated salt.
///
/// Hashing the same password twice yields two different strings, both
/// of which verify.
pub fn hash_password(password: &[u8], params: &Argon2Params) -> Result<PasswordHash> {
    let argon2 = params.hasher()?;

    let mut salt_bytes = [0u8; HASH_SALT_LEN];
    OsRng.try_fill_bytes(&mut salt_bytes).map_err(|e| {
        RabbitHoleError::KeyDerivationFailed(format!("salt generation failed: {e}"))
    })?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| RabbitHoleError::KeyDerivationFailed(format!("salt encoding failed: {e}")))?;

    let hash = argon2
        .hash_password(password, &salt)
        .map_err(|e| RabbitHoleError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(PasswordHash(hash.to_string()))
}

/// Check `candidate` against a stored hash.
///
/// Returns `Ok(false)` on a mismatch.  An error means the stored hash
/// itself is unusable.  The comparison is constant-time inside the
/// `password-hash` primitive.
pub fn verify_password(hash: &PasswordHash, candidate: &[u8]) -> Result<bool> {
    let parsed = password_hash::PasswordHash::new(&hash.0).map_err(|e| {
        RabbitHoleError::InvalidVaultFormat(format!("stored password hash is malformed: {e}"))
    })?;

    match Argon2::default().verify_password(candidate, &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(RabbitHoleError::InvalidVaultFormat(format!(
            "stored password hash is unusable: {e}"
        ))),
    }
}
