//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! returns it alongside the ciphertext as a `SealedSecret`.  The two
//! halves are stored in separate base64 text columns.
//!
//! Layout of `SealedSecret::ciphertext`:
//!   [ ciphertext | 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use zeroize::{Zeroize, Zeroizing};

use super::keys::SymmetricKey;
use crate::errors::{RabbitHoleError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// An encrypted secret value: the nonce it was sealed under plus the
/// ciphertext with its authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedSecret {
    /// Encode as `(nonce_b64, ciphertext_b64)` for text storage.
    pub fn to_base64(&self) -> (String, String) {
        (BASE64.encode(self.nonce), BASE64.encode(&self.ciphertext))
    }

    /// Decode the `(nonce_b64, ciphertext_b64)` pair read from storage.
    pub fn from_base64(nonce_b64: &str, ciphertext_b64: &str) -> Result<Self> {
        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|e| RabbitHoleError::InvalidVaultFormat(format!("nonce: {e}")))?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes.as_slice().try_into().map_err(|_| {
            RabbitHoleError::InvalidVaultFormat(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            ))
        })?;
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| RabbitHoleError::InvalidVaultFormat(format!("ciphertext: {e}")))?;

        Ok(Self { nonce, ciphertext })
    }
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(key: &SymmetricKey, plaintext: &str) -> Result<SealedSecret> {
    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| RabbitHoleError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // A nonce must never repeat under the same key, so always draw a new one.
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| RabbitHoleError::EncryptionFailed(format!("nonce generation failed: {e}")))?;

    // Encrypt and authenticate the plaintext.
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| RabbitHoleError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(SealedSecret { nonce, ciphertext })
}

/// Decrypt a `SealedSecret` produced by `encrypt`.
///
/// A wrong key, a tampered nonce or ciphertext, and a truncated tag all
/// surface as the same `DecryptionFailed` error.
pub fn decrypt(key: &SymmetricKey, sealed: &SealedSecret) -> Result<Zeroizing<String>> {
    if sealed.ciphertext.len() < TAG_LEN {
        return Err(RabbitHoleError::DecryptionFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| RabbitHoleError::DecryptionFailed)?;

    // Decrypt and verify the auth tag.
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| RabbitHoleError::DecryptionFailed)?;

    // Convert via from_utf8, which takes ownership (no extra copy).
    // Wipe the bytes inside the error before discarding it.
    String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        RabbitHoleError::DecryptionFailed
    })
}
