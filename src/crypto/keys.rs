//! In-memory key material.
//!
//! The symmetric key is derived on every unlock and never written to
//! disk.  `SymmetricKey` wipes its bytes when dropped and deliberately
//! implements neither `Clone` nor `Debug`, so the only copy lives with
//! the session that derived it.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the symmetric key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte AES-256 key that automatically zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// An all-zero key, to be filled in place by a KDF.
    pub(crate) fn zeroed() -> Self {
        Self {
            bytes: [0u8; KEY_LEN],
        }
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }

    /// Access the raw key bytes (e.g. to build a cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for SymmetricKey {}
