//! SecretRecord and SecretMetadata types stored inside a vault.
//!
//! Each record holds its label, the sealed (encrypted) value, and the
//! time it was added.  Records are never updated in place.

use chrono::{DateTime, Utc};

use crate::crypto::SealedSecret;
use crate::errors::{RabbitHoleError, Result};

/// Maximum label length in characters.
const MAX_LABEL_LEN: usize = 256;

/// A single encrypted secret stored in the vault.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    /// The label the secret is looked up by (e.g. "openai").
    pub label: String,

    /// Nonce + ciphertext, stored as two base64 text columns.
    pub sealed: SealedSecret,

    /// When this secret was added.
    pub created_at: DateTime<Utc>,
}

/// Lightweight metadata about a secret (no ciphertext).
///
/// Returned by listing operations so callers can display labels without
/// touching any encrypted data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMetadata {
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Validate a secret label.
///
/// Labels are free text but must be non-empty, at most 256 characters,
/// free of control characters, and carry no leading or trailing
/// whitespace (so "openai" and " openai " cannot coexist).
pub fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(RabbitHoleError::InvalidLabel(
            "label cannot be empty".into(),
        ));
    }
    if label.trim() != label {
        return Err(RabbitHoleError::InvalidLabel(format!(
            "label '{label}' cannot start or end with whitespace"
        )));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(RabbitHoleError::InvalidLabel(format!(
            "label cannot exceed {MAX_LABEL_LEN} characters"
        )));
    }
    if label.chars().any(char::is_control) {
        return Err(RabbitHoleError::InvalidLabel(
            "label cannot contain control characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_labels() {
        assert!(validate_label("openai").is_ok());
        assert!(validate_label("GitHub token (work)").is_ok());
        assert!(validate_label("ключ").is_ok());
    }

    #[test]
    fn rejects_blank_labels() {
        assert!(validate_label("").is_err());
        assert!(validate_label("   ").is_err());
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(validate_label(" openai ").is_err());
        assert!(validate_label("openai ").is_err());
        assert!(validate_label("\u{a0}openai").is_err());
        assert!(validate_label("open ai").is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(validate_label("open\nai").is_err());
        assert!(validate_label("tab\there").is_err());
    }

    #[test]
    fn rejects_overlong_labels() {
        assert!(validate_label(&"a".repeat(MAX_LABEL_LEN)).is_ok());
        assert!(validate_label(&"a".repeat(MAX_LABEL_LEN + 1)).is_err());
    }
}
