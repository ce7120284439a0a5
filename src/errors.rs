use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in RabbitHole.
#[derive(Debug, Error)]
pub enum RabbitHoleError {
    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    // --- Authentication errors ---
    #[error("Incorrect vault password")]
    PasswordMismatch,

    #[error("Vault is not initialized — no {0} found")]
    MissingCredentialState(&'static str),

    // --- Vault errors ---
    #[error("Vault already has a {0} — credentials cannot be replaced")]
    CredentialAlreadySet(&'static str),

    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Secret '{0}' already exists — labels are unique")]
    SecretAlreadyExists(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // --- Profile / config errors ---
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Profile '{0}' already exists")]
    ProfileAlreadyExists(String),

    #[error("No profiles configured — run `rabbithole init <profile>` first")]
    NoProfiles,

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Clipboard errors ---
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl RabbitHoleError {
    /// Whether the caller may reasonably retry the failed step.
    ///
    /// A wrong password can be re-prompted, and a failed encryption can be
    /// retried with fresh randomness. Everything else aborts the workflow.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PasswordMismatch | Self::DecryptionFailed | Self::EncryptionFailed(_)
        )
    }
}

/// Convenience type alias for RabbitHole results.
pub type Result<T> = std::result::Result<T, RabbitHoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(RabbitHoleError::PasswordMismatch.is_recoverable());
        assert!(RabbitHoleError::DecryptionFailed.is_recoverable());
        assert!(RabbitHoleError::EncryptionFailed("rng".into()).is_recoverable());
    }

    #[test]
    fn precondition_violations_are_fatal() {
        assert!(!RabbitHoleError::MissingCredentialState("salt").is_recoverable());
        assert!(!RabbitHoleError::KeyDerivationFailed("boom".into()).is_recoverable());
    }

    #[test]
    fn decryption_message_does_not_distinguish_causes() {
        let msg = RabbitHoleError::DecryptionFailed.to_string();
        assert!(msg.contains("wrong key or corrupted data"));
    }
}
