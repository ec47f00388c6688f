//! ALFA Notes Vault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // IDENTITY / CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid mnemonic phrase")]
    InvalidMnemonic,

    #[error("Authentication failed - wrong key or tampered data")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Vault is locked")]
    VaultLocked,

    // ═══════════════════════════════════════════════════════════════
    // BIOMETRIC ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Biometric unlock is not supported on this device")]
    Unsupported,

    #[error("No matching biometric credential")]
    NoMatch,

    #[error("Biometric prompt cancelled by user")]
    UserCancelled,

    // ═══════════════════════════════════════════════════════════════
    // STORAGE / REGISTRY ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Display name already in use: {0}")]
    NameTaken(String),

    #[error("Invalid display name: {0:?}")]
    InvalidName(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // EMBEDDING ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Embedding service failure: {0}")]
    EmbeddingServiceFailure(String),

    // ═══════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl VaultError {
    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::AuthenticationFailed | VaultError::CorruptData(_)
        )
    }

    /// Check if the same operation may succeed when attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::NoMatch
                | VaultError::UserCancelled
                | VaultError::StorageFailure(_)
                | VaultError::EmbeddingServiceFailure(_)
        )
    }

    /// User-facing text for a failed unlock.
    ///
    /// A malformed phrase and a phrase that opens nothing render the same,
    /// so the message leaks nothing beyond what checksum validation implies.
    pub fn unlock_message(&self) -> String {
        match self {
            VaultError::InvalidMnemonic | VaultError::AuthenticationFailed => {
                "Unable to unlock vault with this phrase".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::StorageFailure(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::SerializationError(e.to_string())
    }
}
