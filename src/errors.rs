use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in passvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Storage engine errors ---
    #[error("Vault file is corrupt or unrecognised: {0}")]
    CorruptVault(String),

    #[error("Unsupported key derivation function: {0}")]
    UnsupportedKdf(String),

    #[error("Vault header hash mismatch: header fields were modified")]
    HeaderTamper,

    #[error("Authentication failed: wrong passphrase or corrupted ciphertext")]
    AuthenticationFailure,

    #[error("Passphrase rejected: {0}")]
    WeakPassphrase(String),

    #[error("Unlock failed")]
    UnlockFailed,

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    // --- Pepper errors ---
    #[error("Pepper error: {0}")]
    PepperError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl VaultError {
    /// Returns `true` for errors raised while turning a passphrase and a
    /// vault file into a record set (format, header, KDF and AEAD checks).
    pub fn is_unlock_failure(&self) -> bool {
        matches!(
            self,
            Self::CorruptVault(_)
                | Self::UnsupportedKdf(_)
                | Self::HeaderTamper
                | Self::AuthenticationFailure
                | Self::KeyDerivationFailed(_)
                | Self::SerializationError(_)
                | Self::UnlockFailed
        )
    }

    /// Collapse unlock failures into the single outward-facing
    /// [`VaultError::UnlockFailed`].
    ///
    /// Callers that present errors to a user should route `load` results
    /// through this so the message never reveals which check failed.
    /// Filesystem errors pass through unchanged.
    pub fn into_unlock_failure(self) -> Self {
        if self.is_unlock_failure() {
            Self::UnlockFailed
        } else {
            self
        }
    }
}

/// Convenience type alias for passvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
