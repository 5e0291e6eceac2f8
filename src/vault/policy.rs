//! Security policy handed to the vault service.
//!
//! A plain immutable value: build one (usually from `Settings::policy`)
//! and pass it to `VaultService::new`. Nothing here is process-wide.

use crate::crypto::KdfSpec;
use crate::errors::{VaultError, Result};

/// Default minimum passphrase length for new vaults.
pub const DEFAULT_MIN_PASSPHRASE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPolicy {
    /// KDF used for new vaults and for migrations.
    pub recommended_kdf: KdfSpec,

    /// Shortest passphrase accepted when choosing a new one.
    pub min_passphrase_len: usize,
}

impl Default for VaultPolicy {
    fn default() -> Self {
        Self {
            recommended_kdf: KdfSpec::default(),
            min_passphrase_len: DEFAULT_MIN_PASSPHRASE_LEN,
        }
    }
}

impl VaultPolicy {
    /// Reject a new passphrase before any cryptography runs.
    pub fn check_passphrase(&self, passphrase: &str) -> Result<()> {
        if passphrase.trim().is_empty() {
            return Err(VaultError::WeakPassphrase(
                "passphrase cannot be empty".into(),
            ));
        }
        let len = passphrase.chars().count();
        if len < self.min_passphrase_len {
            return Err(VaultError::WeakPassphrase(format!(
                "passphrase must be at least {} characters (got {len})",
                self.min_passphrase_len
            )));
        }
        Ok(())
    }
}
