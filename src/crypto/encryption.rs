//! AES-256-GCM authenticated encryption.
//!
//! `seal` generates a fresh random 12-byte nonce for every call and returns
//! the nonce and the 16-byte tag as separate fields next to the
//! ciphertext, so each piece can be stored under its own name in the vault
//! file. `open` never generates a nonce; it only verifies and decrypts.

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// Size of the AES-256-GCM nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Algorithm name recorded in vault headers.
pub const AES_256_GCM: &str = "aes-256-gcm";

/// Which AEAD protects a vault.
///
/// Only AES-256-GCM with a 16-byte tag exists today; it is stored as data
/// so a future cipher can be told apart from this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherSpec {
    pub alg: String,
    pub tag_bytes: u32,
}

impl Default for CipherSpec {
    fn default() -> Self {
        Self {
            alg: AES_256_GCM.to_string(),
            tag_bytes: TAG_LEN as u32,
        }
    }
}

impl CipherSpec {
    /// Reject any cipher this build cannot open.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.alg != AES_256_GCM || self.tag_bytes as usize != TAG_LEN {
            return Err(VaultError::CorruptVault(format!(
                "unsupported cipher {} with {}-byte tag",
                self.alg, self.tag_bytes
            )));
        }
        Ok(())
    }
}

/// Output of [`seal`].
#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` with a 32-byte `key`, binding `associated_data`.
pub fn seal(key: &[u8], plaintext: &[u8], associated_data: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(&nonce, associated_data, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            // The buffer may still hold plaintext.
            drop(Zeroizing::new(buffer));
            return Err(VaultError::EncryptionFailed(format!("encryption error: {e}")));
        }
    };

    Ok(Sealed {
        ciphertext: buffer,
        nonce: nonce.to_vec(),
        tag: tag.to_vec(),
    })
}

/// Verify and decrypt data produced by [`seal`].
///
/// Any mismatch (key, nonce, tag, ciphertext or associated data) yields
/// `AuthenticationFailure` and no plaintext.
pub fn open(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(VaultError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::AuthenticationFailure)?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            associated_data,
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| VaultError::AuthenticationFailure)?;

    Ok(buffer)
}
