//! The derived vault key and the optional pepper step.
//!
//! A pepper is mixed in with HKDF-SHA256 (RFC 5869): the raw KDF output is
//! the input keying material, the pepper is the extract salt, and a fixed
//! context label is the expand `info`.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::pepper::Pepper;
use crate::errors::{VaultError, Result};

/// Length of the vault key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// HKDF `info` label binding peppered keys to this vault format.
const PEPPER_CONTEXT: &[u8] = b"passvault/v2/vault-key";

/// Mix a pepper into a raw KDF output.
pub fn apply_pepper(raw_key: &[u8], pepper: &Pepper) -> Result<DerivedKey> {
    let hk = Hkdf::<Sha256>::new(Some(pepper.as_bytes()), raw_key);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(PEPPER_CONTEXT, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    let key = DerivedKey::new(okm);
    okm.zeroize();
    Ok(key)
}

/// A 32-byte symmetric key that zeroes its memory when dropped.
///
/// Lives for a single encrypt or decrypt call and is never written out.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}
