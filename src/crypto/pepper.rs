//! Pepper files.
//!
//! A pepper is a 32-byte random secret kept outside the vault (typically on
//! a separate device). When configured, it is mixed into every derived key,
//! so the vault file plus the passphrase is not enough to unlock it. The
//! vault never records whether a pepper was used.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{VaultError, Result};

/// Expected length of a pepper file in bytes (256 bits).
const PEPPER_LEN: usize = 32;

/// Out-of-band secret mixed into key derivation. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Pepper {
    bytes: Vec<u8>,
}

impl Pepper {
    /// Wrap raw pepper bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Pepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pepper(..)")
    }
}

/// Generate a new random pepper and write it to `path`.
///
/// The file is created owner-only and is never overwritten.
pub fn generate_pepper_file(path: &Path) -> Result<Pepper> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::PepperError(format!("cannot create pepper directory: {e}"))
            })?;
        }
    }

    let mut options = OpenOptions::new();
    options.create_new(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => VaultError::PepperError(format!(
            "pepper file already exists at {}",
            path.display()
        )),
        _ => VaultError::PepperError(format!("failed to create pepper file: {e}")),
    })?;

    let mut bytes = vec![0u8; PEPPER_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let pepper = Pepper::from_bytes(bytes);

    let written = file
        .write_all(pepper.as_bytes())
        .and_then(|()| file.sync_all());
    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(VaultError::PepperError(format!(
            "failed to write pepper file: {e}"
        )));
    }

    Ok(pepper)
}

/// Load a pepper from disk and validate its length.
pub fn load_pepper_file(path: &Path) -> Result<Pepper> {
    if !path.exists() {
        return Err(VaultError::PepperError(format!(
            "pepper file not found at {}",
            path.display()
        )));
    }

    let mut data = fs::read(path)
        .map_err(|e| VaultError::PepperError(format!("failed to read pepper file: {e}")))?;

    if data.len() != PEPPER_LEN {
        let len = data.len();
        data.zeroize();
        return Err(VaultError::PepperError(format!(
            "pepper file must be exactly {PEPPER_LEN} bytes, got {len}"
        )));
    }

    Ok(Pepper::from_bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generate_and_load_pepper_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.pepper");

        let generated = generate_pepper_file(&path).unwrap();
        assert_eq!(generated.as_bytes().len(), PEPPER_LEN);

        let loaded = load_pepper_file(&path).unwrap();
        assert_eq!(generated.as_bytes(), loaded.as_bytes());
    }

    #[test]
    fn generate_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.pepper");

        let first = generate_pepper_file(&path).unwrap();
        assert!(matches!(
            generate_pepper_file(&path),
            Err(VaultError::PepperError(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), first.as_bytes());
    }

    #[test]
    fn load_fails_if_missing() {
        let dir = TempDir::new().unwrap();
        let result = load_pepper_file(&dir.path().join("missing.pepper"));
        assert!(matches!(result, Err(VaultError::PepperError(_))));
    }

    #[test]
    fn load_fails_on_wrong_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.pepper");
        fs::write(&path, [0u8; 16]).unwrap();

        assert!(load_pepper_file(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn pepper_file_is_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.pepper");
        generate_pepper_file(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
