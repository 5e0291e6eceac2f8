//! Crash-safe, owner-only file replacement.
//!
//! A write goes through two phases:
//!
//! 1. **stage**: create a uniquely named temp file next to the target
//!    (same directory, so same filesystem), restrict it to `0600`, write,
//!    `fsync`, close.
//! 2. **commit**: rename the temp file over the target, re-apply `0600`,
//!    and `fsync` the directory.
//!
//! Until the rename happens the previous file is untouched, so a crash at
//! any point leaves either the old vault or the new one, never a mix.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::errors::Result;

/// A fully written and synced temp file that has not replaced its target yet.
#[must_use = "a staged write does nothing until committed"]
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    /// Path of the temp file holding the new contents.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically move the staged contents into place.
    pub fn commit(self) -> Result<()> {
        if let Err(e) = fs::rename(&self.temp_path, &self.target) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e.into());
        }
        set_owner_only(&self.target)?;
        sync_parent_dir(&self.target);

        tracing::debug!(path = %self.target.display(), "atomic write committed");
        Ok(())
    }

    /// Throw the staged contents away and leave the target as it was.
    pub fn abort(self) -> Result<()> {
        fs::remove_file(&self.temp_path)?;
        Ok(())
    }
}

/// Replace `path` with `bytes` atomically and with owner-only permissions.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    stage(path, bytes)?.commit()
}

/// Write `bytes` to a fresh sibling temp file of `path` without touching
/// `path` itself.
pub fn stage(path: &Path, bytes: &[u8]) -> Result<StagedWrite> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(temp_file_name(path));

    // `create_new` guarantees we never reuse a leftover temp file.
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)?;

    let written = set_owner_only(&temp_path)
        .and_then(|()| file.write_all(bytes).map_err(Into::into))
        .and_then(|()| file.sync_all().map_err(Into::into));
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(StagedWrite {
        temp_path,
        target: path.to_path_buf(),
    })
}

/// Directory containing `path`, treating a bare file name as `.`.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// `.{file_name}.{pid}-{nanos}-{random}.tmp`, unique per attempt.
fn temp_file_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let salt = rand::rng().next_u32();
    format!(".{file_name}.{}-{nanos}-{salt:08x}.tmp", std::process::id())
}

/// Restrict a file to owner read/write. No-op off Unix.
pub fn set_owner_only(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Best-effort fsync of the directory so the rename itself is durable.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    if let Ok(dir) = fs::File::open(parent_dir(path)) {
        let _ = dir.sync_all();
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.dat");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("vault.dat");
        write_atomic(&path, b"data").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn staged_write_leaves_target_untouched_until_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.dat");
        write_atomic(&path, b"old").unwrap();

        let staged = stage(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"old");
        assert_eq!(fs::read(staged.temp_path()).unwrap(), b"new");

        staged.commit().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn abort_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.dat");
        write_atomic(&path, b"old").unwrap();

        let staged = stage(&path, b"new").unwrap();
        let temp = staged.temp_path().to_path_buf();
        staged.abort().unwrap();

        assert!(!temp.exists());
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn temp_names_are_unique_per_attempt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.dat");

        let a = stage(&path, b"a").unwrap();
        let b = stage(&path, b"b").unwrap();
        assert_ne!(a.temp_path(), b.temp_path());
        assert_eq!(a.temp_path().parent(), path.parent());

        a.abort().unwrap();
        b.abort().unwrap();
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        assert_eq!(parent_dir(Path::new("vault.dat")), Path::new("."));
    }

    #[cfg(unix)]
    #[test]
    fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.dat");

        let staged = stage(&path, b"secret").unwrap();
        let temp_mode = fs::metadata(staged.temp_path()).unwrap().permissions().mode();
        assert_eq!(temp_mode & 0o777, 0o600);

        staged.commit().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
