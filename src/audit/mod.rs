//! Audit trail of vault operations.
//!
//! With the `audit-log` feature, events are appended to a SQLite journal
//! next to the vault (`<vault dir>/audit.db`). An event only carries what
//! the unencrypted header already shows: the operation, the vault file
//! name, the container generation and an optional header-level detail.
//! The journal has no column for record names: anything that only exists
//! inside the encrypted payload stays there.

#[cfg(feature = "audit-log")]
mod journal;

#[cfg(feature = "audit-log")]
pub use journal::{AuditEntry, Journal};

use std::fmt;
use std::path::Path;

use crate::vault::Generation;

/// Operations that leave an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    Add,
    Get,
    Delete,
    Migrate,
    Passwd,
    Export,
    Import,
    Destroy,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Add => "add",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Migrate => "migrate",
            Self::Passwd => "passwd",
            Self::Export => "export",
            Self::Import => "import",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit event, borrowed from the command that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub operation: Operation,
    pub vault: &'a Path,
    /// Generation of the vault after the operation, if it still parses.
    pub generation: Option<Generation>,
    /// Header-level fact only (KDF, generation change, copy path).
    pub detail: Option<&'a str>,
}

/// Append `event` to the journal next to its vault.
///
/// Never fails the caller: an unavailable journal is logged at debug level
/// and otherwise ignored. Without the `audit-log` feature this does nothing.
pub fn record(event: &Event<'_>) {
    #[cfg(feature = "audit-log")]
    {
        match Journal::open(vault_dir(event.vault)) {
            Some(journal) => journal.append(event),
            None => tracing::debug!(operation = %event.operation, "audit journal unavailable"),
        }
    }

    #[cfg(not(feature = "audit-log"))]
    let _ = event;
}

/// Directory holding `vault_path`, treating a bare file name as `.`.
pub fn vault_dir(vault_path: &Path) -> &Path {
    match vault_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_vault_name_uses_current_dir() {
        assert_eq!(vault_dir(Path::new("vault.dat")), Path::new("."));
        assert_eq!(vault_dir(Path::new("/srv/a/vault.dat")), Path::new("/srv/a"));
    }

    #[test]
    fn operation_names_are_stable() {
        assert_eq!(Operation::Migrate.to_string(), "migrate");
        assert_eq!(Operation::Passwd.as_str(), "passwd");
    }
}
