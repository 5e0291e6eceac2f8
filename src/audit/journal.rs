//! SQLite journal behind the audit trail.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::Event;
use crate::errors::{Result, VaultError};

const DB_FILE_NAME: &str = "audit.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    at_ms       INTEGER NOT NULL,
    operation   TEXT NOT NULL,
    vault       TEXT NOT NULL,
    generation  INTEGER,
    detail      TEXT
);";

/// A stored audit event.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub at: DateTime<Utc>,
    pub operation: String,
    pub vault: String,
    pub generation: Option<u32>,
    pub detail: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let at_ms: i64 = row.get(1)?;
        let at = DateTime::from_timestamp_millis(at_ms)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, at_ms))?;

        Ok(Self {
            id: row.get(0)?,
            at,
            operation: row.get(2)?,
            vault: row.get(3)?,
            generation: row.get(4)?,
            detail: row.get(5)?,
        })
    }
}

/// Audit journal for the vaults in one directory.
pub struct Journal {
    conn: Connection,
}

impl Journal {
    /// Open (or create) `<vault_dir>/audit.db`.
    ///
    /// Returns `None` when the journal can't be opened.
    pub fn open(vault_dir: &Path) -> Option<Self> {
        let path = Self::path(vault_dir);
        create_owner_only(&path).ok()?;

        let conn = Connection::open(&path).ok()?;
        conn.execute_batch(SCHEMA).ok()?;
        Some(Self { conn })
    }

    pub fn path(vault_dir: &Path) -> PathBuf {
        vault_dir.join(DB_FILE_NAME)
    }

    /// Append one event. Failures are logged and dropped.
    pub fn append(&self, event: &Event<'_>) {
        let vault = event
            .vault
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let inserted = self.conn.execute(
            "INSERT INTO events (at_ms, operation, vault, generation, detail)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Utc::now().timestamp_millis(),
                event.operation.as_str(),
                vault,
                event.generation.map(|g| g.number()),
                event.detail,
            ],
        );
        if let Err(e) = inserted {
            tracing::debug!(error = %e, "audit insert failed");
        }
    }

    /// Most recent events first, at most `limit`, optionally only those at
    /// or after `since`.
    pub fn recent(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, at_ms, operation, vault, generation, detail
                 FROM events
                 WHERE ?1 IS NULL OR at_ms >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| VaultError::AuditError(format!("prepare: {e}")))?;

        let since_ms = since.map(|t| t.timestamp_millis());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let entries = stmt
            .query_map(params![since_ms, limit], AuditEntry::from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| VaultError::AuditError(format!("query: {e}")))?;
        Ok(entries)
    }
}

/// Make sure the journal file exists with owner-only permissions before
/// SQLite opens it.
fn create_owner_only(path: &Path) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map(drop)
}
