//! Credential records and the record set stored inside a vault.
//!
//! The record set is the only plaintext structure the storage engine
//! produces or accepts. It is serialized to JSON as
//! `{"entries": [...]}` and that JSON is what gets encrypted.
//! Older vaults written by the original producer use PascalCase field
//! names (`Entries`, `Name`, `Password`, ...); those are accepted on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{VaultError, Result};

/// Longest record name accepted.
const MAX_NAME_LEN: usize = 256;

/// A single credential.
///
/// Every text field is wiped from memory when the record is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Record {
    /// Unique (case-insensitive) name, e.g. "github".
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Username")]
    pub username: String,

    /// The secret itself, plaintext while in memory.
    #[serde(alias = "Password", alias = "Secret")]
    pub secret: String,

    #[serde(default, alias = "Notes")]
    pub notes: String,

    #[zeroize(skip)]
    #[serde(alias = "CreatedAt")]
    pub created_at: DateTime<Utc>,

    #[zeroize(skip)]
    #[serde(alias = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time.
    pub fn new(name: &str, username: &str, secret: &str, notes: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            username: username.to_string(),
            secret: secret.to_string(),
            notes: notes.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record answers to `name` (ASCII case-insensitive).
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }

    /// Metadata view without the secret.
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            name: self.name.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("notes", &self.notes)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Lightweight metadata about a record (no secret, no notes).
///
/// Returned by `RecordSet::list` so callers can display names and
/// timestamps without copying any secret.
#[derive(Debug, Clone)]
pub struct RecordMetadata {
    pub name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`RecordSet::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
}

/// The collection of records held in one vault, unique by
/// case-insensitive name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Payload")]
pub struct RecordSet {
    entries: Vec<Record>,
}

/// On-disk shape of the decrypted payload.
#[derive(Deserialize)]
struct Payload {
    #[serde(default, alias = "Entries")]
    entries: Vec<Record>,
}

impl From<Payload> for RecordSet {
    /// Later duplicates replace earlier ones so the set stays unique.
    fn from(payload: Payload) -> Self {
        let mut set = Self::default();
        for record in payload.entries {
            match set.position(&record.name) {
                Some(i) => set.entries[i] = record,
                None => set.entries.push(record),
            }
        }
        set
    }
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, or update the existing one with the same name.
    ///
    /// An update keeps the stored name spelling and `created_at`, takes
    /// the new username, secret and notes, and bumps `updated_at`.
    pub fn upsert(&mut self, mut record: Record) -> Result<Upsert> {
        validate_name(&record.name)?;
        record.name = record.name.trim().to_string();

        match self.position(&record.name) {
            Some(i) => {
                let existing = &mut self.entries[i];
                existing.username = std::mem::take(&mut record.username);
                existing.secret.zeroize();
                existing.secret = std::mem::take(&mut record.secret);
                existing.notes = std::mem::take(&mut record.notes);
                existing.updated_at = Utc::now();
                Ok(Upsert::Updated)
            }
            None => {
                self.entries.push(record);
                Ok(Upsert::Added)
            }
        }
    }

    /// Look a record up by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.entries.iter().find(|r| r.matches(name))
    }

    /// Remove a record by name (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Result<Record> {
        match self.position(name) {
            Some(i) => Ok(self.entries.remove(i)),
            None => Err(VaultError::RecordNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter()
    }

    /// Metadata for all records, sorted by name (case-insensitive).
    pub fn list(&self) -> Vec<RecordMetadata> {
        let mut list: Vec<RecordMetadata> = self.entries.iter().map(Record::metadata).collect();
        list.sort_by_key(|m| m.name.to_ascii_lowercase());
        list
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|r| r.matches(name))
    }
}

/// Validate that a record name is usable.
///
/// Must be non-empty after trimming and at most 256 bytes.
fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(VaultError::CommandFailed(
            "record name cannot be empty".into(),
        ));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(VaultError::CommandFailed(format!(
            "record name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(VaultError::CommandFailed(format!(
            "record name '{}' contains control characters",
            trimmed.escape_debug()
        )));
    }
    Ok(())
}
