//! Vault module: the storage engine.
//!
//! This module provides:
//! - Credential records and the record set (`record`)
//! - Canonical header encoding and the header hash (`canonical`)
//! - Both container generations and their classification (`format`)
//! - Crash-safe owner-only file replacement (`writer`)
//! - The passphrase/KDF policy value (`policy`)
//! - High-level `VaultService` for create, load, save and migrate (`service`)

pub mod canonical;
pub mod format;
pub mod policy;
pub mod record;
pub mod service;
pub mod writer;

// Re-export the most commonly used items.
pub use format::{Container, Generation};
pub use policy::VaultPolicy;
pub use record::{Record, RecordMetadata, RecordSet, Upsert};
pub use service::{VaultInfo, VaultService};
