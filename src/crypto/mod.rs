//! Cryptographic primitives for passvault.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening with a detached tag (`encryption`)
//! - PBKDF2 / Argon2id password-based key derivation (`kdf`)
//! - The zeroizing derived key and HKDF pepper step (`keys`)
//! - Pepper file handling (`pepper`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod pepper;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use encryption::{open, seal, CipherSpec, Sealed};
pub use kdf::{derive_key, generate_salt, Argon2Params, KdfSpec, Pbkdf2Params};
pub use keys::DerivedKey;
pub use pepper::{generate_pepper_file, load_pepper_file, Pepper};
