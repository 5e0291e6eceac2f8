//! Vault file format, for both container generations.
//!
//! A vault file is a single JSON object.
//!
//! Generation 1 (legacy, no header binding):
//!
//! ```text
//! {"salt", "iterations", "nonce", "ciphertext", "tag"}
//! ```
//!
//! `iterations` is a PBKDF2-HMAC-SHA256 round count.
//!
//! Generation 2:
//!
//! ```text
//! {"format_version": 2, "cipher_spec", "kdf", "salt", "nonce",
//!  "ciphertext", "tag", "created_at", "header_aad_hash"}
//! ```
//!
//! All binary fields are standard base64 strings. In a generation-2
//! container the header values that feed the header hash (`cipher_spec`,
//! `kdf`, `created_at`) are kept exactly as read; they are interpreted only
//! after the hash has been checked, so an edit to them is reported as
//! tampering rather than as a parse failure.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::canonical::HeaderFields;
use crate::crypto::{CipherSpec, KdfSpec};
use crate::errors::{VaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `format_version` written by this build.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// Key whose presence marks a generation-2 container.
const FORMAT_VERSION_KEY: &str = "format_version";

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Container generation of a vault file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    V1,
    V2,
}

impl Generation {
    pub fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Generation-1 container. PascalCase names from the original producer
/// are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFileV1 {
    #[serde(
        alias = "Salt",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub salt: Vec<u8>,

    #[serde(alias = "Iterations")]
    pub iterations: u32,

    #[serde(
        alias = "Nonce",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub nonce: Vec<u8>,

    #[serde(
        alias = "Ciphertext",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub ciphertext: Vec<u8>,

    #[serde(
        alias = "Tag",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub tag: Vec<u8>,
}

impl VaultFileV1 {
    /// Generation 1 always means PBKDF2-HMAC-SHA256.
    pub fn kdf_spec(&self) -> KdfSpec {
        KdfSpec::pbkdf2(self.iterations)
    }
}

/// Generation-2 container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFileV2 {
    pub format_version: u32,

    /// Raw `cipher_spec` object; see [`VaultFileV2::cipher_spec`].
    pub cipher_spec: Value,

    /// Raw `kdf` object; see [`VaultFileV2::kdf_spec`].
    pub kdf: Value,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub tag: Vec<u8>,

    /// RFC 3339 text exactly as stored.
    pub created_at: String,

    /// SHA-256 of the canonical header. A missing hash reads as empty and
    /// fails verification.
    #[serde(
        default,
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub header_aad_hash: Vec<u8>,
}

impl VaultFileV2 {
    /// The fields bound by the header hash and the AEAD associated data.
    pub fn header(&self) -> HeaderFields<'_> {
        HeaderFields {
            format_version: self.format_version,
            cipher_spec: &self.cipher_spec,
            kdf: &self.kdf,
            salt: &self.salt,
            nonce: &self.nonce,
            created_at: &self.created_at,
        }
    }

    /// Interpret the stored KDF spec.
    pub fn kdf_spec(&self) -> Result<KdfSpec> {
        KdfSpec::from_json(&self.kdf)
    }

    /// Interpret the stored cipher spec, rejecting anything but AES-256-GCM.
    pub fn cipher_spec(&self) -> Result<CipherSpec> {
        let spec: CipherSpec = serde_json::from_value(self.cipher_spec.clone())
            .map_err(|e| VaultError::CorruptVault(format!("cipher_spec: {e}")))?;
        spec.ensure_supported()?;
        Ok(spec)
    }

    /// Parse the stored creation timestamp.
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| VaultError::CorruptVault(format!("created_at: {e}")))
    }
}

/// A parsed vault file.
#[derive(Debug, Clone)]
pub enum Container {
    V1(VaultFileV1),
    V2(VaultFileV2),
}

impl Container {
    pub fn generation(&self) -> Generation {
        match self {
            Self::V1(_) => Generation::V1,
            Self::V2(_) => Generation::V2,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse and classify raw vault bytes.
///
/// Classification is explicit and ordered:
///
/// 1. the bytes must be a JSON object;
/// 2. if it has a `format_version` key it must be a complete generation-2
///    container with `format_version == 2`;
/// 3. otherwise it must be a complete generation-1 container.
///
/// Anything else is `CorruptVault`. A damaged generation-2 file is never
/// retried as generation 1.
pub fn parse(raw: &[u8]) -> Result<Container> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| VaultError::CorruptVault(format!("not valid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(VaultError::CorruptVault(
            "top-level value is not a JSON object".into(),
        ));
    };

    if object.contains_key(FORMAT_VERSION_KEY) {
        let v2: VaultFileV2 = serde_json::from_value(value)
            .map_err(|e| VaultError::CorruptVault(format!("generation 2 container: {e}")))?;
        if v2.format_version != CURRENT_FORMAT_VERSION {
            return Err(VaultError::CorruptVault(format!(
                "unsupported format_version {}, expected {CURRENT_FORMAT_VERSION}",
                v2.format_version
            )));
        }
        tracing::debug!("classified vault as generation 2");
        return Ok(Container::V2(v2));
    }

    let v1: VaultFileV1 = serde_json::from_value(value)
        .map_err(|e| VaultError::CorruptVault(format!("generation 1 container: {e}")))?;
    tracing::debug!(iterations = v1.iterations, "classified vault as generation 1");
    Ok(Container::V1(v1))
}

/// Serialize a container to the bytes written to disk.
pub fn serialize(container: &Container) -> Result<Vec<u8>> {
    let bytes = match container {
        Container::V1(v1) => serde_json::to_vec(v1),
        Container::V2(v2) => serde_json::to_vec(v2),
    };
    bytes.map_err(|e| VaultError::SerializationError(format!("container: {e}")))
}

/// Read and parse the vault file at `path`.
pub fn read_container(path: &Path) -> Result<Container> {
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path.to_path_buf()));
    }
    let raw = fs::read(path)?;
    parse(&raw)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
