//! Canonical encoding of the generation-2 vault header.
//!
//! The same byte string has to be rebuilt by whoever opens the vault, from
//! nothing but the stored header, so the encoding is fully deterministic:
//!
//! - compact JSON, no whitespace;
//! - object keys sorted bytewise at every depth;
//! - `null` members omitted;
//! - binary fields as standard base64;
//! - `created_at` copied verbatim as the stored RFC 3339 text.
//!
//! Each save encodes the header twice. With an empty nonce it becomes the
//! AEAD associated data (the real nonce does not exist until `seal` runs).
//! With the real nonce it is hashed into `header_aad_hash`, which lets a
//! reader reject an edited header before doing any key derivation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{VaultError, Result};

/// Length of `header_aad_hash` (SHA-256).
pub const HEADER_HASH_LEN: usize = 32;

/// The header fields that are bound into the AEAD tag and the header hash.
///
/// Everything in a generation-2 container except `ciphertext`, `tag` and
/// the hash itself.
#[derive(Debug, Clone, Copy)]
pub struct HeaderFields<'a> {
    pub format_version: u32,
    pub cipher_spec: &'a Value,
    pub kdf: &'a Value,
    pub salt: &'a [u8],
    pub nonce: &'a [u8],
    pub created_at: &'a str,
}

impl HeaderFields<'_> {
    /// Associated data for `seal`/`open`: the canonical header with the
    /// nonce left empty.
    pub fn associated_data(&self) -> Result<Vec<u8>> {
        encode(&HeaderFields { nonce: &[], ..*self })
    }

    /// SHA-256 of the canonical header including the real nonce.
    pub fn digest(&self) -> Result<[u8; HEADER_HASH_LEN]> {
        let bytes = encode(self)?;
        let mut out = [0u8; HEADER_HASH_LEN];
        out.copy_from_slice(&Sha256::digest(&bytes));
        Ok(out)
    }

    /// Compare the recomputed digest with the stored one in constant time.
    ///
    /// A missing or mismatching hash is `HeaderTamper`.
    pub fn verify(&self, stored_hash: &[u8]) -> Result<()> {
        if stored_hash.len() != HEADER_HASH_LEN {
            return Err(VaultError::HeaderTamper);
        }
        let actual = self.digest()?;
        if bool::from(actual[..].ct_eq(stored_hash)) {
            Ok(())
        } else {
            Err(VaultError::HeaderTamper)
        }
    }
}

/// Encode header fields into their canonical byte form.
pub fn encode(fields: &HeaderFields<'_>) -> Result<Vec<u8>> {
    let value = json!({
        "format_version": fields.format_version,
        "cipher_spec": fields.cipher_spec,
        "kdf": fields.kdf,
        "salt": BASE64.encode(fields.salt),
        "nonce": BASE64.encode(fields.nonce),
        "created_at": fields.created_at,
    });

    let mut out = Vec::with_capacity(256);
    write_canonical(&value, &mut out)?;
    Ok(out)
}

/// Render a timestamp the way vault headers store it:
/// RFC 3339, millisecond precision, numeric offset (`+00:00`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, false)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            members.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(&Value::String(key.clone()), out)?;
                out.push(b':');
                write_canonical(member, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    serde_json::to_writer(&mut *out, value)
        .map_err(|e| VaultError::SerializationError(format!("canonical header: {e}")))
}
