//! Password-based key derivation.
//!
//! A vault records which KDF produced its key as a [`KdfSpec`]: exactly one
//! of PBKDF2-HMAC-SHA256 or Argon2id, each with its own cost parameters.
//! The spec is read back from an untrusted file, so every parameter is
//! checked against a floor before any work is done. A corrupted or
//! downgraded header can make unlocking fail but never cheaper.

use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::{apply_pepper, DerivedKey, KEY_LEN};
use super::pepper::Pepper;
use crate::errors::{VaultError, Result};

/// Length of a freshly generated salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Shortest salt accepted from a vault file.
const MIN_SALT_LEN: usize = 8;

/// PBKDF2 iteration floor. Stored specs asking for fewer are rejected.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum safe Argon2 memory cost in MiB (8 MB).
const MIN_ARGON2_MEMORY_MB: u32 = 8;

/// The only PBKDF2 PRF this build understands.
const PBKDF2_HASH_SHA256: &str = "sha256";

/// PBKDF2 parameters as stored in a vault header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    pub iterations: u32,
    pub hash: String,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: 600_000,
            hash: PBKDF2_HASH_SHA256.to_string(),
        }
    }
}

/// Argon2id parameters as stored in a vault header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in MiB (default: 128).
    pub memory_mb: u32,
    /// Number of passes (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 2).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_mb: 128,
            iterations: 3,
            parallelism: 2,
        }
    }
}

impl Argon2Params {
    /// Memory cost in KiB, the unit the Argon2 implementation takes.
    pub fn memory_kib(&self) -> Result<u32> {
        self.memory_mb.checked_mul(1024).ok_or_else(|| {
            VaultError::KeyDerivationFailed(format!(
                "Argon2 memory_mb {} is too large",
                self.memory_mb
            ))
        })
    }
}

/// Which KDF protects a vault, with its parameters.
///
/// On disk this is `{"type": "...", "<block>": {...}}` with exactly one
/// parameter block present and matching `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KdfSpecRepr", into = "KdfSpecRepr")]
pub enum KdfSpec {
    Pbkdf2(Pbkdf2Params),
    Argon2id(Argon2Params),
}

impl Default for KdfSpec {
    fn default() -> Self {
        Self::Pbkdf2(Pbkdf2Params::default())
    }
}

impl KdfSpec {
    /// Build a PBKDF2-HMAC-SHA256 spec with the given iteration count.
    pub fn pbkdf2(iterations: u32) -> Self {
        Self::Pbkdf2(Pbkdf2Params {
            iterations,
            hash: PBKDF2_HASH_SHA256.to_string(),
        })
    }

    /// The `type` tag written to disk.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pbkdf2(_) => "pbkdf2",
            Self::Argon2id(_) => "argon2id",
        }
    }

    /// Short human-readable description, e.g. `pbkdf2-sha256 (600000 iterations)`.
    pub fn describe(&self) -> String {
        match self {
            Self::Pbkdf2(p) => format!("pbkdf2-{} ({} iterations)", p.hash, p.iterations),
            Self::Argon2id(p) => format!(
                "argon2id ({} MiB, {} passes, {} lanes)",
                p.memory_mb, p.iterations, p.parallelism
            ),
        }
    }

    /// Interpret the raw `kdf` value of a vault header.
    ///
    /// A structurally malformed value is `CorruptVault`; a well-formed
    /// value naming an algorithm this build does not know is
    /// `UnsupportedKdf`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let repr: KdfSpecRepr = serde_json::from_value(value.clone())
            .map_err(|e| VaultError::CorruptVault(format!("kdf: {e}")))?;
        Self::try_from(repr)
    }

    /// Render the spec as the JSON value stored in a vault header.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| VaultError::SerializationError(format!("kdf: {e}")))
    }
}

/// Wire shape of [`KdfSpec`]: a type tag plus two optional blocks.
#[derive(Serialize, Deserialize)]
struct KdfSpecRepr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    argon2: Option<Argon2Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pbkdf2: Option<Pbkdf2Params>,
}

impl TryFrom<KdfSpecRepr> for KdfSpec {
    type Error = VaultError;

    fn try_from(repr: KdfSpecRepr) -> Result<Self> {
        match (repr.kind.as_str(), repr.pbkdf2, repr.argon2) {
            ("pbkdf2", Some(p), None) => Ok(Self::Pbkdf2(p)),
            ("argon2id", None, Some(a)) => Ok(Self::Argon2id(a)),
            ("pbkdf2" | "argon2id", Some(_), Some(_)) => Err(VaultError::CorruptVault(
                "kdf has both pbkdf2 and argon2 parameter blocks".into(),
            )),
            ("pbkdf2" | "argon2id", _, _) => Err(VaultError::CorruptVault(format!(
                "kdf type '{}' has no matching parameter block",
                repr.kind
            ))),
            (other, _, _) => Err(VaultError::UnsupportedKdf(other.to_string())),
        }
    }
}

impl From<KdfSpec> for KdfSpecRepr {
    fn from(spec: KdfSpec) -> Self {
        let kind = spec.kind().to_string();
        match spec {
            KdfSpec::Pbkdf2(p) => Self {
                kind,
                argon2: None,
                pbkdf2: Some(p),
            },
            KdfSpec::Argon2id(a) => Self {
                kind,
                argon2: Some(a),
                pbkdf2: None,
            },
        }
    }
}

/// Derive the 32-byte vault key from a passphrase.
///
/// When a pepper is supplied the raw KDF output is run through an
/// HKDF extract-then-expand step keyed by the pepper. No randomness is
/// involved: the same inputs always give the same key.
pub fn derive_key(
    spec: &KdfSpec,
    passphrase: &[u8],
    salt: &[u8],
    pepper: Option<&Pepper>,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(VaultError::KeyDerivationFailed(format!(
            "salt must be at least {MIN_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }

    tracing::debug!(kdf = %spec.describe(), peppered = pepper.is_some(), "deriving vault key");

    let mut raw = match spec {
        KdfSpec::Pbkdf2(params) => derive_pbkdf2(passphrase, salt, params)?,
        KdfSpec::Argon2id(params) => derive_argon2id(passphrase, salt, params)?,
    };

    let key = match pepper {
        Some(p) => apply_pepper(&raw, p),
        None => Ok(DerivedKey::new(raw)),
    };
    raw.zeroize();
    key
}

fn derive_pbkdf2(passphrase: &[u8], salt: &[u8], params: &Pbkdf2Params) -> Result<[u8; KEY_LEN]> {
    if params.hash != PBKDF2_HASH_SHA256 {
        return Err(VaultError::UnsupportedKdf(format!("pbkdf2-{}", params.hash)));
    }
    if params.iterations < MIN_PBKDF2_ITERATIONS {
        return Err(VaultError::KeyDerivationFailed(format!(
            "PBKDF2 iterations must be at least {MIN_PBKDF2_ITERATIONS} (got {})",
            params.iterations
        )));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, params.iterations, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("PBKDF2 failed: {e}")))?;
    Ok(key)
}

#[cfg(feature = "argon2id")]
fn derive_argon2id(
    passphrase: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    use argon2::{Algorithm, Argon2, Params, Version};

    if params.memory_mb < MIN_ARGON2_MEMORY_MB {
        return Err(VaultError::KeyDerivationFailed(format!(
            "Argon2 memory_mb must be at least {MIN_ARGON2_MEMORY_MB} (got {})",
            params.memory_mb
        )));
    }
    if params.iterations < 1 {
        return Err(VaultError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if params.parallelism < 1 {
        return Err(VaultError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let argon2_params = Params::new(
        params.memory_kib()?,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

#[cfg(not(feature = "argon2id"))]
fn derive_argon2id(
    _passphrase: &[u8],
    _salt: &[u8],
    _params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    Err(VaultError::UnsupportedKdf(
        "argon2id support not compiled into this build".into(),
    ))
}

/// Generate a cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SALT: &[u8] = b"0123456789abcdef";

    #[test]
    fn pbkdf2_is_deterministic() {
        let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS);
        let a = derive_key(&spec, b"passphrase", SALT, None).unwrap();
        let b = derive_key(&spec, b"passphrase", SALT, None).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn pbkdf2_matches_plain_hmac_sha256() {
        let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS);
        let key = derive_key(&spec, b"passwd", b"saltsalt", None).unwrap();

        let mut expected = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"passwd", b"saltsalt", MIN_PBKDF2_ITERATIONS, &mut expected);
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn pbkdf2_below_floor_is_rejected() {
        let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS - 1);
        let err = derive_key(&spec, b"passphrase", SALT, None).unwrap_err();
        assert!(matches!(err, VaultError::KeyDerivationFailed(_)));
    }

    #[test]
    fn pbkdf2_unknown_hash_is_unsupported() {
        let spec = KdfSpec::Pbkdf2(Pbkdf2Params {
            iterations: MIN_PBKDF2_ITERATIONS,
            hash: "md5".into(),
        });
        let err = derive_key(&spec, b"passphrase", SALT, None).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedKdf(_)));
    }

    #[test]
    fn short_salt_is_rejected() {
        let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS);
        assert!(derive_key(&spec, b"passphrase", b"abc", None).is_err());
    }

    #[test]
    fn different_salts_give_different_keys() {
        let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS);
        let a = derive_key(&spec, b"passphrase", b"salt-one", None).unwrap();
        let b = derive_key(&spec, b"passphrase", b"salt-two", None).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[cfg(feature = "argon2id")]
    #[test]
    fn argon2id_is_deterministic() {
        let spec = KdfSpec::Argon2id(Argon2Params {
            memory_mb: 8,
            iterations: 1,
            parallelism: 1,
        });
        let a = derive_key(&spec, b"passphrase", SALT, None).unwrap();
        let b = derive_key(&spec, b"passphrase", SALT, None).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[cfg(feature = "argon2id")]
    #[test]
    fn argon2id_below_memory_floor_is_rejected() {
        let spec = KdfSpec::Argon2id(Argon2Params {
            memory_mb: 1,
            iterations: 1,
            parallelism: 1,
        });
        let err = derive_key(&spec, b"passphrase", SALT, None).unwrap_err();
        assert!(matches!(err, VaultError::KeyDerivationFailed(_)));
    }

    #[cfg(not(feature = "argon2id"))]
    #[test]
    fn argon2id_without_feature_is_unsupported() {
        let spec = KdfSpec::Argon2id(Argon2Params::default());
        let err = derive_key(&spec, b"passphrase", SALT, None).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedKdf(_)));
    }

    #[test]
    fn spec_serializes_as_tagged_block() {
        let value = KdfSpec::default().to_json().unwrap();
        assert_eq!(
            value,
            json!({"type": "pbkdf2", "pbkdf2": {"iterations": 600000, "hash": "sha256"}})
        );

        let argon = KdfSpec::Argon2id(Argon2Params::default()).to_json().unwrap();
        assert_eq!(
            argon,
            json!({"type": "argon2id", "argon2": {"memory_mb": 128, "iterations": 3, "parallelism": 2}})
        );
    }

    #[test]
    fn spec_parses_back_from_json() {
        let value = json!({"type": "argon2id", "argon2": {"memory_mb": 64, "iterations": 2, "parallelism": 4}});
        let spec = KdfSpec::from_json(&value).unwrap();
        assert_eq!(
            spec,
            KdfSpec::Argon2id(Argon2Params {
                memory_mb: 64,
                iterations: 2,
                parallelism: 4
            })
        );
    }

    #[test]
    fn spec_with_both_blocks_is_rejected() {
        let value = json!({
            "type": "pbkdf2",
            "pbkdf2": {"iterations": 600000, "hash": "sha256"},
            "argon2": {"memory_mb": 64, "iterations": 2, "parallelism": 4}
        });
        assert!(matches!(
            KdfSpec::from_json(&value),
            Err(VaultError::CorruptVault(_))
        ));
    }

    #[test]
    fn spec_with_no_block_is_rejected() {
        let value = json!({"type": "argon2id"});
        assert!(matches!(
            KdfSpec::from_json(&value),
            Err(VaultError::CorruptVault(_))
        ));
    }

    #[test]
    fn spec_with_mismatched_block_is_rejected() {
        let value = json!({"type": "argon2id", "pbkdf2": {"iterations": 600000, "hash": "sha256"}});
        assert!(matches!(
            KdfSpec::from_json(&value),
            Err(VaultError::CorruptVault(_))
        ));
    }

    #[test]
    fn unknown_kdf_type_is_unsupported() {
        let value = json!({"type": "scrypt", "scrypt": {"n": 16384}});
        assert!(matches!(
            KdfSpec::from_json(&value),
            Err(VaultError::UnsupportedKdf(_))
        ));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
