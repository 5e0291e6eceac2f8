//! High-level vault operations.
//!
//! `VaultService` ties the codec, the crypto layer and the durable writer
//! together behind `create` / `load` / `save` / `migrate` /
//! `detect_generation`. It keeps no decrypted state between calls: `load`
//! hands the record set to the caller, and the caller hands it back to
//! `save`. Keys and plaintext buffers live only inside one call.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::crypto::encryption::{open, seal};
use crate::crypto::kdf::{derive_key, generate_salt};
use crate::crypto::{CipherSpec, KdfSpec, Pepper};
use crate::errors::{VaultError, Result};

use super::canonical::{format_timestamp, HeaderFields};
use super::format::{
    self, Container, Generation, VaultFileV1, VaultFileV2, CURRENT_FORMAT_VERSION,
};
use super::policy::VaultPolicy;
use super::record::RecordSet;
use super::writer;

/// Public header facts about a vault, readable without the passphrase.
#[derive(Debug, Clone)]
pub struct VaultInfo {
    pub generation: Generation,
    pub kdf: KdfSpec,
    /// Only generation 2 records a creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the stored header hash matches the header (generation 2).
    pub header_intact: bool,
}

/// How the next save will be written.
enum SaveTarget {
    Legacy { iterations: u32 },
    Current { kdf: KdfSpec, created_at: String },
}

/// Handle on one vault file.
pub struct VaultService {
    /// Path to the vault file on disk.
    path: PathBuf,

    policy: VaultPolicy,

    /// Optional out-of-band secret mixed into every derived key.
    pepper: Option<Pepper>,
}

impl VaultService {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn new(path: impl Into<PathBuf>, policy: VaultPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            pepper: None,
        }
    }

    /// Mix `pepper` into every key this service derives.
    pub fn with_pepper(mut self, pepper: Pepper) -> Self {
        self.pepper = Some(pepper);
        self
    }

    // ------------------------------------------------------------------
    // Engine operations
    // ------------------------------------------------------------------

    /// Create a new, empty vault protected by `passphrase`.
    ///
    /// The passphrase is checked against the policy before any key
    /// derivation, and an existing file is never overwritten.
    pub fn create(&self, passphrase: &str) -> Result<()> {
        self.policy.check_passphrase(passphrase)?;

        if self.path.exists() {
            return Err(VaultError::VaultAlreadyExists(self.path.clone()));
        }

        let created_at = format_timestamp(&Utc::now());
        self.write_current(
            passphrase,
            &RecordSet::new(),
            &self.policy.recommended_kdf,
            created_at,
        )?;

        tracing::info!(path = %self.path.display(), "vault created");
        Ok(())
    }

    /// Decrypt the vault and return its record set.
    ///
    /// Every failure is reported with its specific kind (`CorruptVault`,
    /// `HeaderTamper`, `AuthenticationFailure`, ...). Anything shown to a
    /// user should go through [`VaultError::into_unlock_failure`] first.
    pub fn load(&self, passphrase: &str) -> Result<RecordSet> {
        let container = format::read_container(&self.path)?;

        let plaintext = match &container {
            Container::V1(v1) => self.open_legacy(passphrase, v1)?,
            Container::V2(v2) => self.open_current(passphrase, v2)?,
        };

        // serde errors can quote payload text, so the detail is dropped.
        serde_json::from_slice(&plaintext).map_err(|_| {
            VaultError::CorruptVault("decrypted payload is not a valid record set".into())
        })
    }

    /// Encrypt and write `records`, replacing the vault file atomically.
    ///
    /// - With `kdf`, or when no vault exists yet, a generation-2 container
    ///   is written with that (or the recommended) KDF.
    /// - An existing generation-2 vault keeps its KDF and creation time,
    ///   provided its header hash still verifies (`HeaderTamper` otherwise).
    /// - An existing generation-1 vault stays generation 1; only
    ///   [`VaultService::migrate`] or an explicit `kdf` upgrades it.
    ///
    /// Salt and nonce are fresh on every call. Returns the generation
    /// written.
    pub fn save(
        &self,
        passphrase: &str,
        records: &RecordSet,
        kdf: Option<KdfSpec>,
    ) -> Result<Generation> {
        let generation = match self.save_target(kdf)? {
            SaveTarget::Legacy { iterations } => {
                self.write_legacy(passphrase, records, iterations)?;
                Generation::V1
            }
            SaveTarget::Current { kdf, created_at } => {
                self.write_current(passphrase, records, &kdf, created_at)?;
                Generation::V2
            }
        };

        tracing::info!(generation = %generation, records = records.len(), "vault saved");
        Ok(generation)
    }

    /// Rewrite the vault as generation 2 with the recommended KDF,
    /// whatever generation it was before.
    pub fn migrate(&self, passphrase: &str, records: &RecordSet) -> Result<()> {
        let from = self.detect_generation().ok();
        let created_at = format_timestamp(&Utc::now());
        self.write_current(
            passphrase,
            records,
            &self.policy.recommended_kdf,
            created_at,
        )?;

        tracing::info!(
            from = from.map(Generation::number),
            kdf = %self.policy.recommended_kdf.describe(),
            "vault migrated to generation 2"
        );
        Ok(())
    }

    /// Report the container generation without deriving any key.
    pub fn detect_generation(&self) -> Result<Generation> {
        Ok(format::read_container(&self.path)?.generation())
    }

    // ------------------------------------------------------------------
    // Maintenance operations
    // ------------------------------------------------------------------

    /// Summarise the public header without deriving any key.
    pub fn inspect(&self) -> Result<VaultInfo> {
        match format::read_container(&self.path)? {
            Container::V1(v1) => Ok(VaultInfo {
                generation: Generation::V1,
                kdf: v1.kdf_spec(),
                created_at: None,
                header_intact: true,
            }),
            Container::V2(v2) => {
                let header_intact = v2.header().verify(&v2.header_aad_hash).is_ok();
                Ok(VaultInfo {
                    generation: Generation::V2,
                    kdf: v2.kdf_spec()?,
                    created_at: v2.created_at().ok(),
                    header_intact,
                })
            }
        }
    }

    /// Re-encrypt the vault under a new passphrase.
    ///
    /// The new passphrase must satisfy the policy; the generation follows
    /// the same rules as [`VaultService::save`].
    pub fn change_passphrase(&self, old: &str, new: &str) -> Result<Generation> {
        self.policy.check_passphrase(new)?;
        let records = self.load(old)?;
        self.save(new, &records, None)
    }

    /// Copy the vault file byte-for-byte to `dest`.
    pub fn export_to(&self, dest: &Path) -> Result<()> {
        if same_file(dest, &self.path) {
            return Err(VaultError::CommandFailed(
                "export destination is the vault itself".into(),
            ));
        }
        let bytes = self.read_raw()?;
        writer::write_atomic(dest, &bytes)?;

        tracing::info!(dest = %dest.display(), "vault exported");
        Ok(())
    }

    /// Replace the vault file with a byte-for-byte copy of `src`.
    ///
    /// The copy is not parsed; the next `load` decides whether it is a
    /// usable vault.
    pub fn import_from(&self, src: &Path) -> Result<()> {
        if !src.exists() {
            return Err(VaultError::VaultNotFound(src.to_path_buf()));
        }
        if same_file(src, &self.path) {
            return Err(VaultError::CommandFailed(
                "import source is the vault itself".into(),
            ));
        }
        let bytes = Zeroizing::new(fs::read(src)?);
        writer::write_atomic(&self.path, &bytes)?;

        tracing::info!(src = %src.display(), "vault imported");
        Ok(())
    }

    /// Delete the vault file.
    pub fn destroy(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(VaultError::VaultNotFound(self.path.clone()));
        }
        fs::remove_file(&self.path)?;

        tracing::info!(path = %self.path.display(), "vault destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &VaultPolicy {
        &self.policy
    }

    /// Returns `true` if the vault file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read_raw(&self) -> Result<Zeroizing<Vec<u8>>> {
        if !self.path.exists() {
            return Err(VaultError::VaultNotFound(self.path.clone()));
        }
        Ok(Zeroizing::new(fs::read(&self.path)?))
    }

    /// Decide the generation and KDF for the next save from the current
    /// header alone.
    fn save_target(&self, kdf: Option<KdfSpec>) -> Result<SaveTarget> {
        let existing = if self.path.exists() {
            Some(format::read_container(&self.path)?)
        } else {
            None
        };

        // Nothing from a generation-2 header is carried forward unless the
        // stored hash still covers it.
        if let Some(Container::V2(v2)) = &existing {
            v2.header().verify(&v2.header_aad_hash)?;
            v2.created_at()?;
        }

        let target = match (kdf, existing) {
            (Some(kdf), Some(Container::V2(v2))) => SaveTarget::Current {
                kdf,
                created_at: v2.created_at,
            },
            (Some(kdf), _) => SaveTarget::Current {
                kdf,
                created_at: format_timestamp(&Utc::now()),
            },
            (None, Some(Container::V2(v2))) => SaveTarget::Current {
                kdf: v2.kdf_spec()?,
                created_at: v2.created_at,
            },
            (None, Some(Container::V1(v1))) => SaveTarget::Legacy {
                iterations: v1.iterations,
            },
            (None, None) => SaveTarget::Current {
                kdf: self.policy.recommended_kdf.clone(),
                created_at: format_timestamp(&Utc::now()),
            },
        };
        Ok(target)
    }

    fn open_current(&self, passphrase: &str, v2: &VaultFileV2) -> Result<Zeroizing<Vec<u8>>> {
        // Header first: an edited header is rejected before any KDF work.
        let header = v2.header();
        header.verify(&v2.header_aad_hash)?;

        v2.cipher_spec()?;
        let kdf = v2.kdf_spec()?;
        let aad = header.associated_data()?;

        let key = derive_key(&kdf, passphrase.as_bytes(), &v2.salt, self.pepper.as_ref())?;
        open(key.as_bytes(), &v2.nonce, &v2.ciphertext, &v2.tag, &aad)
    }

    fn open_legacy(&self, passphrase: &str, v1: &VaultFileV1) -> Result<Zeroizing<Vec<u8>>> {
        let key = derive_key(
            &v1.kdf_spec(),
            passphrase.as_bytes(),
            &v1.salt,
            self.pepper.as_ref(),
        )?;
        open(key.as_bytes(), &v1.nonce, &v1.ciphertext, &v1.tag, &[])
    }

    fn write_current(
        &self,
        passphrase: &str,
        records: &RecordSet,
        kdf: &KdfSpec,
        created_at: String,
    ) -> Result<()> {
        let plaintext = serialize_records(records)?;
        let salt = generate_salt();
        let cipher_spec = serde_json::to_value(CipherSpec::default())
            .map_err(|e| VaultError::SerializationError(format!("cipher_spec: {e}")))?;
        let kdf_value = kdf.to_json()?;

        let mut header = HeaderFields {
            format_version: CURRENT_FORMAT_VERSION,
            cipher_spec: &cipher_spec,
            kdf: &kdf_value,
            salt: &salt,
            nonce: &[],
            created_at: &created_at,
        };
        let aad = header.associated_data()?;

        let sealed = {
            let key = derive_key(kdf, passphrase.as_bytes(), &salt, self.pepper.as_ref())?;
            seal(key.as_bytes(), &plaintext, &aad)?
        };

        header.nonce = &sealed.nonce;
        let header_aad_hash = header.digest()?.to_vec();

        let container = Container::V2(VaultFileV2 {
            format_version: CURRENT_FORMAT_VERSION,
            cipher_spec,
            kdf: kdf_value,
            salt: salt.to_vec(),
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
            created_at,
            header_aad_hash,
        });

        let bytes = format::serialize(&container)?;
        writer::write_atomic(&self.path, &bytes)
    }

    fn write_legacy(&self, passphrase: &str, records: &RecordSet, iterations: u32) -> Result<()> {
        let plaintext = serialize_records(records)?;
        let salt = generate_salt();

        let kdf = KdfSpec::pbkdf2(iterations);
        let sealed = {
            let key = derive_key(&kdf, passphrase.as_bytes(), &salt, self.pepper.as_ref())?;
            seal(key.as_bytes(), &plaintext, &[])?
        };

        let container = Container::V1(VaultFileV1 {
            salt: salt.to_vec(),
            iterations,
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
        });

        let bytes = format::serialize(&container)?;
        writer::write_atomic(&self.path, &bytes)
    }
}

fn serialize_records(records: &RecordSet) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::to_vec(records)
        .map(Zeroizing::new)
        .map_err(|e| VaultError::SerializationError(format!("record set: {e}")))
}

/// Best-effort check that two paths name the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
