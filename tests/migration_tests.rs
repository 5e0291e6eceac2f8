//! Integration tests for legacy (generation 1) vaults and migration.

use std::fs;
use std::path::{Path, PathBuf};

use passvault::crypto::kdf::MIN_PBKDF2_ITERATIONS;
use passvault::crypto::{derive_key, generate_salt, seal, KdfSpec};
use passvault::errors::VaultError;
use passvault::vault::format::{self, Container, VaultFileV1};
use passvault::vault::writer;
use passvault::vault::{Generation, VaultPolicy, VaultService};
use tempfile::TempDir;

const PASSPHRASE: &str = "Correct-Horse-42!";
const LEGACY_ITERATIONS: u32 = 210_000;

/// Payload as the original producer wrote it.
const LEGACY_PAYLOAD: &str = r#"{"Entries":[
    {"Name":"github","Username":"alice","Password":"s3cr3t","Notes":"work",
     "CreatedAt":"2024-03-01T10:00:00+00:00","UpdatedAt":"2024-03-02T11:30:00+00:00"},
    {"Name":"email","Username":"alice@example.com","Password":"hunter22","Notes":"",
     "CreatedAt":"2024-03-01T10:05:00+00:00","UpdatedAt":"2024-03-01T10:05:00+00:00"}
]}"#;

fn fast_policy() -> VaultPolicy {
    VaultPolicy {
        recommended_kdf: KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS),
        ..VaultPolicy::default()
    }
}

/// Helper: write a generation-1 vault the way the legacy format did:
/// PBKDF2-HMAC-SHA256, no associated data, no header hash.
fn write_legacy_vault(path: &Path, passphrase: &str, payload: &str) {
    let salt = generate_salt();
    let key = derive_key(
        &KdfSpec::pbkdf2(LEGACY_ITERATIONS),
        passphrase.as_bytes(),
        &salt,
        None,
    )
    .unwrap();
    let sealed = seal(key.as_bytes(), payload.as_bytes(), &[]).unwrap();

    let container = Container::V1(VaultFileV1 {
        salt: salt.to_vec(),
        iterations: LEGACY_ITERATIONS,
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
        tag: sealed.tag,
    });
    fs::write(path, format::serialize(&container).unwrap()).unwrap();
}

fn legacy_vault() -> (TempDir, PathBuf, VaultService) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.dat");
    write_legacy_vault(&path, PASSPHRASE, LEGACY_PAYLOAD);
    let service = VaultService::new(&path, fast_policy());
    (dir, path, service)
}

// ---------------------------------------------------------------------------
// Reading generation 1
// ---------------------------------------------------------------------------

#[test]
fn legacy_vault_is_detected_without_a_key() {
    let (_dir, _path, service) = legacy_vault();
    assert_eq!(service.detect_generation().unwrap(), Generation::V1);

    let info = service.inspect().unwrap();
    assert_eq!(info.kdf, KdfSpec::pbkdf2(LEGACY_ITERATIONS));
    assert!(info.created_at.is_none());
}

#[test]
fn legacy_vault_loads() {
    let (_dir, _path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();

    assert_eq!(records.len(), 2);
    let github = records.get("github").unwrap();
    assert_eq!(github.username, "alice");
    assert_eq!(github.secret, "s3cr3t");
    assert_eq!(github.notes, "work");
}

#[test]
fn legacy_vault_rejects_wrong_passphrase() {
    let (_dir, _path, service) = legacy_vault();
    let err = service.load("wrong").unwrap_err();
    assert!(matches!(err, VaultError::AuthenticationFailure));
    assert!(matches!(err.into_unlock_failure(), VaultError::UnlockFailed));
}

#[test]
fn plain_save_keeps_generation_one() {
    let (_dir, path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();
    let before = fs::read(&path).unwrap();

    let generation = service.save(PASSPHRASE, &records, None).unwrap();
    assert_eq!(generation, Generation::V1);
    assert_eq!(service.detect_generation().unwrap(), Generation::V1);
    assert_eq!(
        service.inspect().unwrap().kdf,
        KdfSpec::pbkdf2(LEGACY_ITERATIONS)
    );

    // Fresh salt and nonce even when the generation stays.
    assert_ne!(fs::read(&path).unwrap(), before);
    assert_eq!(service.load(PASSPHRASE).unwrap(), records);
}

#[test]
fn save_with_explicit_kdf_upgrades() {
    let (_dir, _path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();

    let spec = KdfSpec::pbkdf2(MIN_PBKDF2_ITERATIONS);
    let generation = service
        .save(PASSPHRASE, &records, Some(spec.clone()))
        .unwrap();
    assert_eq!(generation, Generation::V2);
    assert_eq!(service.inspect().unwrap().kdf, spec);
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

#[test]
fn migration_preserves_every_record() {
    let (_dir, _path, service) = legacy_vault();
    let before = service.load(PASSPHRASE).unwrap();

    service.migrate(PASSPHRASE, &before).unwrap();

    assert_eq!(service.detect_generation().unwrap(), Generation::V2);
    let after = service.load(PASSPHRASE).unwrap();
    assert_eq!(after, before);

    let info = service.inspect().unwrap();
    assert_eq!(info.kdf, fast_policy().recommended_kdf);
    assert!(info.created_at.is_some());
    assert!(info.header_intact);
}

#[test]
fn migration_writes_canonical_field_names() {
    let (_dir, path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();
    service.migrate(PASSPHRASE, &records).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(value["format_version"], 2);
    assert_eq!(value["cipher_spec"]["alg"], "aes-256-gcm");
    assert_eq!(value["kdf"]["type"], "pbkdf2");
    assert!(value.get("iterations").is_none());
}

#[test]
fn migrated_vault_rejects_wrong_passphrase() {
    let (_dir, _path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();
    service.migrate(PASSPHRASE, &records).unwrap();

    assert!(matches!(
        service.load("wrong"),
        Err(VaultError::AuthenticationFailure)
    ));
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn interrupted_write_leaves_the_old_vault_readable() {
    let (_dir, path, service) = legacy_vault();

    // Crash after the temp file is fully written but before the rename.
    let staged = writer::stage(&path, b"{\"partial\":").unwrap();
    assert!(staged.temp_path().exists());

    assert_eq!(service.detect_generation().unwrap(), Generation::V1);
    assert_eq!(service.load(PASSPHRASE).unwrap().len(), 2);

    staged.abort().unwrap();
}

#[test]
fn leftover_temp_file_does_not_block_the_next_save() {
    let (_dir, path, service) = legacy_vault();
    let records = service.load(PASSPHRASE).unwrap();

    // An abandoned temp file from a previous crash.
    let staged = writer::stage(&path, b"garbage").unwrap();
    let leftover = staged.temp_path().to_path_buf();
    drop(staged);

    service.migrate(PASSPHRASE, &records).unwrap();
    assert_eq!(service.load(PASSPHRASE).unwrap(), records);
    assert!(leftover.exists());
}
