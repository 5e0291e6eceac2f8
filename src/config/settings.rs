use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::{Argon2Params, KdfSpec, Pbkdf2Params};
use crate::errors::{VaultError, Result};
use crate::vault::policy::DEFAULT_MIN_PASSPHRASE_LEN;
use crate::vault::VaultPolicy;

/// Which key derivation function new vaults use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KdfChoice {
    Pbkdf2,
    Argon2id,
}

/// Tool configuration, loaded from `.passvault.toml`.
///
/// Every field has a sensible default so passvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Vault file, relative to the working directory unless absolute.
    #[serde(default = "default_vault_path")]
    pub vault_path: String,

    /// KDF for new vaults and migrations.
    #[serde(default = "default_kdf")]
    pub kdf: KdfChoice,

    /// PBKDF2-HMAC-SHA256 round count (default: 600 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Argon2id memory cost in MiB (default: 128).
    #[serde(default = "default_argon2_memory_mb")]
    pub argon2_memory_mb: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2id parallelism degree (default: 2).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    #[serde(default = "default_min_passphrase_length")]
    pub min_passphrase_length: usize,

    /// Optional pepper file mixed into every derived key.
    #[serde(default)]
    pub pepper_file: Option<String>,

    /// How many times an interactive unlock may be retried.
    #[serde(default = "default_max_unlock_attempts")]
    pub max_unlock_attempts: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_path() -> String {
    "vault.dat".to_string()
}

fn default_kdf() -> KdfChoice {
    KdfChoice::Pbkdf2
}

fn default_pbkdf2_iterations() -> u32 {
    Pbkdf2Params::default().iterations
}

fn default_argon2_memory_mb() -> u32 {
    Argon2Params::default().memory_mb
}

fn default_argon2_iterations() -> u32 {
    Argon2Params::default().iterations
}

fn default_argon2_parallelism() -> u32 {
    Argon2Params::default().parallelism
}

fn default_min_passphrase_length() -> usize {
    DEFAULT_MIN_PASSPHRASE_LEN
}

fn default_max_unlock_attempts() -> u32 {
    3
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            kdf: default_kdf(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            argon2_memory_mb: default_argon2_memory_mb(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            min_passphrase_length: default_min_passphrase_length(),
            pepper_file: None,
            max_unlock_attempts: default_max_unlock_attempts(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".passvault.toml";

    /// Load settings from `<dir>/.passvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.max_unlock_attempts == 0 {
            return Err(VaultError::ConfigError(
                "max_unlock_attempts must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Resolve the vault file path against `dir`.
    pub fn vault_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.vault_path)
    }

    /// Resolve the pepper file path against `dir`, if one is configured.
    pub fn pepper_path(&self, dir: &Path) -> Option<PathBuf> {
        self.pepper_file.as_ref().map(|p| dir.join(p))
    }

    /// The KDF spec for `choice` using the configured costs.
    pub fn kdf_spec(&self, choice: KdfChoice) -> KdfSpec {
        match choice {
            KdfChoice::Pbkdf2 => KdfSpec::pbkdf2(self.pbkdf2_iterations),
            KdfChoice::Argon2id => KdfSpec::Argon2id(Argon2Params {
                memory_mb: self.argon2_memory_mb,
                iterations: self.argon2_iterations,
                parallelism: self.argon2_parallelism,
            }),
        }
    }

    /// Build the policy handed to the vault service.
    pub fn policy(&self) -> VaultPolicy {
        VaultPolicy {
            recommended_kdf: self.kdf_spec(self.kdf),
            min_passphrase_len: self.min_passphrase_length,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_path, "vault.dat");
        assert_eq!(s.kdf, KdfChoice::Pbkdf2);
        assert_eq!(s.pbkdf2_iterations, 600_000);
        assert_eq!(s.argon2_memory_mb, 128);
        assert_eq!(s.min_passphrase_length, 12);
        assert_eq!(s.max_unlock_attempts, 3);
        assert!(s.pepper_file.is_none());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_path, "vault.dat");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_path = "secrets/main.vault"
kdf = "argon2id"
argon2_memory_mb = 64
argon2_iterations = 4
argon2_parallelism = 1
min_passphrase_length = 16
pepper_file = "pepper.bin"
max_unlock_attempts = 5
"#;
        fs::write(tmp.path().join(".passvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_path, "secrets/main.vault");
        assert_eq!(settings.kdf, KdfChoice::Argon2id);
        assert_eq!(settings.min_passphrase_length, 16);
        assert_eq!(settings.max_unlock_attempts, 5);
        assert_eq!(
            settings.pepper_path(tmp.path()),
            Some(tmp.path().join("pepper.bin"))
        );
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "pbkdf2_iterations = 300000\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.pbkdf2_iterations, 300_000);
        // Rest should be defaults
        assert_eq!(settings.vault_path, "vault.dat");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "not valid {{toml").unwrap();

        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn load_errors_on_unknown_kdf() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "kdf = \"scrypt\"\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn zero_unlock_attempts_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "max_unlock_attempts = 0\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn policy_follows_kdf_choice() {
        let s = Settings {
            kdf: KdfChoice::Argon2id,
            argon2_memory_mb: 32,
            ..Settings::default()
        };
        let policy = s.policy();
        assert_eq!(policy.min_passphrase_len, 12);
        assert_eq!(
            policy.recommended_kdf,
            KdfSpec::Argon2id(Argon2Params {
                memory_mb: 32,
                iterations: 3,
                parallelism: 2,
            })
        );

        let s = Settings::default();
        assert_eq!(s.policy().recommended_kdf, KdfSpec::pbkdf2(600_000));
    }

    #[test]
    fn vault_path_resolves_against_dir() {
        let s = Settings::default();
        let dir = Path::new("/home/user");
        assert_eq!(s.vault_path(dir), PathBuf::from("/home/user/vault.dat"));
    }
}
