//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::audit::{Event, Operation};
use crate::config::{KdfChoice, Settings};
use crate::crypto::load_pepper_file;
use crate::errors::{VaultError, Result};
use crate::vault::{RecordSet, VaultPolicy, VaultService};

/// Environment variable holding the vault passphrase for scripted use.
pub const PASSWORD_ENV: &str = "PASSVAULT_PASSWORD";

/// passvault CLI: local encrypted password vault.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Local encrypted password vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: vault_path from .passvault.toml, else vault.dat)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Pepper file mixed into the key (overrides pepper_file in config)
    #[arg(long, global = true)]
    pub pepper_file: Option<PathBuf>,

    /// Print diagnostic logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init {
        /// Key derivation function (default: kdf from config)
        #[arg(long, value_enum)]
        kdf: Option<KdfChoice>,
    },

    /// Add a record, or update an existing one
    Add {
        /// Record name (e.g. github)
        name: String,
        /// Username or login for the record
        #[arg(short, long, default_value = "")]
        username: String,
        /// Free-form notes
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// Print a record's secret
    Get {
        /// Record name
        name: String,
    },

    /// List all records
    List,

    /// Delete a record
    Delete {
        /// Record name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show the vault header (no passphrase needed)
    Info,

    /// Rewrite the vault in the current format with the recommended KDF
    Migrate,

    /// Change the vault passphrase
    Passwd,

    /// Copy the vault file to another location
    Export {
        /// Destination file
        dest: PathBuf,
    },

    /// Replace the vault with a copy of another vault file
    Import {
        /// Source vault file
        src: PathBuf,
        /// Overwrite an existing vault without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a new random pepper file
    PepperGenerate {
        /// Path for the pepper file
        path: PathBuf,
    },

    /// Permanently delete the vault
    Destroy {
        /// Skip the confirmation phrase
        #[arg(short, long)]
        force: bool,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.passvault.toml` from the working directory.
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Resolve the vault file: `--vault` first, then the config file.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    match &cli.vault {
        Some(path) => Ok(path.clone()),
        None => Ok(settings.vault_path(&std::env::current_dir()?)),
    }
}

/// Build the vault service for this invocation, with the pepper attached
/// when one is configured.
pub fn build_service(cli: &Cli, settings: &Settings, policy: VaultPolicy) -> Result<VaultService> {
    let path = vault_path(cli, settings)?;
    let service = VaultService::new(path, policy);

    let pepper_path = match &cli.pepper_file {
        Some(p) => Some(p.clone()),
        None => settings.pepper_path(&std::env::current_dir()?),
    };

    match pepper_path {
        Some(p) => Ok(service.with_pepper(load_pepper_file(&p)?)),
        None => Ok(service),
    }
}

/// Passphrase from `PASSVAULT_PASSWORD`, if set and non-empty.
fn env_passphrase() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// Get the vault passphrase, trying in order:
/// 1. `PASSVAULT_PASSWORD` env var (scripts)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase(prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = env_passphrase() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used by `init` and
/// `passwd`), re-prompting until it satisfies `policy`.
///
/// `PASSVAULT_PASSWORD` is also respected; a weak value from the
/// environment is an error rather than a re-prompt.
pub fn prompt_new_passphrase(policy: &VaultPolicy) -> Result<Zeroizing<String>> {
    if let Some(pw) = env_passphrase() {
        policy.check_passphrase(&pw)?;
        return Ok(pw);
    }

    loop {
        let passphrase = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault passphrase")
                .with_confirmation(
                    "Confirm vault passphrase",
                    "Passphrases do not match, try again",
                )
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?,
        );

        if let Err(e) = policy.check_passphrase(&passphrase) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(passphrase);
    }
}

/// Unlock the vault, re-prompting up to `max_attempts` times.
///
/// Every unlock error is reported as the same `UnlockFailed`, so neither
/// the retry message nor the final error says which check failed. A
/// passphrase from the environment gets exactly one attempt.
pub fn unlock(
    service: &VaultService,
    max_attempts: u32,
) -> Result<(RecordSet, Zeroizing<String>)> {
    if !service.exists() {
        return Err(VaultError::VaultNotFound(service.path().to_path_buf()));
    }

    let attempts = if env_passphrase().is_some() {
        1
    } else {
        max_attempts.max(1)
    };

    let mut attempt = 1;
    loop {
        let passphrase = prompt_passphrase("Enter vault passphrase")?;
        match service.load(&passphrase) {
            Ok(records) => return Ok((records, passphrase)),
            Err(e) => {
                tracing::debug!(attempt, "unlock attempt failed");
                let e = e.into_unlock_failure();
                if !matches!(e, VaultError::UnlockFailed) || attempt >= attempts {
                    return Err(e);
                }
                output::warning(&format!(
                    "Unlock failed ({} attempt(s) left)",
                    attempts - attempt
                ));
                attempt += 1;
            }
        }
    }
}

/// Append an audit event for `service`'s vault, tagged with the generation
/// its header shows now. `detail` must be header-level only.
pub fn audit(service: &VaultService, operation: Operation, detail: Option<&str>) {
    crate::audit::record(&Event {
        operation,
        vault: service.path(),
        generation: service.detect_generation().ok(),
        detail,
    });
}
