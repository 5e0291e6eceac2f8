//! `passvault init`: create a new, empty vault.

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, prompt_new_passphrase, Cli};
use crate::config::KdfChoice;
use crate::errors::{VaultError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli, kdf: Option<KdfChoice>) -> Result<()> {
    let settings = load_settings()?;

    let mut policy = settings.policy();
    if let Some(choice) = kdf {
        policy.recommended_kdf = settings.kdf_spec(choice);
    }
    let service = build_service(cli, &settings, policy)?;

    // Check before prompting so the user doesn't type a passphrase for nothing.
    if service.exists() {
        output::tip("Use `passvault add` to add records to the existing vault.");
        return Err(VaultError::VaultAlreadyExists(service.path().to_path_buf()));
    }

    let passphrase = prompt_new_passphrase(service.policy())?;
    service.create(&passphrase)?;

    let kdf = service.policy().recommended_kdf.describe();
    audit(&service, Operation::Init, Some(&kdf));

    output::success(&format!("Vault created at {}", service.path().display()));
    output::info(&format!("Key derivation: {kdf}"));
    output::tip("Run `passvault add <NAME>` to add a record.");

    Ok(())
}
