//! `passvault passwd`: change the vault passphrase.
//!
//! Unlocks with the current passphrase, then re-encrypts every record
//! under the new one with a fresh salt and nonce. The container
//! generation and KDF are kept.

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, prompt_new_passphrase, unlock, Cli};
use crate::errors::Result;

/// Execute the `passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    output::info("Enter your current vault passphrase.");
    let (records, _old) = unlock(&service, settings.max_unlock_attempts)?;

    output::info("Choose your new vault passphrase.");
    let new = prompt_new_passphrase(service.policy())?;

    // `records` is already decrypted, so this is a plain save under the new
    // passphrase rather than a second unlock.
    service.policy().check_passphrase(&new)?;
    let generation = service.save(&new, &records, None)?;

    audit(&service, Operation::Passwd, None);
    output::success(&format!(
        "Passphrase changed ({} record(s) re-encrypted, generation {generation})",
        records.len()
    ));

    Ok(())
}
