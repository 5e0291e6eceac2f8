//! `passvault delete`: remove a record from the vault.

use dialoguer::Confirm;

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, unlock, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete record '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let (mut records, passphrase) = unlock(&service, settings.max_unlock_attempts)?;
    let removed = records.remove(name)?;
    service.save(&passphrase, &records, None)?;

    audit(&service, Operation::Delete, None);
    output::success(&format!("Deleted record '{}'", removed.name));

    Ok(())
}
