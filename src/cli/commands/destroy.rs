//! `passvault destroy`: permanently delete the vault file.
//!
//! The passphrase is required even with `--force`; `--force` only skips
//! typing the confirmation phrase.

use dialoguer::Input;

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, unlock, Cli};
use crate::errors::{VaultError, Result};

/// Phrase the user must type to confirm.
const CONFIRM_PHRASE: &str = "delete my vault";

/// Execute the `destroy` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let (records, _) = unlock(&service, settings.max_unlock_attempts)?;

    if !force {
        output::warning(&format!(
            "This permanently deletes {} record(s) in {}.",
            records.len(),
            service.path().display()
        ));
        let typed: String = Input::new()
            .with_prompt(format!("Type '{CONFIRM_PHRASE}' to confirm"))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !is_confirmation(&typed) {
            return Err(VaultError::UserCancelled);
        }
    }

    service.destroy()?;

    audit(&service, Operation::Destroy, None);
    output::success(&format!("Vault at {} deleted", service.path().display()));

    Ok(())
}

fn is_confirmation(typed: &str) -> bool {
    typed.trim().eq_ignore_ascii_case(CONFIRM_PHRASE)
}
