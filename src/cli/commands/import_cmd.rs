//! `passvault import`: replace the vault with a copy of another vault file.

use std::path::Path;

use dialoguer::Confirm;

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `import` command.
pub fn execute(cli: &Cli, src: &Path, force: bool) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    if service.exists() && !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Overwrite the vault at {}?",
                service.path().display()
            ))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            return Err(VaultError::UserCancelled);
        }
    }

    service.import_from(src)?;

    audit(&service, Operation::Import, Some(&src.display().to_string()));
    output::success(&format!("Vault imported from {}", src.display()));

    // The copy is not validated; say what it looks like without unlocking.
    match service.detect_generation() {
        Ok(generation) => output::info(&format!("Imported vault is generation {generation}.")),
        Err(e) => output::warning(&format!("Imported file does not look like a vault: {e}")),
    }

    Ok(())
}
