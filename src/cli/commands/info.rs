//! `passvault info`: show the public vault header without unlocking.

use crate::cli::output;
use crate::cli::{build_service, load_settings, Cli};
use crate::errors::Result;
use crate::vault::Generation;

/// Execute the `info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let info = service.inspect()?;

    output::info(&format!("Vault at {}", service.path().display()));
    output::print_vault_info(&info);

    if !info.header_intact {
        output::warning("The header hash does not match; this vault will not unlock.");
    }
    if info.generation == Generation::V1 {
        output::tip("This vault uses the legacy format. Run `passvault migrate` to upgrade it.");
    } else if info.kdf != service.policy().recommended_kdf {
        output::tip("Run `passvault migrate` to switch to the configured key derivation.");
    }

    Ok(())
}
