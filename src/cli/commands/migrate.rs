//! `passvault migrate`: rewrite the vault as generation 2 with the
//! recommended KDF.

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, unlock, Cli};
use crate::errors::Result;

/// Execute the `migrate` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let before = service.inspect()?;
    let (records, passphrase) = unlock(&service, settings.max_unlock_attempts)?;

    service.migrate(&passphrase, &records)?;

    let after = service.policy().recommended_kdf.describe();
    let detail = format!(
        "generation {} ({}) -> generation 2 ({after})",
        before.generation,
        before.kdf.describe()
    );
    audit(&service, Operation::Migrate, Some(&detail));

    output::success(&format!(
        "Vault migrated: {detail}, {} record(s) re-encrypted",
        records.len()
    ));

    Ok(())
}
