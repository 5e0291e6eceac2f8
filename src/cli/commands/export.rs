//! `passvault export`: copy the encrypted vault file elsewhere.
//!
//! The copy is byte-for-byte; it stays encrypted under the same
//! passphrase (and pepper, if one is used).

use std::path::Path;

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, Cli};
use crate::errors::Result;

/// Execute the `export` command.
pub fn execute(cli: &Cli, dest: &Path) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    service.export_to(dest)?;

    audit(&service, Operation::Export, Some(&dest.display().to_string()));
    output::success(&format!("Vault exported to {}", dest.display()));
    output::tip("The export is still encrypted with your vault passphrase.");

    Ok(())
}
