//! `passvault get`: print a single record's secret.

use crate::audit::Operation;
use crate::cli::{audit, build_service, load_settings, unlock, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let (records, _) = unlock(&service, settings.max_unlock_attempts)?;

    let record = records
        .get(name)
        .ok_or_else(|| VaultError::RecordNotFound(name.to_string()))?;

    audit(&service, Operation::Get, None);

    // Secret alone on stdout so it can be piped.
    println!("{}", record.secret);
    if !record.username.is_empty() {
        eprintln!("username: {}", record.username);
    }

    Ok(())
}
