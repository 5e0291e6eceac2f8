//! `passvault add`: add a record or update an existing one.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::audit::Operation;
use crate::cli::output;
use crate::cli::{audit, build_service, load_settings, unlock, Cli};
use crate::errors::{VaultError, Result};
use crate::vault::{Record, Upsert};

/// Execute the `add` command.
pub fn execute(cli: &Cli, name: &str, username: &str, notes: &str) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let (mut records, passphrase) = unlock(&service, settings.max_unlock_attempts)?;

    // The secret comes from a pipe, or from a hidden prompt.
    let secret = if io::stdin().is_terminal() {
        Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt(format!("Secret for {name}"))
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?,
        )
    } else {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string())
    };

    let outcome = records.upsert(Record::new(name, username, &secret, notes))?;
    service.save(&passphrase, &records, None)?;

    audit(&service, Operation::Add, None);

    let detail = match outcome {
        Upsert::Added => "added",
        Upsert::Updated => "updated",
    };

    output::success(&format!(
        "Record '{}' {} ({} total)",
        name.trim(),
        detail,
        records.len()
    ));

    Ok(())
}
