//! `passvault list`: display all records in a table.

use crate::cli::output;
use crate::cli::{build_service, load_settings, unlock, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let service = build_service(cli, &settings, settings.policy())?;

    let (records, _) = unlock(&service, settings.max_unlock_attempts)?;
    let list = records.list();

    output::info(&format!(
        "{}: {} record(s)",
        service.path().display(),
        list.len()
    ));
    output::print_records_table(&list);

    Ok(())
}
