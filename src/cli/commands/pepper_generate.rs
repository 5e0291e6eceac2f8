//! `passvault pepper-generate`: create a random pepper file.

use std::path::Path;

use crate::cli::output;
use crate::cli::Cli;
use crate::crypto::generate_pepper_file;
use crate::errors::Result;

/// Execute the `pepper-generate` command.
pub fn execute(_cli: &Cli, path: &Path) -> Result<()> {
    generate_pepper_file(path)?;

    output::success(&format!("Pepper file created at {}", path.display()));
    output::warning("Keep the pepper file safe: a vault created with it cannot be opened without it.");
    output::tip(&format!(
        "Pass --pepper-file {} or set pepper_file in .passvault.toml before `passvault init`.",
        path.display()
    ));

    Ok(())
}
