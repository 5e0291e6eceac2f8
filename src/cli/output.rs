//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{RecordMetadata, VaultInfo};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of record metadata (Name, Username, Created, Updated).
pub fn print_records_table(records: &[RecordMetadata]) {
    if records.is_empty() {
        info("No records in this vault yet.");
        tip("Run `passvault add <NAME>` to add your first record.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Username", "Created", "Updated"]);

    for r in records {
        table.add_row(vec![
            r.name.clone(),
            r.username.clone(),
            r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the public header summary of a vault.
pub fn print_vault_info(info: &VaultInfo) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Format".to_string(), format!("generation {}", info.generation)]);
    table.add_row(vec!["Key derivation".to_string(), info.kdf.describe()]);
    table.add_row(vec![
        "Created".to_string(),
        info.created_at.map_or_else(
            || "-".to_string(),
            |ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
    ]);
    table.add_row(vec![
        "Header".to_string(),
        if info.header_intact {
            style("intact").green().to_string()
        } else {
            style("MODIFIED").red().bold().to_string()
        },
    ]);

    println!("{table}");
}
