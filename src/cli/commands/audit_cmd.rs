//! `passvault audit`: show recent operations on the vault.
//!
//! The journal only knows operations, file names and generations, so this
//! command needs no passphrase.

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{vault_dir, AuditEntry, Journal};
use crate::cli::output;
use crate::cli::{load_settings, vault_path, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let settings = load_settings()?;
    let path = vault_path(cli, &settings)?;

    let since = since.map(parse_since).transpose()?;

    let journal = Journal::open(vault_dir(&path))
        .ok_or_else(|| VaultError::AuditError("cannot open the audit journal".into()))?;
    let entries = journal.recent(last, since)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{}", entries_table(&entries));
    Ok(())
}

/// Turn `7d`, `24h` or `30m` into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid =
        || VaultError::CommandFailed(format!("invalid --since '{input}', use e.g. 7d, 24h or 30m"));

    let unit = input.chars().last().ok_or_else(invalid)?;
    let amount: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        'd' => Duration::try_days(amount),
        'h' => Duration::try_hours(amount),
        'm' => Duration::try_minutes(amount),
        _ => return Err(invalid()),
    };

    span.and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| VaultError::CommandFailed(format!("--since '{input}' is out of range")))
}

fn entries_table(entries: &[AuditEntry]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Vault", "Gen", "Detail"]);

    for entry in entries {
        table.add_row(vec![
            entry.at.format("%Y-%m-%d %H:%M:%S").to_string(),
            styled_operation(&entry.operation),
            entry.vault.clone(),
            entry
                .generation
                .map_or_else(|| "-".to_string(), |g| g.to_string()),
            entry.detail.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

fn styled_operation(op: &str) -> String {
    let styled = style(op);
    match op {
        "init" => styled.green(),
        "delete" | "destroy" => styled.red(),
        "migrate" | "passwd" => styled.yellow(),
        "export" | "import" => styled.cyan(),
        _ => styled,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ago(input: &str) -> Duration {
        Utc::now() - parse_since(input).unwrap()
    }

    #[test]
    fn since_accepts_days_hours_minutes() {
        assert!((ago("7d").num_days() - 7).abs() <= 1);
        assert!((ago(" 24h ").num_hours() - 24).abs() <= 1);
        assert!((ago("30m").num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn since_rejects_malformed_input() {
        for bad in ["", "d", "7", "7x", "-3d", "abc", "7é"] {
            assert!(parse_since(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn since_rejects_absurd_spans() {
        assert!(parse_since(&format!("{}d", i64::MAX)).is_err());
    }

    #[test]
    fn table_shows_missing_fields_as_dash() {
        let entry = AuditEntry {
            id: 1,
            at: Utc::now(),
            operation: "destroy".into(),
            vault: "vault.dat".into(),
            generation: None,
            detail: None,
        };
        let rendered = entries_table(&[entry]).to_string();
        assert!(rendered.contains("vault.dat"));
        assert!(rendered.contains('-'));
    }
}
