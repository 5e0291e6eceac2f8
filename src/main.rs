use clap::Parser;
use passvault::cli::{commands, Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `passvault=debug`).
const LOG_ENV: &str = "PASSVAULT_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { kdf } => commands::init::execute(&cli, kdf),
        Commands::Add {
            ref name,
            ref username,
            ref notes,
        } => commands::add::execute(&cli, name, username, notes),
        Commands::Get { ref name } => commands::get::execute(&cli, name),
        Commands::List => commands::list::execute(&cli),
        Commands::Delete { ref name, force } => commands::delete::execute(&cli, name, force),
        Commands::Info => commands::info::execute(&cli),
        Commands::Migrate => commands::migrate::execute(&cli),
        Commands::Passwd => commands::passwd::execute(&cli),
        Commands::Export { ref dest } => commands::export::execute(&cli, dest),
        Commands::Import { ref src, force } => commands::import_cmd::execute(&cli, src, force),
        Commands::PepperGenerate { ref path } => commands::pepper_generate::execute(&cli, path),
        Commands::Destroy { force } => commands::destroy::execute(&cli, force),
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(passvault::errors::VaultError::CommandFailed(
            "this build was compiled without the audit-log feature".into(),
        )),
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr: `warn` by default, `debug` with `--verbose`,
/// or whatever `PASSVAULT_LOG` asks for.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
