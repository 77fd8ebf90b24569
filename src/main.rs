//! kvt - Stage, review, and commit changes to key vault secrets.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kvt::cli::output;
use kvt::cli::{execute, Cli};
use kvt::core::constants;
use kvt::error::{ConfigError, Error, StoreError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("kvt=debug")
        } else {
            EnvFilter::new("kvt=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();

    if let Err(e) = execute(cli) {
        let suggestion = match &e {
            Error::Config(ConfigError::UnknownContext { .. }) => Some("run: kvt contexts"),
            Error::Config(ConfigError::UnknownBackend(_)) => {
                Some("use --backend azure or --backend memory")
            }
            Error::Store(StoreError::PermissionDenied(_)) => Some("run: az login"),
            Error::Session(_) => Some("commit or discard pending changes first"),
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
