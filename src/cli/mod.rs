//! Command-line interface.

pub mod apply;
pub mod completions;
pub mod contexts;
pub mod output;
pub mod show;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::config::{Backend, Config};
use crate::core::session::Session;
use crate::core::store;
use crate::error::Result;

/// kvt - Stage, review, and commit changes to key vault secrets.
#[derive(Parser)]
#[command(
    name = "kvt",
    about = "Stage, review, and commit changes to key vault secrets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Secret store backend (azure or memory)
    #[arg(long, global = true, env = "KVT_BACKEND")]
    pub backend: Option<Backend>,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// List configured project/environment pairs
    Contexts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the secrets of one environment
    Show {
        /// Project name
        project: String,
        /// Environment name
        environment: String,
        /// Only entries whose key or value contains this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Show the inner entries of a multiline secret
        #[arg(long)]
        blob: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage operations, review the diff, and commit
    #[command(after_help = "Operations:\n  \
        add KEY=VALUE      add a secret\n  \
        edit KEY=VALUE     change a value\n  \
        rename OLD=NEW     rename a key\n  \
        delete KEY         remove a secret\n  \
        undo               revert the previous operation\n\n\
        Prefix with `BLOB: ` to work inside a multiline secret, e.g. \"DB: edit port=6543\"")]
    Apply {
        /// Project name
        project: String,
        /// Environment name
        environment: String,
        /// Operations, applied in order
        #[arg(required = true)]
        ops: Vec<String>,
        /// Commit without asking
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

/// Execute a CLI command.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Contexts { json } => contexts::execute(&load_config(cli.backend)?, json),
        Command::Show {
            project,
            environment,
            filter,
            blob,
            json,
        } => show::execute(
            &load_config(cli.backend)?,
            &project,
            &environment,
            filter.as_deref(),
            blob.as_deref(),
            json,
        ),
        Command::Apply {
            project,
            environment,
            ops,
            yes,
            json,
        } => apply::execute(
            &load_config(cli.backend)?,
            &project,
            &environment,
            &ops,
            yes,
            json,
        ),
        Command::Completions { shell } => completions::execute(shell),
    }
}

/// Load configuration, applying a backend override.
fn load_config(backend: Option<Backend>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(backend) = backend {
        config.set_backend(backend);
    }
    Ok(config)
}

/// Open a session on `project/environment` with the configured store.
fn open_session(config: &Config, project: &str, environment: &str) -> Result<Session> {
    let scope = config.resolve(project, environment)?;
    let store: Arc<dyn store::SecretStore> = Arc::from(store::open(&config.store)?);
    Session::open(store, scope)
}
