//! Entry point: installs a `tracing_subscriber` filtered by `RUST_LOG`
//! (same as `reev-runner`/`reev-agent`), parses the CLI, and dispatches.

use anyhow::Result;
use clap::Parser;
use dscenkit_cli::cli::{Cli, Command};
use dscenkit_cli::commands;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dscenkit=info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train {
            system,
            goal,
            episodes,
            config,
            save,
        } => commands::train(&system, goal.as_deref(), episodes, config.as_deref(), save.as_deref()),
        Command::Render { system } => commands::render(&system),
        Command::Hints {
            system,
            goal,
            experience,
            max_steps,
        } => commands::hints(&system, goal.as_deref(), &experience, max_steps),
        Command::Arena { system, goal, episodes } => commands::arena(&system, goal.as_deref(), episodes),
    }
}
