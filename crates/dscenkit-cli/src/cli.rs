//! Command-line surface, in the shape of `reev-runner`'s flag set but with
//! `clap` subcommands for the CLI's distinct modes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dscenkit", about = "Train and play the bundled cyber systems.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run an autonomous agent through a number of training episodes.
    Train {
        /// One of: tictactoe, gridworld, led-circuit.
        system: String,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long, default_value_t = 200)]
        episodes: u32,
        /// Optional YAML run config overriding system/goal/episodes/rl.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Save the resulting experience as JSON.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Render one system's initial state without training anything.
    Render {
        system: String,
    },
    /// Load a saved experience and print suggested/forbidden actions while
    /// stepping through an episode.
    Hints {
        system: String,
        #[arg(long)]
        goal: Option<String>,
        /// Path to a previously saved experience JSON.
        experience: PathBuf,
        #[arg(long, default_value_t = 20)]
        max_steps: u32,
    },
    /// Train two independent actors over the same scenario through a
    /// `SharedArena`, so each actor's agent also learns from the other
    /// actor's transitions.
    Arena {
        /// One of: tictactoe, gridworld, led-circuit.
        system: String,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long, default_value_t = 100)]
        episodes: u32,
    },
}
