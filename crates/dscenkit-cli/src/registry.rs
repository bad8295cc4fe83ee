//! Maps a system name on the command line to a boxed
//! [`CyberSystem`](dscenkit_env::CyberSystem) and its default goal/role name.
//!
//! Mirrors `reev-runner`'s benchmark-by-path loading, except the bundled
//! systems are compiled in rather than read from a file.

use anyhow::{bail, Result};
use dscenkit_env::CyberSystem;
use dscenkit_systems::{Gridworld, LedCircuit, TicTacToe};

pub fn system_names() -> &'static [&'static str] {
    &["tictactoe", "gridworld", "led-circuit"]
}

pub fn default_goal(system: &str) -> &'static str {
    match system {
        "tictactoe" => "player1",
        "gridworld" => "Pawn",
        "led-circuit" => "Default",
        _ => "",
    }
}

pub fn build_system(name: &str) -> Result<Box<dyn CyberSystem>> {
    match name {
        "tictactoe" => Ok(Box::new(TicTacToe::new())),
        "gridworld" => Ok(Box::new(Gridworld::new())),
        "led-circuit" => Ok(Box::new(LedCircuit::new())),
        other => bail!(
            "unknown system '{other}', expected one of {:?}",
            system_names()
        ),
    }
}
