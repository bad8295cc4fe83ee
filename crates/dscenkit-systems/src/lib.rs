//! Concrete [`CyberSystem`](dscenkit_env::CyberSystem) implementations used
//! to exercise the rest of the workspace: tic-tac-toe against a heuristic
//! opponent, a 2D gridworld walk, and a simple LED circuit.

mod gridworld;
mod led_circuit;
mod tictactoe;

pub use gridworld::{Cell, Gridworld};
pub use led_circuit::LedCircuit;
pub use tictactoe::{Player, TicTacToe};
