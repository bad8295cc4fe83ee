//! The pluggable [`CyberSystem`] environment interface.

pub mod error;
pub mod system;

pub use error::{EnvError, EnvResult};
pub use system::CyberSystem;
