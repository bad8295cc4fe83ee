//! Library half of the `dscenkit` binary, split out so its run-config
//! loading and subcommand logic can be exercised by integration tests, the
//! way `reev-runner` splits its own driver logic into `reev_runner::lib`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod registry;
