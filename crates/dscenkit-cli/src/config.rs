//! Run configuration, loadable from a small YAML file the way
//! `reev-lib::benchmark::TestCase` loads a benchmark with `serde_yaml`.

use anyhow::{Context, Result};
use dscenkit_agent::RLConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub system: String,
    pub goal: String,
    pub episodes: u32,
    pub rl: RLConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            system: "tictactoe".to_string(),
            goal: "player1".to_string(),
            episodes: 200,
            rl: RLConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run config from {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing run config from {}", path.display()))?;
        config.rl.check_parameters();
        Ok(config)
    }
}
