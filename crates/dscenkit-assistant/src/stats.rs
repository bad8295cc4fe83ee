//! Running statistics for one autonomous agent's training loop.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub episodes_count: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub deadlock_count: u32,
    pub action_choice_count: u32,
    pub exploration_action_count: u32,
}
