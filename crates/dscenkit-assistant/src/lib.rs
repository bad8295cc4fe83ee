//! The assistant layer: a single-goal [`Assistant`] facade over a
//! [`CyberSystem`](dscenkit_env::CyberSystem), an autonomous
//! [`CyberSystemAgent`] that drives one with a learning
//! [`Agent`](dscenkit_agent::Agent), and a [`SharedArena`] coordinating
//! several actors over one scenario.

mod action_result;
mod agent_wrapper;
mod arena;
mod assistant;
mod error;
mod stats;

pub use action_result::ActionResult;
pub use agent_wrapper::CyberSystemAgent;
pub use arena::{SharedActor, SharedArena};
pub use assistant::Assistant;
pub use error::{AssistantError, AssistantResult};
pub use stats::AgentStats;
