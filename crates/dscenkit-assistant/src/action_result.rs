//! The outcome of taking one action, a superset of [`StateResult`] with
//! `Denied` for an action the environment rejected outright.

use dscenkit_core::StateResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    InProgress,
    Succeeded,
    Failed,
    Deadlock,
    Denied,
}

impl From<StateResult> for ActionResult {
    fn from(result: StateResult) -> Self {
        match result {
            StateResult::InProgress => ActionResult::InProgress,
            StateResult::Succeeded => ActionResult::Succeeded,
            StateResult::Failed => ActionResult::Failed,
            StateResult::Deadlock => ActionResult::Deadlock,
        }
    }
}

impl ActionResult {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionResult::Succeeded | ActionResult::Failed | ActionResult::Deadlock
        )
    }

    pub fn as_state_result(self) -> Option<StateResult> {
        match self {
            ActionResult::InProgress => Some(StateResult::InProgress),
            ActionResult::Succeeded => Some(StateResult::Succeeded),
            ActionResult::Failed => Some(StateResult::Failed),
            ActionResult::Deadlock => Some(StateResult::Deadlock),
            ActionResult::Denied => None,
        }
    }
}
