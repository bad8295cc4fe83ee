//! A single state/action/state step recorded during an episode.

use dscenkit_core::{ActionRef, StateRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub start_state: StateRef,
    pub action_taken: ActionRef,
    pub end_state: StateRef,
}

impl Transition {
    pub fn new(start_state: StateRef, action_taken: ActionRef, end_state: StateRef) -> Self {
        Self {
            start_state,
            action_taken,
            end_state,
        }
    }
}
