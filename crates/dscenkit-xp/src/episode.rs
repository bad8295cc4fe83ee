//! One attempt at a goal: the sequence of transitions from an initial state
//! to a terminal outcome.

use crate::transition::Transition;
use chrono::{DateTime, Utc};
use dscenkit_core::{StateRef, StateResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub initial_state: StateRef,
    pub last_state: StateRef,
    pub result: StateResult,
    pub performance: f64,
    pub repetitions_count: u32,
    pub transition_sequence: Vec<Transition>,
    pub started_at: DateTime<Utc>,
}

impl Episode {
    pub fn new(initial_state: StateRef) -> Self {
        Self {
            last_state: initial_state.clone(),
            initial_state,
            result: StateResult::InProgress,
            performance: 0.0,
            repetitions_count: 0,
            transition_sequence: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result == StateResult::Succeeded
    }

    pub fn failed(&self) -> bool {
        self.result == StateResult::Failed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.result, StateResult::Succeeded | StateResult::Failed | StateResult::Deadlock)
    }

    pub fn push_transition(&mut self, transition: Transition) {
        self.last_state = transition.end_state.clone();
        self.transition_sequence.push(transition);
    }

    /// Matches another episode on initial/last state, result, and the exact
    /// transition sequence (state identity plus action type and params).
    pub fn structurally_equals(&self, other: &Episode) -> bool {
        self.initial_state == other.initial_state
            && self.last_state == other.last_state
            && self.result == other.result
            && self.transition_sequence.len() == other.transition_sequence.len()
            && self
                .transition_sequence
                .iter()
                .zip(other.transition_sequence.iter())
                .all(|(a, b)| {
                    a.start_state == b.start_state
                        && a.end_state == b.end_state
                        && a.action_taken.type_id == b.action_taken.type_id
                        && a.action_taken.params == b.action_taken.params
                })
    }
}
