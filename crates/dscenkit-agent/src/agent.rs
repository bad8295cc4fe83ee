//! The pluggable [`Agent`] interface: anything that can pick an action among
//! a set of possible ones and learn from a completed transition sequence.
//!
//! Shaped after `reev-lib`'s `Agent` trait (`get_action`), generalized to
//! the richer choose/learn contract used by `RLAgent.cpp`.

use dscenkit_core::{ActionRef, StateRef, StateResult};
use dscenkit_xp::{Experience, Transition};

/// An agent that chooses among possible actions and learns from experience.
pub trait Agent: Send {
    /// Picks the index into `possible_actions` to take from `state`. Returns
    /// `None` if `possible_actions` is empty. When `update_policy` is
    /// `false` the agent should act greedily without touching exploration
    /// bookkeeping (e.g. when evaluating a learned policy).
    fn choose_action(
        &mut self,
        experience: &Experience,
        possible_actions: &[ActionRef],
        state: &StateRef,
        update_policy: bool,
    ) -> Option<usize>;

    /// Updates `experience`'s state-action values from `transition_sequence`,
    /// given the episode's final classification.
    fn learn(
        &mut self,
        experience: &mut Experience,
        transition_sequence: &[Transition],
        last_result: StateResult,
    );

    fn reset(&mut self);

    fn action_choice_count(&self) -> u32;

    fn exploration_action_count(&self) -> u32;

    fn reset_stats(&mut self);
}
