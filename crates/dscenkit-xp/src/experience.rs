//! Accumulated [`Experience`] for one role in one scenario: every recorded
//! episode, the best one(s) seen so far, the transitions that ended in
//! failure, and the learned state/action value table.
//!
//! Grounded in `Experience.cpp`: `StoreEpisode`/`CheckDuplicateEpisode`
//! dedup and track the best episode(s), and `SetStateActionValue` skips
//! storing a freshly-zero entry to avoid growing the table with values that
//! are indistinguishable from the default.

use crate::episode::Episode;
use crate::error::XpResult;
use crate::transition::Transition;
use dscenkit_core::{get_model, ActionRef, Model, RoleInfo, StateInfo, StateRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[default]
    None,
    Learner,
    Assistant,
}

type StateActionKey = (StateRef, ActionRef);

#[derive(Debug, Default)]
pub struct Experience {
    pub role: String,
    pub model: String,
    pub episodes: Vec<Arc<Episode>>,
    pub best_episode: Option<Arc<Episode>>,
    pub best_episodes: Vec<Arc<Episode>>,
    pub failed_transitions: Vec<Transition>,
    pub level: ExperienceLevel,
    state_action_values: HashMap<StateActionKey, f64>,
}

impl Experience {
    pub fn new(role: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn model(&self) -> Arc<Model> {
        get_model(&self.model)
    }

    pub fn role_info(&self) -> Option<Arc<RoleInfo>> {
        self.model().role(&self.role)
    }

    /// Classifies and scores `state` for this experience's role. Grounded in
    /// `Experience::GetStateInfo` delegating to `RoleInfo::GetStateInfo`.
    pub fn state_info(&self, state: &StateRef) -> Option<StateInfo> {
        let model = self.model();
        let role = model.role(&self.role)?;
        let lookup = model.type_lookup();
        Some(role.get_state_info(state, &lookup))
    }

    pub fn state_action_value_defined(&self, state: &StateRef, action: &ActionRef) -> bool {
        self.state_action_values
            .contains_key(&(state.clone(), action.clone()))
    }

    pub fn state_action_value(&self, state: &StateRef, action: &ActionRef) -> f64 {
        self.state_action_values
            .get(&(state.clone(), action.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_state_action_value(&mut self, state: StateRef, action: ActionRef, value: f64) {
        let key = (state, action);
        if value == 0.0 && !self.state_action_values.contains_key(&key) {
            return;
        }
        self.state_action_values.insert(key, value);
    }

    pub fn state_action_values(&self) -> &HashMap<StateActionKey, f64> {
        &self.state_action_values
    }

    pub fn clear_state_action_values(&mut self) {
        self.state_action_values.clear();
    }

    /// Returns `true` and bumps the matching stored episode's repetition
    /// count if an equivalent episode is already recorded.
    pub fn check_duplicate_episode(&mut self, episode: &Episode) -> bool {
        let Some(existing) = self
            .episodes
            .iter()
            .position(|e| e.structurally_equals(episode))
        else {
            return false;
        };
        let bumped = Episode {
            repetitions_count: self.episodes[existing].repetitions_count + 1,
            ..(*self.episodes[existing]).clone()
        };
        self.episodes[existing] = Arc::new(bumped);
        true
    }

    /// Records `episode`, updating `failed_transitions`/`best_episode`/
    /// `best_episodes`. Returns `false` if `check_duplicate` is set and a
    /// duplicate was found (in which case only the matching episode's
    /// repetition count grows).
    pub fn store_episode(&mut self, mut episode: Episode, check_duplicate: bool) -> bool {
        if check_duplicate && self.check_duplicate_episode(&episode) {
            return false;
        }

        if episode.failed() {
            if let Some(last) = episode.transition_sequence.last() {
                if !self.failed_transitions.contains(last) {
                    self.failed_transitions.push(last.clone());
                }
            }
        }

        episode.repetitions_count = 0;
        let stored = Arc::new(episode);
        self.episodes.push(stored.clone());

        if stored.succeeded() {
            match &self.best_episode {
                None => {
                    self.best_episode = Some(stored.clone());
                    self.best_episodes.push(stored);
                }
                Some(best) if stored.performance >= best.performance => {
                    if stored.performance > best.performance {
                        self.best_episodes.clear();
                    }
                    self.best_episode = Some(stored.clone());
                    self.best_episodes.push(stored);
                }
                Some(_) => {}
            }
        }

        true
    }

    pub fn clear(&mut self) {
        self.best_episode = None;
        self.best_episodes.clear();
        self.episodes.clear();
        self.state_action_values.clear();
        self.failed_transitions.clear();
        self.level = ExperienceLevel::None;
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> XpResult<()> {
        let snapshot = ExperienceSnapshot::from_experience(self);
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &snapshot)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> XpResult<Self> {
        let file = std::fs::File::open(path)?;
        let snapshot: ExperienceSnapshot = serde_json::from_reader(file)?;
        Ok(snapshot.into_experience())
    }
}

#[derive(Serialize, Deserialize)]
struct StateActionValueEntry {
    state: StateRef,
    action: ActionRef,
    value: f64,
}

#[derive(Serialize, Deserialize)]
struct ExperienceSnapshot {
    role: String,
    model: String,
    episodes: Vec<Episode>,
    best_episode_index: Option<usize>,
    best_episode_indices: Vec<usize>,
    failed_transitions: Vec<Transition>,
    level: ExperienceLevel,
    state_action_values: Vec<StateActionValueEntry>,
}

impl ExperienceSnapshot {
    fn from_experience(xp: &Experience) -> Self {
        let best_episode_index = xp.best_episode.as_ref().and_then(|best| {
            xp.episodes
                .iter()
                .position(|episode| Arc::ptr_eq(episode, best))
        });
        let best_episode_indices = xp
            .best_episodes
            .iter()
            .filter_map(|best| {
                xp.episodes
                    .iter()
                    .position(|episode| Arc::ptr_eq(episode, best))
            })
            .collect();
        let state_action_values = xp
            .state_action_values
            .iter()
            .map(|((state, action), value)| StateActionValueEntry {
                state: state.clone(),
                action: action.clone(),
                value: *value,
            })
            .collect();
        Self {
            role: xp.role.clone(),
            model: xp.model.clone(),
            episodes: xp.episodes.iter().map(|e| (**e).clone()).collect(),
            best_episode_index,
            best_episode_indices,
            failed_transitions: xp.failed_transitions.clone(),
            level: xp.level,
            state_action_values,
        }
    }

    fn into_experience(self) -> Experience {
        let episodes: Vec<Arc<Episode>> = self.episodes.into_iter().map(Arc::new).collect();
        let best_episode = self
            .best_episode_index
            .and_then(|i| episodes.get(i).cloned());
        let best_episodes = self
            .best_episode_indices
            .into_iter()
            .filter_map(|i| episodes.get(i).cloned())
            .collect();
        let mut state_action_values = HashMap::new();
        for entry in self.state_action_values {
            state_action_values.insert((entry.state, entry.action), entry.value);
        }
        Experience {
            role: self.role,
            model: self.model,
            episodes,
            best_episode,
            best_episodes,
            failed_transitions: self.failed_transitions,
            level: self.level,
            state_action_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscenkit_core::{get_model, remove_all_models, Action, EnvironmentState};

    fn state(model_name: &str, tag: &str) -> StateRef {
        let model = get_model(model_name);
        let mut env = EnvironmentState::new();
        env.set_feature("tag", tag);
        model.canonicalize_state(env)
    }

    #[test]
    fn duplicate_episode_increments_repetitions_instead_of_storing_twice() {
        let mut xp = Experience::new("p1", "dup-test");
        let s0 = state("dup-test", "start");
        let s1 = state("dup-test", "end");
        let model = get_model("dup-test");
        let action = model.canonicalize_action(Action::new("move", vec![]));

        let make_episode = || {
            let mut episode = Episode::new(s0.clone());
            episode.result = dscenkit_core::StateResult::Succeeded;
            episode.push_transition(Transition::new(s0.clone(), action.clone(), s1.clone()));
            episode
        };

        assert!(xp.store_episode(make_episode(), true));
        assert!(!xp.store_episode(make_episode(), true));
        assert_eq!(xp.episodes.len(), 1);
        assert_eq!(xp.episodes[0].repetitions_count, 1);
        remove_all_models();
    }

    #[test]
    fn best_episode_tracks_highest_performance_with_ties() {
        let mut xp = Experience::new("p1", "best-test");
        let s0 = state("best-test", "start");

        let mut low = Episode::new(s0.clone());
        low.result = dscenkit_core::StateResult::Succeeded;
        low.performance = 1.0;
        let mut high = Episode::new(s0.clone());
        high.result = dscenkit_core::StateResult::Succeeded;
        high.performance = 5.0;
        let mut tie = Episode::new(s0);
        tie.result = dscenkit_core::StateResult::Succeeded;
        tie.performance = 5.0;

        xp.store_episode(low, false);
        xp.store_episode(high, false);
        xp.store_episode(tie, false);

        assert_eq!(xp.best_episode.as_ref().unwrap().performance, 5.0);
        assert_eq!(xp.best_episodes.len(), 2);
        remove_all_models();
    }

    #[test]
    fn zero_value_entries_are_not_persisted_unless_overwriting_existing() {
        let mut xp = Experience::new("p1", "zero-test");
        let s0 = state("zero-test", "start");
        let model = get_model("zero-test");
        let action = model.canonicalize_action(Action::new("move", vec![]));

        xp.set_state_action_value(s0.clone(), action.clone(), 0.0);
        assert!(!xp.state_action_value_defined(&s0, &action));

        xp.set_state_action_value(s0.clone(), action.clone(), 2.0);
        assert!(xp.state_action_value_defined(&s0, &action));

        xp.set_state_action_value(s0.clone(), action.clone(), 0.0);
        assert!(xp.state_action_value_defined(&s0, &action));
        assert_eq!(xp.state_action_value(&s0, &action), 0.0);
        remove_all_models();
    }
}
