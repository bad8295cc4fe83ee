//! The per-actor facade over a [`CyberSystem`]: tracks one goal's
//! [`Experience`], starts/continues episodes, and drives `take_action`.
//!
//! Grounded in `CyberSystemAssistant.cpp`: `NewEpisode` resets the system and
//! stores the canonical initial state, `GetStateInfo` applies the system's
//! own failure condition before the role's, and `TakeAction` executes the
//! action, canonicalizes the result, appends the transition, and classifies
//! it.

use crate::action_result::ActionResult;
use crate::error::{AssistantError, AssistantResult};
use dscenkit_core::{get_model, Action, ActionRef, Model, StateRef};
use dscenkit_env::CyberSystem;
use dscenkit_xp::{Episode, Experience, Transition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct Assistant {
    pub id: String,
    cyber_system: Box<dyn CyberSystem>,
    current_goal: String,
    experiences: HashMap<String, Experience>,
    current_episode: Option<Episode>,
    model: Option<Arc<Model>>,
    system_failure_ignored: bool,
}

impl Assistant {
    pub fn new(id: impl Into<String>, cyber_system: Box<dyn CyberSystem>) -> Self {
        Self {
            id: id.into(),
            cyber_system,
            current_goal: String::new(),
            experiences: HashMap::new(),
            current_episode: None,
            model: None,
            system_failure_ignored: false,
        }
    }

    pub fn set_system_failure_ignored(&mut self, ignored: bool) {
        self.system_failure_ignored = ignored;
    }

    pub fn cyber_system(&self) -> &dyn CyberSystem {
        self.cyber_system.as_ref()
    }

    pub fn cyber_system_mut(&mut self) -> &mut dyn CyberSystem {
        self.cyber_system.as_mut()
    }

    pub fn current_goal(&self) -> &str {
        &self.current_goal
    }

    pub fn set_current_goal(&mut self, goal: impl Into<String>) -> AssistantResult<()> {
        self.current_goal = goal.into();
        self.cyber_system.init_roles(self.model())?;
        Ok(())
    }

    fn model(&mut self) -> &Arc<Model> {
        if self.model.is_none() {
            self.model = Some(get_model(self.cyber_system.system_name()));
        }
        self.model.as_ref().unwrap()
    }

    /// The experience accumulated so far for the current goal, creating an
    /// empty one on first use. Grounded in `CurrentExperience`.
    pub fn current_experience(&mut self) -> &mut Experience {
        let model_name = self.cyber_system.system_name().to_string();
        let goal = self.current_goal.clone();
        self.experiences
            .entry(goal.clone())
            .or_insert_with(|| Experience::new(goal, model_name))
    }

    pub fn experience(&self, goal: &str) -> Option<&Experience> {
        self.experiences.get(goal)
    }

    fn ensure_initialized(&mut self) -> AssistantResult<()> {
        if !self.cyber_system.is_initialized() {
            let model = self.model().clone();
            self.cyber_system.initialize(&model, true)?;
            self.cyber_system.init_roles(&model)?;
        }
        Ok(())
    }

    fn canonicalize_current_state(&mut self) -> StateRef {
        let state = self.cyber_system.interpret_system_state();
        self.model().canonicalize_state(state)
    }

    /// Resets the system and starts a fresh episode at its canonical
    /// initial state.
    pub fn new_episode(&mut self) -> AssistantResult<StateRef> {
        self.ensure_initialized()?;
        self.cyber_system.reset_system();
        let initial = self.cyber_system.initial_system_state();
        let initial_ref = self.model().canonicalize_state(initial);
        self.current_episode = Some(Episode::new(initial_ref.clone()));
        Ok(initial_ref)
    }

    pub fn last_state(&self) -> Option<&StateRef> {
        self.current_episode.as_ref().map(|episode| &episode.last_state)
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current_episode.as_ref()
    }

    pub fn current_episode_mut(&mut self) -> Option<&mut Episode> {
        self.current_episode.as_mut()
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.current_episode
            .as_ref()
            .and_then(|episode| episode.transition_sequence.last().cloned())
    }

    /// Starts this actor's episode at an externally-supplied state, without
    /// resetting the underlying system. Used by [`crate::arena::SharedArena`]
    /// to bring a non-acting actor into step with the acting one. Grounded
    /// in `CyberSystemAssistant::StartEpisode`.
    pub fn start_episode(&mut self, initial_state: StateRef) -> AssistantResult<()> {
        self.current_episode = Some(Episode::new(initial_state));
        Ok(())
    }

    /// Folds a transition taken by another actor into this actor's own
    /// episode and classifies it, without executing any action. Grounded in
    /// `CyberSystemAssistant::AcquireTransition` (called via
    /// `SharedArena::NotifyTransition`).
    pub fn acquire_transition(
        &mut self,
        transition: &Transition,
        update_experience: bool,
    ) -> AssistantResult<ActionResult> {
        if self.current_episode.is_none() {
            self.current_episode = Some(Episode::new(transition.start_state.clone()));
        }
        if let Some(episode) = self.current_episode.as_mut() {
            episode.push_transition(transition.clone());
        }

        let info = self.state_info(&transition.end_state)?;
        if let Some(episode) = self.current_episode.as_mut() {
            episode.result = info.result;
            episode.performance += info.reward;
        }

        let result = ActionResult::from(info.result);
        if update_experience && result.is_terminal() {
            self.store_current_episode(true);
        }
        Ok(result)
    }

    /// Classifies `state` for the current goal's role, applying the
    /// system's own failure condition as an override first. Grounded in
    /// `CyberSystemAssistant::GetStateInfo`.
    pub fn state_info(&mut self, state: &StateRef) -> AssistantResult<dscenkit_core::StateInfo> {
        self.ensure_initialized()?;
        if !self.system_failure_ignored {
            let model = self.model().clone();
            let lookup = model.type_lookup();
            let failure_condition = self.cyber_system.failure_condition();
            if failure_condition.evaluate(state, &lookup) {
                if let Some(role) = model.role(&self.current_goal) {
                    role.override_state_result(state.clone(), dscenkit_core::StateResult::Failed);
                }
            }
        }
        let info = self
            .current_experience()
            .state_info(state)
            .unwrap_or(dscenkit_core::StateInfo {
                result: dscenkit_core::StateResult::InProgress,
                reward: 0.0,
            });
        Ok(info)
    }

    /// Executes `action`, canonicalizes the resulting state, appends the
    /// transition to the current episode, and classifies it. Returns
    /// `ActionResult::Denied` without mutating any episode if the system
    /// rejects the action. Episode classification always happens; when
    /// `update_xp` is true and the result is terminal, the finished episode
    /// is also folded into the current goal's experience. Grounded in
    /// `CyberSystemAssistant::TakeAction`'s `updateXp` parameter.
    pub fn take_action(&mut self, action: &Action, update_xp: bool) -> AssistantResult<ActionResult> {
        if self.current_episode.is_none() {
            let state_ref = self.canonicalize_current_state();
            self.current_episode = Some(Episode::new(state_ref));
        }

        let start_state = self
            .current_episode
            .as_ref()
            .map(|e| e.last_state.clone())
            .expect("episode just ensured above");

        if !self.cyber_system.execute_action(action)? {
            return Ok(ActionResult::Denied);
        }

        let new_state = self.canonicalize_current_state();
        let model = self.model().clone();
        let action_ref: ActionRef = model.canonicalize_action(action.clone());

        let transition = Transition::new(start_state, action_ref, new_state.clone());
        if let Some(episode) = self.current_episode.as_mut() {
            episode.push_transition(transition);
        }

        let info = self.state_info(&new_state)?;
        if let Some(episode) = self.current_episode.as_mut() {
            episode.result = info.result;
            episode.performance += info.reward;
        }

        let result = ActionResult::from(info.result);
        if update_xp && result.is_terminal() {
            self.store_current_episode(true);
        }
        Ok(result)
    }

    /// Moves the finished current episode into this goal's experience,
    /// returning it. Call after `take_action` reports a terminal result.
    pub fn close_episode(&mut self) -> Option<Episode> {
        self.current_episode.take()
    }

    pub fn store_current_episode(&mut self, check_duplicate: bool) {
        if let Some(episode) = self.current_episode.take() {
            self.current_experience().store_episode(episode, check_duplicate);
        }
    }

    /// Actions the current state allows, ranked by learned value. Grounded
    /// in the best-episode/failed-transition bookkeeping in `Experience`.
    pub fn suggested_actions(&self) -> Vec<ActionRef> {
        let Some(experience) = self.experiences.get(&self.current_goal) else {
            return Vec::new();
        };
        let Some(state) = self.last_state() else {
            return Vec::new();
        };
        let mut ranked: Vec<(ActionRef, f64)> = experience
            .best_episodes
            .iter()
            .flat_map(|episode| episode.transition_sequence.iter())
            .filter(|transition| &transition.start_state == state)
            .map(|transition| (transition.action_taken.clone(), 1.0))
            .collect();
        ranked.dedup_by(|a, b| a.0 == b.0);
        ranked.into_iter().map(|(action, _)| action).collect()
    }

    /// Actions known to lead to failure from the current state. Grounded in
    /// `Experience::FailedTransitions`.
    pub fn forbidden_actions(&self) -> Vec<ActionRef> {
        let Some(experience) = self.experiences.get(&self.current_goal) else {
            return Vec::new();
        };
        let Some(state) = self.last_state() else {
            return Vec::new();
        };
        experience
            .failed_transitions
            .iter()
            .filter(|transition| &transition.start_state == state)
            .map(|transition| transition.action_taken.clone())
            .collect()
    }

    pub fn save_experience(&self, goal: &str, path: impl AsRef<Path>) -> AssistantResult<()> {
        if let Some(experience) = self.experiences.get(goal) {
            experience.save_json(path)?;
        }
        Ok(())
    }

    pub fn load_experience(&mut self, goal: impl Into<String>, path: impl AsRef<Path>) -> AssistantResult<()> {
        let goal = goal.into();
        let experience = Experience::load_json(path)?;
        self.experiences.insert(goal, experience);
        Ok(())
    }
}
