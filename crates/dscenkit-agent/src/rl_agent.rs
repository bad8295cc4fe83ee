//! Reference tabular Q-learning [`Agent`], grounded in `RLAgent.cpp`.

use crate::agent::Agent;
use crate::config::RLConfig;
use crate::error::{AgentError, AgentResult};
use dscenkit_core::{ActionRef, StateRef, StateResult};
use dscenkit_xp::{Experience, Transition};
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct ActionValue {
    value: f64,
    count: u32,
}

#[derive(Debug, Default)]
struct StateQEntry {
    action_values: HashMap<ActionRef, ActionValue>,
    /// Frequency of transitions into each successor state observed from
    /// this state for reasons outside this agent's own action choice
    /// (environment stochasticity, another actor's moves). Populated by
    /// [`RLAgent::note_environment_transition`].
    state_visit_count_map: HashMap<StateRef, u32>,
}

/// A tabular Q-learning agent with epsilon-greedy action selection.
pub struct RLAgent {
    config: RLConfig,
    q: HashMap<StateRef, StateQEntry>,
    state_visit_count: HashMap<StateRef, u32>,
    random_action_count: u32,
    taken_action_count: u32,
}

impl RLAgent {
    pub fn new(config: RLConfig) -> Self {
        Self {
            config,
            q: HashMap::new(),
            state_visit_count: HashMap::new(),
            random_action_count: 0,
            taken_action_count: 0,
        }
    }

    pub fn config(&self) -> RLConfig {
        self.config
    }

    pub fn set_config(&mut self, mut config: RLConfig) {
        config.check_parameters();
        self.config = config;
    }

    /// Like [`Self::set_config`], but rejects a configuration carrying a
    /// non-finite hyperparameter instead of silently clamping it (`clamp`
    /// leaves `NaN` untouched, so `check_parameters` alone cannot repair it).
    pub fn try_set_config(&mut self, mut config: RLConfig) -> AgentResult<()> {
        let finite = [
            config.epsilon,
            config.epsilon_reduction,
            config.fixed_step_size,
            config.discount_rate,
            config.initial_value,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(AgentError::InvalidConfiguration(
                "RLConfig hyperparameters must all be finite numbers".to_string(),
            ));
        }
        config.check_parameters();
        self.config = config;
        Ok(())
    }

    /// The value this agent has recorded for `(state, action)`, independent
    /// of whatever is mirrored into an [`Experience`]'s table.
    pub fn state_action_value(&self, state: &StateRef, action: &ActionRef) -> Option<f64> {
        self.q
            .get(state)
            .and_then(|entry| entry.action_values.get(action))
            .map(|av| av.value)
    }

    /// Maximum action value recorded for `state`, or the configured initial
    /// value if nothing has been recorded yet. Grounded in `GetMaxValue`.
    fn max_value(&self, state: &StateRef) -> f64 {
        self.q
            .get(state)
            .and_then(|entry| {
                entry
                    .action_values
                    .values()
                    .map(|av| av.value)
                    .fold(None, |acc, v| match acc {
                        None => Some(v),
                        Some(max) if v > max => Some(v),
                        Some(max) => Some(max),
                    })
            })
            .unwrap_or(self.config.initial_value)
    }

    fn choose_action_greedy(&self, possible_actions: &[ActionRef], state: &StateRef) -> Option<usize> {
        let mut max_value_actions = Vec::new();
        let mut max_val = f64::NEG_INFINITY;
        let mut found = false;

        for (i, action) in possible_actions.iter().enumerate() {
            let value = self
                .state_action_value(state, action)
                .unwrap_or(self.config.initial_value);
            if !found || value > max_val {
                max_val = value;
                found = true;
                max_value_actions.clear();
            }
            if found && value >= max_val {
                max_value_actions.push(i);
            }
        }

        match max_value_actions.len() {
            0 => None,
            1 => Some(max_value_actions[0]),
            n => Some(max_value_actions[rand::thread_rng().gen_range(0..n)]),
        }
    }

    /// One-step Q-learning update for a single transition. Grounded in
    /// `RLAgent::QLearn`, including the frequency-weighted expectation over
    /// observed successor states when `state_visit_count_map` is populated.
    fn q_learn(&mut self, transition: &Transition, experience: &mut Experience) {
        let prev_state = &transition.start_state;
        let action = &transition.action_taken;
        let new_state = &transition.end_state;

        let Some(state_info) = experience.state_info(new_state) else {
            return;
        };
        let reward = state_info.reward;

        let entry = self.q.entry(prev_state.clone()).or_default();
        let action_value = entry.action_values.entry(action.clone()).or_default();
        action_value.count += 1;
        let update_count = action_value.count;

        if matches!(
            state_info.result,
            StateResult::Succeeded | StateResult::Failed | StateResult::Deadlock
        ) {
            action_value.value = reward;
        } else {
            if update_count == 1 {
                action_value.value = if experience.state_action_value_defined(prev_state, action) {
                    experience.state_action_value(prev_state, action)
                } else {
                    self.config.initial_value
                };
            }

            let next_value = match self.q.get(new_state) {
                Some(next_entry) if !next_entry.state_visit_count_map.is_empty() => {
                    let total: u32 = next_entry.state_visit_count_map.values().sum();
                    next_entry
                        .state_visit_count_map
                        .iter()
                        .map(|(successor, count)| {
                            let successor_info = experience.state_info(successor);
                            let r = match &successor_info {
                                Some(info) if info.result != StateResult::InProgress => info.reward,
                                _ => self.max_value(successor),
                            };
                            r * (*count as f64 / total as f64)
                        })
                        .sum()
                }
                Some(next_entry) if !next_entry.action_values.is_empty() => self.max_value(new_state),
                _ => self.config.initial_value,
            };

            let alpha = if self.config.sample_average {
                1.0 / update_count as f64
            } else {
                self.config.fixed_step_size
            };
            let gamma = self.config.discount_rate;

            let entry = self.q.get_mut(prev_state).unwrap();
            let action_value = entry.action_values.get_mut(action).unwrap();
            action_value.value = (1.0 - alpha) * action_value.value + alpha * (reward + gamma * next_value);
            experience.set_state_action_value(prev_state.clone(), action.clone(), action_value.value);
        }
    }

    /// Backs up every transition in the sequence, most recent first, used
    /// after a successful episode. Grounded in `RLAgent::BackUp`.
    fn back_up(&mut self, experience: &mut Experience, transition_sequence: &[Transition]) {
        for transition in transition_sequence.iter().rev() {
            self.q_learn(transition, experience);
        }
    }

    /// Records that `to_state` was reached from `from_state` for reasons
    /// outside this agent's own action choice, so that `q_learn` can
    /// estimate a successor-state distribution instead of assuming the
    /// greedy max. Used by multi-actor coordination.
    pub fn note_environment_transition(&mut self, from_state: &StateRef, to_state: &StateRef) {
        *self
            .q
            .entry(from_state.clone())
            .or_default()
            .state_visit_count_map
            .entry(to_state.clone())
            .or_insert(0) += 1;
    }
}

impl Default for RLAgent {
    fn default() -> Self {
        Self::new(RLConfig::default())
    }
}

impl Agent for RLAgent {
    fn choose_action(
        &mut self,
        _experience: &Experience,
        possible_actions: &[ActionRef],
        state: &StateRef,
        update_policy: bool,
    ) -> Option<usize> {
        if possible_actions.is_empty() {
            return None;
        }

        let mut choose_greedy = true;
        if update_policy {
            let mut epsilon = self.config.epsilon;
            if self.config.epsilon_reduction > 0.0 && self.config.epsilon_reduction < 1.0 {
                let visit_count =
                    self.state_visit_count.get(state).copied().unwrap_or(0) / possible_actions.len() as u32;
                if visit_count > 0 {
                    epsilon = self.config.epsilon_reduction.powi(visit_count as i32);
                }
                *self.state_visit_count.entry(state.clone()).or_insert(0) += 1;
            }
            let sample: f64 = rand::thread_rng().gen_range(0.0..1.0);
            choose_greedy = epsilon < sample;
        }

        let chosen = if choose_greedy {
            self.choose_action_greedy(possible_actions, state)
        } else {
            self.random_action_count += 1;
            Some(rand::thread_rng().gen_range(0..possible_actions.len()))
        };

        if chosen.is_some() {
            self.taken_action_count += 1;
        }
        chosen
    }

    fn learn(
        &mut self,
        experience: &mut Experience,
        transition_sequence: &[Transition],
        last_result: StateResult,
    ) {
        if transition_sequence.is_empty() {
            return;
        }
        if last_result == StateResult::Succeeded {
            self.back_up(experience, transition_sequence);
        } else {
            self.q_learn(transition_sequence.last().unwrap(), experience);
        }
    }

    fn reset(&mut self) {
        self.q.clear();
        self.state_visit_count.clear();
        self.random_action_count = 0;
        self.taken_action_count = 0;
    }

    fn action_choice_count(&self) -> u32 {
        self.taken_action_count
    }

    fn exploration_action_count(&self) -> u32 {
        self.random_action_count
    }

    fn reset_stats(&mut self) {
        self.taken_action_count = 0;
        self.random_action_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscenkit_core::{get_model, remove_all_models, Action, Condition, EnvironmentState, RoleInfo, StateRewardRules};

    fn setup_experience(model_name: &str) -> (Experience, StateRef, StateRef, ActionRef) {
        let model = get_model(model_name);
        let success = Condition::new().add_feature_condition(dscenkit_core::FeatureCondition::new(
            "done",
            dscenkit_core::CompOp::Equal,
            "true",
        ));
        let rewards = StateRewardRules::new().with_result_reward(StateResult::Succeeded, 1.0);
        model.register_role(RoleInfo::new(
            "goal",
            success,
            Condition::new(),
            Condition::new(),
            rewards,
        ));

        let mut start_env = EnvironmentState::new();
        start_env.set_feature("done", "false");
        let start = model.canonicalize_state(start_env);

        let mut end_env = EnvironmentState::new();
        end_env.set_feature("done", "true");
        let end = model.canonicalize_state(end_env);

        let action = model.canonicalize_action(Action::new("go", vec![]));

        let xp = Experience::new("goal", model_name);
        (xp, start, end, action)
    }

    #[test]
    fn choose_action_returns_none_for_empty_list() {
        let mut agent = RLAgent::default();
        let (xp, start, _end, _action) = setup_experience("agent-empty");
        assert_eq!(agent.choose_action(&xp, &[], &start, true), None);
        remove_all_models();
    }

    #[test]
    fn try_set_config_rejects_non_finite_hyperparameters() {
        let mut agent = RLAgent::default();
        let mut config = RLConfig::default();
        config.epsilon = f64::NAN;
        assert!(agent.try_set_config(config).is_err());

        config.epsilon = 1.5;
        assert!(agent.try_set_config(config).is_ok());
        assert!(agent.config().epsilon <= 1.0);
    }

    #[test]
    fn q_learn_sets_terminal_value_to_reward() {
        let mut agent = RLAgent::new(RLConfig::default());
        let (mut xp, start, end, action) = setup_experience("agent-terminal");
        let transition = Transition::new(start.clone(), action.clone(), end);
        agent.learn(&mut xp, &[transition], StateResult::Succeeded);
        assert_eq!(agent.state_action_value(&start, &action), Some(1.0));
        remove_all_models();
    }

    #[test]
    fn greedy_choice_prefers_highest_value_action() {
        let mut agent = RLAgent::new(RLConfig::default());
        let (mut xp, start, end, good_action) = setup_experience("agent-greedy");
        let model = get_model("agent-greedy");
        let bad_action = model.canonicalize_action(Action::new("wait", vec![]));

        agent.learn(
            &mut xp,
            &[Transition::new(start.clone(), good_action.clone(), end.clone())],
            StateResult::Succeeded,
        );

        let choice = agent.choose_action(
            &xp,
            &[bad_action.clone(), good_action.clone()],
            &start,
            false,
        );
        assert_eq!(choice, Some(1));
        remove_all_models();
    }
}
