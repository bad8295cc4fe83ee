//! Role/reward classification layer: a [`RoleInfo`] tells whether a state is
//! a success, a failure, a deadlock, or still in progress for one role, and
//! how much reward that state carries.
//!
//! Grounded in `CyberSystemAssistant::GetStateInfo` and the condition/reward
//! setup in `TicTacToeCybSys::InitRoles`/`Gridworld::InitRoles`: outcomes and
//! rewards are memoized per canonical state so repeated lookups on the same
//! `Arc` are O(1) after the first classification.

use crate::condition::{Condition, EntityCondition, FeatureCondition, TypeLookup};
use crate::model::StateRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateResult {
    InProgress,
    Succeeded,
    Failed,
    Deadlock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateInfo {
    pub result: StateResult,
    pub reward: f64,
}

/// Reward contributed per matching entity of `type_name` whose `property`
/// equals `value`, counted once per entity (not just once overall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCountReward {
    pub type_name: String,
    pub property: String,
    pub value: String,
    pub reward_per_count: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRewardRules {
    pub result_rewards: HashMap<StateResult, f64>,
    pub property_count_rewards: Vec<PropertyCountReward>,
    pub entity_condition_rewards: Vec<(EntityCondition, f64)>,
    pub feature_rewards: Vec<(FeatureCondition, f64)>,
}

impl StateRewardRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result_reward(mut self, result: StateResult, reward: f64) -> Self {
        self.result_rewards.insert(result, reward);
        self
    }

    pub fn with_property_count_reward(mut self, reward: PropertyCountReward) -> Self {
        self.property_count_rewards.push(reward);
        self
    }

    pub fn with_entity_condition_reward(mut self, condition: EntityCondition, reward: f64) -> Self {
        self.entity_condition_rewards.push((condition, reward));
        self
    }

    pub fn with_feature_reward(mut self, condition: FeatureCondition, reward: f64) -> Self {
        self.feature_rewards.push((condition, reward));
        self
    }

    fn evaluate(&self, result: StateResult, env: &crate::state::EnvironmentState, type_lookup: TypeLookup) -> f64 {
        let mut reward = self.result_rewards.get(&result).copied().unwrap_or(0.0);

        for count_reward in &self.property_count_rewards {
            let matches = env
                .entity_states
                .values()
                .filter(|entity| {
                    entity.type_name() == count_reward.type_name
                        && entity.property(&count_reward.property) == Some(count_reward.value.as_str())
                })
                .count();
            reward += matches as f64 * count_reward.reward_per_count;
        }

        for (condition, value) in &self.entity_condition_rewards {
            if condition.evaluate(env, type_lookup) {
                reward += value;
            }
        }

        for (condition, value) in &self.feature_rewards {
            if condition.evaluate(env) {
                reward += value;
            }
        }

        reward
    }
}

/// The success/failure/deadlock conditions and reward rules for one role in
/// one scenario, plus per-instance memoization and manual overrides.
pub struct RoleInfo {
    pub role_name: String,
    pub success_condition: Condition,
    pub failure_condition: Condition,
    pub deadlock_condition: Condition,
    pub reward_rules: StateRewardRules,
    memoized: Mutex<HashMap<StateRef, StateInfo>>,
    overrides: Mutex<HashMap<StateRef, StateResult>>,
}

impl RoleInfo {
    pub fn new(
        role_name: impl Into<String>,
        success_condition: Condition,
        failure_condition: Condition,
        deadlock_condition: Condition,
        reward_rules: StateRewardRules,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            success_condition,
            failure_condition,
            deadlock_condition,
            reward_rules,
            memoized: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    /// Forces `state` to classify as `result` regardless of its conditions,
    /// used by system-level overrides (e.g. an environment-detected failure
    /// that no symbolic condition captures).
    pub fn override_state_result(&self, state: StateRef, result: StateResult) {
        self.overrides
            .lock()
            .expect("role mutex poisoned")
            .insert(state.clone(), result);
        self.memoized.lock().expect("role mutex poisoned").remove(&state);
    }

    fn classify(&self, state: &StateRef, type_lookup: TypeLookup) -> StateResult {
        if let Some(result) = self.overrides.lock().expect("role mutex poisoned").get(state) {
            return *result;
        }
        if self.failure_condition.evaluate(state, type_lookup) {
            StateResult::Failed
        } else if self.success_condition.evaluate(state, type_lookup) {
            StateResult::Succeeded
        } else if self.deadlock_condition.evaluate(state, type_lookup) {
            StateResult::Deadlock
        } else {
            StateResult::InProgress
        }
    }

    /// Classifies and scores `state`, caching the result against this
    /// `Arc`'s identity so repeat calls are cheap.
    pub fn get_state_info(&self, state: &StateRef, type_lookup: TypeLookup) -> StateInfo {
        if let Some(info) = self.memoized.lock().expect("role mutex poisoned").get(state) {
            return *info;
        }
        let result = self.classify(state, type_lookup);
        let reward = self.reward_rules.evaluate(result, state, type_lookup);
        let info = StateInfo { result, reward };
        self.memoized
            .lock()
            .expect("role mutex poisoned")
            .insert(state.clone(), info);
        info
    }

    pub fn clear_memoized(&self) {
        self.memoized.lock().expect("role mutex poisoned").clear();
        self.overrides.lock().expect("role mutex poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comp_op::CompOp;
    use crate::condition::EntityCondition;
    use crate::condition::PropertyCondition;
    use crate::model::get_model;
    use crate::state::{EntityState, EntityStateType, EnvironmentState};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn no_lookup(_: &str) -> Option<Arc<EntityStateType>> {
        None
    }

    fn led_state(lit_up: &str) -> StateRef {
        let model = get_model("role-test");
        let mut defaults = BTreeMap::new();
        defaults.insert("lit_up".to_string(), "false".to_string());
        let ty = Arc::new(
            EntityStateType::new("LED", "role-test", defaults, BTreeMap::new(), vec![]).unwrap(),
        );
        let mut led = EntityState::from_defaults(ty);
        led.set_property("lit_up", lit_up).unwrap();
        let mut env = EnvironmentState::new();
        env.set_entity("LED1", Arc::new(led));
        let state = model.canonicalize_state(env);
        crate::model::remove_all_models();
        state
    }

    fn simple_role() -> RoleInfo {
        let success = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let failure = Condition::new();
        let deadlock = Condition::new();
        let rewards = StateRewardRules::new().with_result_reward(StateResult::Succeeded, 1.0);
        RoleInfo::new("tester", success, failure, deadlock, rewards)
    }

    #[test]
    fn classifies_success_and_memoizes() {
        let role = simple_role();
        let state = led_state("true");
        let info = role.get_state_info(&state, &no_lookup);
        assert_eq!(info.result, StateResult::Succeeded);
        assert_eq!(info.reward, 1.0);
        let cached = role.get_state_info(&state, &no_lookup);
        assert_eq!(cached.result, StateResult::Succeeded);
    }

    #[test]
    fn override_wins_over_condition() {
        let role = simple_role();
        let state = led_state("true");
        role.override_state_result(state.clone(), StateResult::Failed);
        let info = role.get_state_info(&state, &no_lookup);
        assert_eq!(info.result, StateResult::Failed);
    }

    #[test]
    fn failure_takes_priority_over_success() {
        let success = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let failure = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let role = RoleInfo::new(
            "tester",
            success,
            failure,
            Condition::new(),
            StateRewardRules::new(),
        );
        let state = led_state("true");
        let info = role.get_state_info(&state, &no_lookup);
        assert_eq!(info.result, StateResult::Failed);
    }
}
