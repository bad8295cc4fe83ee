//! Q-learning hyperparameters, grounded in `RLConfig`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RLConfig {
    /// Probability of taking a random action in an epsilon-greedy policy
    /// (Sutton & Barto, p.27).
    pub epsilon: f64,
    /// When in `(0, 1)`, epsilon decays as `epsilon_reduction^visits` where
    /// `visits` is the number of times the current state has been visited,
    /// normalized by the number of choices available. `0.0` disables decay.
    pub epsilon_reduction: f64,
    /// When `true`, the learning rate is `1 / update_count` (sample-average
    /// method, Sutton & Barto p.33) instead of `fixed_step_size`.
    pub sample_average: bool,
    pub fixed_step_size: f64,
    /// Discount rate `gamma`, `0.0..=1.0` (Sutton & Barto p.55).
    pub discount_rate: f64,
    /// Value assumed for state-action pairs never updated before.
    pub initial_value: f64,
}

impl Default for RLConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            epsilon_reduction: 0.0,
            sample_average: false,
            fixed_step_size: 0.1,
            discount_rate: 0.9,
            initial_value: 0.0,
        }
    }
}

impl RLConfig {
    /// Clamps parameters into their valid ranges in place.
    pub fn check_parameters(&mut self) {
        self.epsilon = self.epsilon.clamp(0.0, 1.0);
        self.epsilon_reduction = self.epsilon_reduction.clamp(0.0, 1.0);
        self.discount_rate = self.discount_rate.clamp(0.0, 1.0);
    }
}
