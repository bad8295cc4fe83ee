//! The [`CyberSystem`] trait: the pluggable environment a scenario runs
//! against, generalized from the per-system interface used throughout
//! `CyberSystemAssistant.cpp` and implemented concretely by
//! `TicTacToeCybSys.cpp`/`Gridworld.cpp`/`TestLedCircuit.cpp`.

use crate::error::EnvResult;
use dscenkit_core::{Action, Condition, EnvironmentState, Model};
use std::sync::Arc;

/// An environment that can be reset, driven by actions, and interpreted into
/// a symbolic [`EnvironmentState`].
///
/// Mirrors the reset/step shape of a Gym-style environment loop, but exposes
/// the extra symbolic hooks (`available_actions`, `failure_condition`,
/// `system_info`) the role/reward and assistant layers need.
pub trait CyberSystem: Send {
    /// The model name this system registers its types and roles under.
    fn system_name(&self) -> &str;

    fn is_initialized(&self) -> bool;

    /// Prepares static resources (entity types, roles) in `model`. Re-running
    /// with `force = true` re-initializes even if already initialized.
    fn initialize(&mut self, model: &Arc<Model>, force: bool) -> EnvResult<()>;

    /// Declares each role's success/failure/deadlock conditions and reward
    /// rules against `model`. Called once after `initialize`.
    fn init_roles(&mut self, model: &Arc<Model>) -> EnvResult<()>;

    /// Restarts the system at its initial configuration.
    fn reset_system(&mut self);

    /// Resets types, roles, and entities — a harder reset than
    /// `reset_system`, which only restarts run-time variables and keeps
    /// whatever configuration was already loaded. Systems that keep nothing
    /// beyond that run-time state can leave the default, which just
    /// delegates to `reset_system`.
    fn clear(&mut self) {
        self.reset_system();
    }

    fn initial_system_state(&self) -> EnvironmentState;

    /// Applies `action`. Returns `Ok(true)` if it was legal and applied,
    /// `Ok(false)` if it was rejected without changing the system.
    fn execute_action(&mut self, action: &Action) -> EnvResult<bool>;

    fn interpret_system_state(&self) -> EnvironmentState;

    /// Populates `target` in place to reflect the current environment,
    /// rather than allocating a fresh `EnvironmentState` the way
    /// `interpret_system_state` does. The default just delegates.
    fn synchronize_state(&self, target: &mut EnvironmentState) {
        *target = self.interpret_system_state();
    }

    /// The most recently produced state snapshot. Defaults to
    /// re-interpreting the current state; systems that cache a snapshot
    /// after `execute_action` may override to hand back that cached copy
    /// instead of recomputing it.
    fn get_last_system_state(&self) -> EnvironmentState {
        self.interpret_system_state()
    }

    /// Lists the actions available from the current state. When `smart` is
    /// set, implementations may narrow the list with system-specific
    /// heuristics (e.g. forcing a winning move) rather than listing every
    /// structurally legal action.
    fn available_actions(&self, smart: bool) -> Vec<Action>;

    /// A condition recognized as a system-wide failure independent of any
    /// one role, checked by the assistant before role-level classification.
    fn failure_condition(&self) -> Condition;

    /// Renders a piece of system info identified by `info_id` (e.g. a board
    /// or grid rendering) as a human-readable string.
    fn system_info(&self, info_id: &str) -> EnvResult<String>;

    /// Parses a system-specific text configuration (grid layout, circuit
    /// description, ...). Systems with nothing to configure can leave the
    /// default no-op.
    fn set_configuration(&mut self, _configuration: &str) -> EnvResult<()> {
        Ok(())
    }

    /// The inverse of `set_configuration`: the current configuration
    /// rendered back to the same plain-text format it accepts. Systems with
    /// nothing to configure can leave the default empty string.
    fn get_configuration(&self) -> EnvResult<String> {
        Ok(String::new())
    }

    /// Declares or replaces one entity's configuration. Systems without
    /// per-entity configuration leave the default no-op.
    fn configure_entity(
        &mut self,
        _entity_id: &str,
        _type_name: &str,
        _configuration: &str,
    ) -> EnvResult<()> {
        Ok(())
    }

    /// The plain-text configuration of one entity, or an empty string if the
    /// system keeps none or the entity is unknown.
    fn read_entity_configuration(&self, _entity_id: &str) -> EnvResult<String> {
        Ok(String::new())
    }

    /// Replaces one entity's configuration in place, leaving its id and type
    /// untouched. Systems without per-entity configuration leave the default
    /// no-op.
    fn write_entity_configuration(&mut self, _entity_id: &str, _configuration: &str) -> EnvResult<()> {
        Ok(())
    }

    /// Removes one entity. Systems without a notion of removable entities
    /// leave the default no-op.
    fn remove_entity(&mut self, _entity_id: &str) -> EnvResult<()> {
        Ok(())
    }

    /// Enables or disables the system's own diagnostic logging, independent
    /// of the `tracing` subscriber installed by the host process.
    fn set_log_enabled(&mut self, _enabled: bool) {}

    fn is_log_enabled(&self) -> bool {
        false
    }
}
