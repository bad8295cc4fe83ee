//! Coordinates several [`Assistant`]s acting inside the same scenario.
//!
//! Grounded in `SharedArena.cpp`: `TakeAction` routes a single actor's move
//! through the system and then broadcasts the resulting [`Transition`] to
//! every other actor via `NotifyTransition`, so each keeps its own episode
//! and experience in step with a world it does not directly act on. The
//! original holds actors as `shared_ptr` with a `weak_ptr` back-reference
//! installed by `SetArena`/`shared_from_this`; this version owns the actors
//! directly as `Arc<Mutex<Assistant>>` and compares them by pointer identity
//! instead, which needs no back-reference at all.

use crate::action_result::ActionResult;
use crate::assistant::Assistant;
use crate::error::AssistantResult;
use dscenkit_core::Action;
use dscenkit_xp::Transition;
use std::sync::{Arc, Mutex};

pub type SharedActor = Arc<Mutex<Assistant>>;

#[derive(Default)]
pub struct SharedArena {
    actors: Vec<SharedActor>,
}

impl SharedArena {
    pub fn new() -> Self {
        Self { actors: Vec::new() }
    }

    pub fn with_actors(actors: Vec<SharedActor>) -> Self {
        Self { actors }
    }

    pub fn add_actor(&mut self, actor: SharedActor) {
        self.actors.push(actor);
    }

    pub fn actors(&self) -> &[SharedActor] {
        &self.actors
    }

    fn has_actor(&self, actor: &SharedActor) -> bool {
        self.actors.iter().any(|known| Arc::ptr_eq(known, actor))
    }

    fn is_multi_actor(&self) -> bool {
        self.actors.len() > 1
    }

    /// Starts `actor`'s episode and, in a multi-actor arena, starts every
    /// other actor's episode at the same initial state. Grounded in
    /// `SharedArena::NewEpisode`.
    pub fn new_episode(&self, actor: &SharedActor) -> AssistantResult<()> {
        actor.lock().unwrap().new_episode()?;

        if self.is_multi_actor() {
            let initial_state = actor.lock().unwrap().last_state().cloned();
            if let Some(initial_state) = initial_state {
                for other in &self.actors {
                    if !Arc::ptr_eq(other, actor) {
                        other.lock().unwrap().start_episode(initial_state.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Routes `action` through `actor` and, when other actors share this
    /// arena, notifies them of the resulting transition. Returns
    /// `ActionResult::Denied` if `actor` does not belong to this arena.
    /// Grounded in `SharedArena::TakeAction`.
    pub fn take_action(
        &self,
        actor: &SharedActor,
        action: &Action,
        update_experience: bool,
    ) -> AssistantResult<ActionResult> {
        if !self.has_actor(actor) {
            return Ok(ActionResult::Denied);
        }

        let needs_episode = actor.lock().unwrap().last_state().is_none();
        if needs_episode {
            actor.lock().unwrap().new_episode()?;
        }

        let no_other_actor = self.actors.len() <= 1;
        // Storage is deferred to the caller (and, when other actors share
        // this arena, to `notify_transition`'s episode-close handling)
        // rather than happening inside this `take_action` call, so the
        // episode stays open long enough for `last_transition` below to see it.
        let result = actor.lock().unwrap().take_action(action, false)?;

        if no_other_actor {
            if update_experience && result.is_terminal() {
                actor.lock().unwrap().store_current_episode(true);
            }
            return Ok(result);
        }

        if let Some(transition) = actor.lock().unwrap().last_transition() {
            self.notify_transition(actor, &transition, update_experience)?;
        }
        if update_experience && result.is_terminal() {
            actor.lock().unwrap().store_current_episode(true);
        }
        Ok(result)
    }

    /// Folds `transition` into every actor other than the one that caused
    /// it. A no-op transition (state unchanged) is not propagated. Grounded
    /// in `SharedArena::NotifyTransition`.
    fn notify_transition(
        &self,
        actor: &SharedActor,
        transition: &Transition,
        update_experience: bool,
    ) -> AssistantResult<()> {
        if transition.start_state == transition.end_state {
            return Ok(());
        }
        for other in &self.actors {
            if Arc::ptr_eq(other, actor) {
                continue;
            }
            let mut guard = other.lock().unwrap();
            if guard.last_state().is_none() {
                guard.start_episode(transition.start_state.clone())?;
            }
            guard.acquire_transition(transition, update_experience)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscenkit_core::{EntityStateType, Model};
    use dscenkit_env::CyberSystem;
    use dscenkit_core::{EntityState, EnvironmentState};
    use std::sync::Arc as StdArc;

    #[derive(Debug)]
    struct Coin {
        heads: bool,
        initialized: bool,
    }

    impl CyberSystem for Coin {
        fn system_name(&self) -> &str {
            "arena-coin"
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn initialize(&mut self, _model: &StdArc<Model>, _force: bool) -> dscenkit_env::EnvResult<()> {
            self.initialized = true;
            Ok(())
        }

        fn init_roles(&mut self, _model: &StdArc<Model>) -> dscenkit_env::EnvResult<()> {
            Ok(())
        }

        fn reset_system(&mut self) {
            self.heads = true;
        }

        fn initial_system_state(&self) -> EnvironmentState {
            self.interpret_system_state()
        }

        fn execute_action(&mut self, _action: &Action) -> dscenkit_env::EnvResult<bool> {
            self.heads = !self.heads;
            Ok(true)
        }

        fn interpret_system_state(&self) -> EnvironmentState {
            let mut defaults = std::collections::BTreeMap::new();
            defaults.insert(
                "side".to_string(),
                if self.heads { "heads".to_string() } else { "tails".to_string() },
            );
            let face_type = StdArc::new(
                EntityStateType::new("Face", "arena-coin", defaults, std::collections::BTreeMap::new(), vec![])
                    .unwrap(),
            );
            let mut state = EnvironmentState::default();
            state.set_entity("coin", StdArc::new(EntityState::from_defaults(face_type)));
            state
        }

        fn available_actions(&self, _smart: bool) -> Vec<Action> {
            vec![Action::new("flip", vec![])]
        }

        fn failure_condition(&self) -> dscenkit_core::Condition {
            dscenkit_core::Condition::new()
        }

        fn system_info(&self, _info_id: &str) -> dscenkit_env::EnvResult<String> {
            Ok(String::new())
        }
    }

    fn make_actor(id: &str) -> SharedActor {
        Arc::new(Mutex::new(Assistant::new(id, Box::new(Coin { heads: true, initialized: false }))))
    }

    #[test]
    fn single_actor_arena_just_forwards() {
        let actor = make_actor("solo");
        let arena = SharedArena::with_actors(vec![actor.clone()]);
        arena.new_episode(&actor).unwrap();
        let result = arena.take_action(&actor, &Action::new("flip", vec![]), true).unwrap();
        assert_ne!(result, ActionResult::Denied);
    }

    #[test]
    fn unknown_actor_is_denied() {
        let member = make_actor("member");
        let stranger = make_actor("stranger");
        let arena = SharedArena::with_actors(vec![member]);
        let result = arena.take_action(&stranger, &Action::new("flip", vec![]), true).unwrap();
        assert_eq!(result, ActionResult::Denied);
    }

    #[test]
    fn second_actor_is_notified_of_the_first_actors_transition() {
        let mover = make_actor("mover");
        let watcher = make_actor("watcher");
        let arena = SharedArena::with_actors(vec![mover.clone(), watcher.clone()]);

        arena.new_episode(&mover).unwrap();
        assert!(watcher.lock().unwrap().last_state().is_some());

        arena.take_action(&mover, &Action::new("flip", vec![]), true).unwrap();
        let mover_state = mover.lock().unwrap().last_state().cloned();
        let watcher_state = watcher.lock().unwrap().last_state().cloned();
        assert_eq!(mover_state, watcher_state);
    }
}
