//! Canonical interning registry: one [`Model`] per named scenario keeps a
//! single canonical `Arc` for every structurally distinct state and action it
//! has seen, so that two equal states always compare `Arc`-equal once
//! canonicalized, and role outcomes can be memoized by that `Arc`'s identity.
//!
//! Grounded in the model-name-keyed registries used throughout
//! `CyberSystemAssistant.cpp`/`SharedArena.cpp` (`GetModel(modelName)`), kept
//! here as a process-wide `OnceLock<Mutex<HashMap<...>>>` since the teacher's
//! stack carries no interior-mutability-singleton crate (`once_cell` is not
//! among its dependencies, and `std::sync::OnceLock` covers the same need).

use crate::role::RoleInfo;
use crate::state::{Action, EntityStateType, EnvironmentState};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// A canonicalized, reference-counted state. Two `StateRef`s compare equal
/// by pointer once both have passed through the same [`Model`]'s `canonicalize_state`.
pub type StateRef = Arc<EnvironmentState>;
/// A canonicalized, reference-counted action.
pub type ActionRef = Arc<Action>;

#[derive(Default)]
struct ModelTables {
    // `IndexMap` rather than `HashMap`: `index_of_state` must return a
    // stable integer over insertion order, which a hashed iteration order
    // cannot guarantee.
    states: IndexMap<EnvironmentState, StateRef>,
    actions: IndexMap<Action, ActionRef>,
    entity_state_types: HashMap<String, Arc<EntityStateType>>,
    roles: HashMap<String, Arc<RoleInfo>>,
}

/// The interning and role registry for one named scenario.
pub struct Model {
    name: String,
    tables: Mutex<ModelTables>,
}

impl Model {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Mutex::new(ModelTables::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the canonical `Arc` for `state`, interning it first if this is
    /// the first time this exact structural value has been seen.
    pub fn canonicalize_state(&self, state: EnvironmentState) -> StateRef {
        let mut tables = self.tables.lock().expect("model mutex poisoned");
        if let Some(existing) = tables.states.get(&state) {
            return existing.clone();
        }
        let arc = Arc::new(state.clone());
        tables.states.insert(state, arc.clone());
        arc
    }

    pub fn canonicalize_action(&self, action: Action) -> ActionRef {
        let mut tables = self.tables.lock().expect("model mutex poisoned");
        if let Some(existing) = tables.actions.get(&action) {
            return existing.clone();
        }
        let arc = Arc::new(action.clone());
        tables.actions.insert(action, arc.clone());
        arc
    }

    /// The insertion-order index of a previously canonicalized state, or
    /// `None` if it was never interned through this model. Stable across
    /// calls: a state's index never changes once assigned, regardless of
    /// what else is later interned.
    pub fn index_of_state(&self, state: &StateRef) -> Option<usize> {
        let tables = self.tables.lock().expect("model mutex poisoned");
        tables
            .states
            .values()
            .position(|candidate| Arc::ptr_eq(candidate, state))
    }

    pub fn register_entity_state_type(&self, entity_type: EntityStateType) -> Arc<EntityStateType> {
        let mut tables = self.tables.lock().expect("model mutex poisoned");
        let arc = Arc::new(entity_type);
        tables
            .entity_state_types
            .insert(arc.type_name.clone(), arc.clone());
        arc
    }

    pub fn entity_state_type(&self, type_name: &str) -> Option<Arc<EntityStateType>> {
        let tables = self.tables.lock().expect("model mutex poisoned");
        tables.entity_state_types.get(type_name).cloned()
    }

    /// A lookup closure suitable for `EntityStateType::is_a`/`derives_from`.
    pub fn type_lookup(self: &Arc<Self>) -> impl Fn(&str) -> Option<Arc<EntityStateType>> + '_ {
        move |name: &str| self.entity_state_type(name)
    }

    pub fn register_role(&self, role: RoleInfo) -> Arc<RoleInfo> {
        let mut tables = self.tables.lock().expect("model mutex poisoned");
        let arc = Arc::new(role);
        tables.roles.insert(arc.role_name.clone(), arc.clone());
        arc
    }

    pub fn role(&self, role_name: &str) -> Option<Arc<RoleInfo>> {
        let tables = self.tables.lock().expect("model mutex poisoned");
        tables.roles.get(role_name).cloned()
    }

    /// Drops every interned state/action and memoized role outcome,
    /// invalidating any `StateRef`/`ActionRef` previously handed out by
    /// comparison (they remain valid `Arc`s, just no longer canonical).
    pub fn clear_stored_states(&self) {
        let mut tables = self.tables.lock().expect("model mutex poisoned");
        tables.states.clear();
        tables.actions.clear();
        for role in tables.roles.values() {
            role.clear_memoized();
        }
    }
}

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Model>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Arc<Model>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the process-wide model named `name`, creating it on first use.
pub fn get_model(name: &str) -> Arc<Model> {
    let mut models = registry().lock().expect("model registry poisoned");
    models
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(Model::new(name)))
        .clone()
}

/// Removes every registered model. Intended for test isolation between
/// scenarios that would otherwise share process-wide state.
pub fn remove_all_models() {
    registry().lock().expect("model registry poisoned").clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn equal_states_canonicalize_to_the_same_arc() {
        let model = get_model("canonical-test");
        let a = EnvironmentState::new();
        let b = EnvironmentState::new();
        let ra = model.canonicalize_state(a);
        let rb = model.canonicalize_state(b);
        assert!(Arc::ptr_eq(&ra, &rb));
        remove_all_models();
    }

    #[test]
    fn index_of_state_is_a_stable_insertion_order_integer() {
        let model = get_model("index-of-state-test");
        let mut first = EnvironmentState::new();
        first.set_feature("a", "1");
        let mut second = EnvironmentState::new();
        second.set_feature("b", "2");

        let first_ref = model.canonicalize_state(first.clone());
        let second_ref = model.canonicalize_state(second);
        assert_eq!(model.index_of_state(&first_ref), Some(0));
        assert_eq!(model.index_of_state(&second_ref), Some(1));

        // Re-canonicalizing an already-interned state must not move its index.
        let first_ref_again = model.canonicalize_state(first);
        assert_eq!(model.index_of_state(&first_ref_again), Some(0));
        remove_all_models();
    }

    #[test]
    fn distinct_models_do_not_share_tables() {
        let m1 = get_model("model-one");
        let m2 = get_model("model-two");
        let mut defaults = BTreeMap::new();
        defaults.insert("x".to_string(), "0".to_string());
        m1.register_entity_state_type(
            EntityStateType::new("T", "model-one", defaults, BTreeMap::new(), vec![]).unwrap(),
        );
        assert!(m1.entity_state_type("T").is_some());
        assert!(m2.entity_state_type("T").is_none());
        remove_all_models();
    }
}
