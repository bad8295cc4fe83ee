//! Symbolic state layer: entity-state types, entity/environment states and
//! actions, as described in spec §3. Collections use `BTreeMap` so that
//! property and entity ordering never participates in equality or hashing,
//! matching the "order does not affect equality" invariant.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named schema describing one kind of symbolic entity.
///
/// Grounded in `EntityStateType.cpp`: single-parent inheritance via
/// `ParentTypeName`, and `DefaultPropertyValues`/`PossiblePropertyValues`
/// kept as ordered maps (here `BTreeMap` for determinism).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityStateType {
    pub type_name: String,
    pub parent_type_name: Option<String>,
    pub model_name: String,
    pub default_property_values: BTreeMap<String, String>,
    pub possible_property_values: BTreeMap<String, Vec<String>>,
    pub links: Vec<String>,
}

impl EntityStateType {
    pub fn new(
        type_name: impl Into<String>,
        model_name: impl Into<String>,
        default_property_values: BTreeMap<String, String>,
        possible_property_values: BTreeMap<String, Vec<String>>,
        links: Vec<String>,
    ) -> CoreResult<Self> {
        for key in possible_property_values.keys() {
            if !default_property_values.contains_key(key) {
                return Err(CoreError::UndeclaredProperty {
                    type_name: type_name.into(),
                    property: key.clone(),
                });
            }
        }
        Ok(Self {
            type_name: type_name.into(),
            parent_type_name: None,
            model_name: model_name.into(),
            default_property_values,
            possible_property_values,
            links,
        })
    }

    pub fn with_parent(mut self, parent_type_name: impl Into<String>) -> Self {
        self.parent_type_name = Some(parent_type_name.into());
        self
    }

    pub fn count_possible_properties(&self) -> usize {
        self.default_property_values.len()
    }

    pub fn possible_property_values(&self, property: &str) -> Option<&[String]> {
        self.possible_property_values
            .get(property)
            .map(Vec::as_slice)
    }

    /// `true` iff `value` is admitted for `property`. An empty admitted list
    /// means the property is unrestricted.
    pub fn admits(&self, property: &str, value: &str) -> bool {
        match self.possible_property_values.get(property) {
            Some(values) if !values.is_empty() => values.iter().any(|v| v == value),
            _ => true,
        }
    }

    /// Walks the parent chain transitively, resolving ancestors through
    /// `lookup`. Grounded in `EntityStateType::DerivesFrom`/`IsA`.
    pub fn derives_from(
        &self,
        parent_type_name: &str,
        lookup: &dyn Fn(&str) -> Option<Arc<EntityStateType>>,
    ) -> bool {
        match &self.parent_type_name {
            None => false,
            Some(direct_parent) if direct_parent == parent_type_name => true,
            Some(direct_parent) => match lookup(direct_parent) {
                Some(parent) => parent.derives_from(parent_type_name, lookup),
                None => false,
            },
        }
    }

    pub fn is_a(
        &self,
        type_name: &str,
        lookup: &dyn Fn(&str) -> Option<Arc<EntityStateType>>,
    ) -> bool {
        self.type_name == type_name || self.derives_from(type_name, lookup)
    }
}

/// A link between one entity's named relationship and another entity's link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub target_entity_id: String,
    pub target_link_id: String,
}

/// A concrete observation of one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub state_type: Arc<EntityStateType>,
    pub property_values: BTreeMap<String, String>,
    pub relationships: BTreeMap<String, Relationship>,
}

impl PartialEq for EntityState {
    fn eq(&self, other: &Self) -> bool {
        self.state_type == other.state_type
            && self.property_values == other.property_values
            && self.relationships == other.relationships
    }
}
impl Eq for EntityState {}

impl std::hash::Hash for EntityState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.state_type.hash(state);
        self.property_values.hash(state);
        self.relationships.hash(state);
    }
}

impl EntityState {
    /// Creates an entity state from `state_type`'s defaults.
    pub fn from_defaults(state_type: Arc<EntityStateType>) -> Self {
        let property_values = state_type.default_property_values.clone();
        Self {
            state_type,
            property_values,
            relationships: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.state_type.type_name
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.property_values.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> CoreResult<()> {
        let name = name.into();
        let value = value.into();
        if !self.state_type.default_property_values.contains_key(&name) {
            return Err(CoreError::UndeclaredProperty {
                type_name: self.state_type.type_name.clone(),
                property: name,
            });
        }
        if !self.state_type.admits(&name, &value) {
            return Err(CoreError::DisallowedValue {
                type_name: self.state_type.type_name.clone(),
                property: name,
                value,
            });
        }
        self.property_values.insert(name, value);
        Ok(())
    }

    pub fn set_relationship(
        &mut self,
        relationship_name: impl Into<String>,
        target_entity_id: impl Into<String>,
        target_link_id: impl Into<String>,
    ) {
        self.relationships.insert(
            relationship_name.into(),
            Relationship {
                target_entity_id: target_entity_id.into(),
                target_link_id: target_link_id.into(),
            },
        );
    }

    pub fn is_a(
        &self,
        type_name: &str,
        lookup: &dyn Fn(&str) -> Option<Arc<EntityStateType>>,
    ) -> bool {
        self.state_type.is_a(type_name, lookup)
    }
}

/// One snapshot of the full environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EnvironmentState {
    pub entity_states: BTreeMap<String, Arc<EntityState>>,
    pub features: BTreeMap<String, String>,
}

impl EnvironmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, entity_id: &str) -> Option<&Arc<EntityState>> {
        self.entity_states.get(entity_id)
    }

    pub fn set_entity(&mut self, entity_id: impl Into<String>, state: Arc<EntityState>) {
        self.entity_states.insert(entity_id.into(), state);
    }

    pub fn feature(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(String::as_str)
    }

    pub fn set_feature(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.features.insert(name.into(), value.into());
    }
}

/// A symbolic move, `{type_id, params[]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub type_id: String,
    pub params: Vec<String>,
}

impl Action {
    pub fn new(type_id: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            type_id: type_id.into(),
            params,
        }
    }

    pub fn to_display_string(&self) -> String {
        if self.params.is_empty() {
            self.type_id.clone()
        } else {
            format!("{}({})", self.type_id, self.params.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_type() -> Arc<EntityStateType> {
        let mut defaults = BTreeMap::new();
        defaults.insert("lit_up".to_string(), "false".to_string());
        let mut possible = BTreeMap::new();
        possible.insert(
            "lit_up".to_string(),
            vec!["true".to_string(), "false".to_string()],
        );
        Arc::new(EntityStateType::new("LED", "test", defaults, possible, vec![]).unwrap())
    }

    #[test]
    fn undeclared_possible_value_key_rejected() {
        let mut defaults = BTreeMap::new();
        defaults.insert("a".to_string(), "1".to_string());
        let mut possible = BTreeMap::new();
        possible.insert("b".to_string(), vec!["1".to_string()]);
        let result = EntityStateType::new("T", "m", defaults, possible, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn property_write_respects_admitted_values() {
        let ty = make_type();
        let mut state = EntityState::from_defaults(ty);
        assert!(state.set_property("lit_up", "true").is_ok());
        assert!(state.set_property("lit_up", "maybe").is_err());
        assert!(state.set_property("missing", "x").is_err());
    }

    #[test]
    fn environment_state_equality_ignores_insertion_order() {
        let ty = make_type();
        let e1 = Arc::new(EntityState::from_defaults(ty.clone()));
        let e2 = Arc::new(EntityState::from_defaults(ty));

        let mut s1 = EnvironmentState::new();
        s1.set_entity("a", e1.clone());
        s1.set_entity("b", e2.clone());

        let mut s2 = EnvironmentState::new();
        s2.set_entity("b", e2);
        s2.set_entity("a", e1);

        assert_eq!(s1, s2);
    }

    #[test]
    fn inheritance_chain_is_transitive() {
        let grandparent = Arc::new(
            EntityStateType::new("A", "m", BTreeMap::new(), BTreeMap::new(), vec![]).unwrap(),
        );
        let parent = Arc::new(
            EntityStateType::new("B", "m", BTreeMap::new(), BTreeMap::new(), vec![])
                .unwrap()
                .with_parent("A"),
        );
        let child = EntityStateType::new("C", "m", BTreeMap::new(), BTreeMap::new(), vec![])
            .unwrap()
            .with_parent("B");

        let lookup = move |name: &str| -> Option<Arc<EntityStateType>> {
            match name {
                "A" => Some(grandparent.clone()),
                "B" => Some(parent.clone()),
                _ => None,
            }
        };

        assert!(child.is_a("C", &lookup));
        assert!(child.is_a("B", &lookup));
        assert!(child.is_a("A", &lookup));
        assert!(!child.is_a("D", &lookup));
    }
}
