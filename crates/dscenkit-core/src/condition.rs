//! Predicate layer: conditions over entity properties, entity relationships,
//! environment features, and trees of conditions combined with [`LogicOp`].
//!
//! Grounded in `Condition.cpp` and `EntityCondition.cpp`: a condition's own
//! clauses are all AND-combined, then each related condition folds into the
//! running result through its [`LogicOp`], short-circuiting to `false` once
//! an `And`/`AndNot` fold can no longer turn back to `true`.

use crate::comp_op::{self, CompOp};
use crate::logic_op::{self, LogicOp};
use crate::state::{EntityState, EntityStateType, EnvironmentState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Matches any single entity that satisfies the surrounding clauses.
pub const ANY_ENTITY_ID: &str = "*";
/// Matches only if every entity satisfies the surrounding clauses.
pub const ALL_ENTITIES_ID: &str = "**";

/// A `TypeLookup` resolves a type name to its declaration, used to check
/// `EntityCondition::type_name` through inheritance.
pub type TypeLookup<'a> = &'a dyn Fn(&str) -> Option<Arc<EntityStateType>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyCondition {
    pub property: String,
    pub op: CompOp,
    pub value: String,
}

impl PropertyCondition {
    pub fn new(property: impl Into<String>, op: CompOp, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn evaluate(&self, entity: &EntityState) -> bool {
        let actual = entity.property(&self.property).unwrap_or("");
        comp_op::compare(actual, self.op, &self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipCondition {
    pub relationship_name: String,
    pub op: CompOp,
    pub target_entity_id: String,
}

impl RelationshipCondition {
    pub fn new(
        relationship_name: impl Into<String>,
        op: CompOp,
        target_entity_id: impl Into<String>,
    ) -> Self {
        Self {
            relationship_name: relationship_name.into(),
            op,
            target_entity_id: target_entity_id.into(),
        }
    }

    pub fn evaluate(&self, entity: &EntityState) -> bool {
        let actual = entity
            .relationships
            .get(&self.relationship_name)
            .map(|r| r.target_entity_id.as_str())
            .unwrap_or("");
        comp_op::compare(actual, self.op, &self.target_entity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureCondition {
    pub feature: String,
    pub op: CompOp,
    pub value: String,
}

impl FeatureCondition {
    pub fn new(feature: impl Into<String>, op: CompOp, value: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            op,
            value: value.into(),
        }
    }

    pub fn evaluate(&self, env: &EnvironmentState) -> bool {
        let actual = env.feature(&self.feature).unwrap_or("");
        comp_op::compare(actual, self.op, &self.value)
    }
}

/// A condition tied to one entity id, or to `ANY_ENTITY_ID`/`ALL_ENTITIES_ID`.
///
/// Grounded in `EntityCondition::CheckCondition`: an ordinary id looks up one
/// entity and requires the type (if set) plus all property/relationship
/// clauses to hold; `ALL_ENTITIES_ID` requires every entity in the
/// environment to satisfy them; `ANY_ENTITY_ID` requires at least one to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityCondition {
    pub entity_id: String,
    pub type_name: Option<String>,
    pub property_conditions: Vec<PropertyCondition>,
    pub relationship_conditions: Vec<RelationshipCondition>,
}

impl EntityCondition {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            type_name: None,
            property_conditions: Vec::new(),
            relationship_conditions: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_property(mut self, condition: PropertyCondition) -> Self {
        self.property_conditions.push(condition);
        self
    }

    pub fn with_relationship(mut self, condition: RelationshipCondition) -> Self {
        self.relationship_conditions.push(condition);
        self
    }

    fn matches_entity(&self, entity: &EntityState, type_lookup: TypeLookup) -> bool {
        if let Some(type_name) = &self.type_name {
            if !entity.is_a(type_name, type_lookup) {
                return false;
            }
        }
        self.property_conditions.iter().all(|c| c.evaluate(entity))
            && self
                .relationship_conditions
                .iter()
                .all(|c| c.evaluate(entity))
    }

    pub fn evaluate(&self, env: &EnvironmentState, type_lookup: TypeLookup) -> bool {
        match self.entity_id.as_str() {
            ALL_ENTITIES_ID => env
                .entity_states
                .values()
                .all(|entity| self.matches_entity(entity, type_lookup)),
            ANY_ENTITY_ID => env
                .entity_states
                .values()
                .any(|entity| self.matches_entity(entity, type_lookup)),
            id => match env.entity(id) {
                Some(entity) => self.matches_entity(entity, type_lookup),
                None => false,
            },
        }
    }
}

/// A tree of conditions: this node's own clauses AND-combined, then each
/// related condition folded in left-to-right through its [`LogicOp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Condition {
    pub entity_conditions: Vec<EntityCondition>,
    pub feature_conditions: Vec<FeatureCondition>,
    pub related_conditions: Vec<(LogicOp, Condition)>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity_condition(mut self, condition: EntityCondition) -> Self {
        self.entity_conditions.push(condition);
        self
    }

    pub fn add_feature_condition(mut self, condition: FeatureCondition) -> Self {
        self.feature_conditions.push(condition);
        self
    }

    pub fn add_condition(mut self, op: LogicOp, condition: Condition) -> Self {
        self.related_conditions.push((op, condition));
        self
    }

    /// An empty condition (no entity or feature clauses of its own)
    /// evaluates to `false` rather than vacuously `true` — matching
    /// `Condition::Evaluate`'s `result = false` default, so an unset
    /// condition (e.g. no failure condition declared for a role) never
    /// fires.
    fn evaluate_own(&self, env: &EnvironmentState, type_lookup: TypeLookup) -> bool {
        if self.entity_conditions.is_empty() && self.feature_conditions.is_empty() {
            return false;
        }
        self.entity_conditions
            .iter()
            .all(|c| c.evaluate(env, type_lookup))
            && self.feature_conditions.iter().all(|c| c.evaluate(env))
    }

    /// Evaluates the whole tree per `Condition::Evaluate`: own clauses first,
    /// then each related condition, short-circuiting once an `And`/`AndNot`
    /// fold can no longer recover to `true`.
    pub fn evaluate(&self, env: &EnvironmentState, type_lookup: TypeLookup) -> bool {
        let mut running = self.evaluate_own(env, type_lookup);

        for (op, related) in &self.related_conditions {
            let next = related.evaluate(env, type_lookup);
            running = logic_op::combine(running, *op, next);
            if !running && matches!(op, LogicOp::And | LogicOp::AndNot) {
                return false;
            }
        }

        running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn led_type() -> Arc<EntityStateType> {
        let mut defaults = BTreeMap::new();
        defaults.insert("lit_up".to_string(), "false".to_string());
        Arc::new(EntityStateType::new("LED", "m", defaults, BTreeMap::new(), vec![]).unwrap())
    }

    fn no_lookup(_: &str) -> Option<Arc<EntityStateType>> {
        None
    }

    fn env_with_led(lit_up: &str) -> EnvironmentState {
        let ty = led_type();
        let mut led = EntityState::from_defaults(ty);
        led.set_property("lit_up", lit_up).unwrap();
        let mut env = EnvironmentState::new();
        env.set_entity("LED1", Arc::new(led));
        env
    }

    #[test]
    fn entity_condition_checks_property() {
        let cond = EntityCondition::new("LED1")
            .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true"));
        assert!(cond.evaluate(&env_with_led("true"), &no_lookup));
        assert!(!cond.evaluate(&env_with_led("false"), &no_lookup));
    }

    #[test]
    fn all_entities_requires_every_match() {
        let ty = led_type();
        let mut env = EnvironmentState::new();
        env.set_entity(
            "LED1",
            Arc::new({
                let mut e = EntityState::from_defaults(ty.clone());
                e.set_property("lit_up", "true").unwrap();
                e
            }),
        );
        env.set_entity(
            "LED2",
            Arc::new({
                let mut e = EntityState::from_defaults(ty);
                e.set_property("lit_up", "false").unwrap();
                e
            }),
        );

        let cond = EntityCondition::new(ALL_ENTITIES_ID)
            .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true"));
        assert!(!cond.evaluate(&env, &no_lookup));

        let any_cond = EntityCondition::new(ANY_ENTITY_ID)
            .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true"));
        assert!(any_cond.evaluate(&env, &no_lookup));
    }

    #[test]
    fn missing_entity_id_fails_condition() {
        let cond = EntityCondition::new("NOPE");
        assert!(!cond.evaluate(&env_with_led("true"), &no_lookup));
    }

    #[test]
    fn related_condition_and_short_circuits() {
        let env = env_with_led("false");
        let own = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let related = Condition::new().add_feature_condition(FeatureCondition::new(
            "never_checked",
            CompOp::Equal,
            "x",
        ));
        let combined = own.add_condition(LogicOp::And, related);
        assert!(!combined.evaluate(&env, &no_lookup));
    }

    #[test]
    fn xor_of_two_related_conditions() {
        let env = env_with_led("true");
        let a = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let b = Condition::new().add_feature_condition(FeatureCondition::new(
            "power",
            CompOp::Equal,
            "on",
        ));
        let combined = Condition::new().add_condition(LogicOp::Or, a).add_condition(LogicOp::Xor, b);
        assert!(combined.evaluate(&env, &no_lookup));
    }

    #[test]
    fn an_and_fold_turning_false_stops_before_a_later_or_can_flip_it_back() {
        let env = env_with_led("true");
        let own = Condition::new().add_entity_condition(
            EntityCondition::new("LED1")
                .with_property(PropertyCondition::new("lit_up", CompOp::Equal, "true")),
        );
        let false_related = Condition::new().add_feature_condition(FeatureCondition::new(
            "power",
            CompOp::Equal,
            "off",
        ));
        let true_related = Condition::new().add_entity_condition(EntityCondition::new("LED1"));
        let combined = own
            .add_condition(LogicOp::And, false_related)
            .add_condition(LogicOp::Or, true_related);
        assert!(!combined.evaluate(&env, &no_lookup));
    }
}
