//! Predicate, symbolic state, interning, and role/reward layers shared by
//! every other crate in the workspace.
//!
//! Modules are layered bottom-up: [`comp_op`] and [`logic_op`] are the
//! primitive operators, [`state`] describes entities and environments,
//! [`condition`] builds predicates over that state, [`model`] interns
//! canonical states/actions per named scenario, and [`role`] classifies and
//! scores canonical states for a role.

pub mod comp_op;
pub mod condition;
pub mod error;
pub mod logic_op;
pub mod model;
pub mod role;
pub mod state;

pub use comp_op::CompOp;
pub use condition::{Condition, EntityCondition, FeatureCondition, PropertyCondition, RelationshipCondition};
pub use error::{CoreError, CoreResult};
pub use logic_op::LogicOp;
pub use model::{get_model, remove_all_models, ActionRef, Model, StateRef};
pub use role::{PropertyCountReward, RoleInfo, StateInfo, StateResult, StateRewardRules};
pub use state::{Action, EntityState, EntityStateType, EnvironmentState, Relationship};
