//! Reaction-rules: a rule authoring and evaluation toolkit.
//!
//! Rules pair a tree of condition plugins (nested AND/OR containers with
//! leaf checks) with a list of action plugins executed when the conditions
//! pass. The crate ships the user-role condition and action plugins, a
//! reorderable tree-table form model for visually editing a condition tree,
//! a YAML/JSON rule loader and an in-memory versioned component store.

mod action;
mod condition;
mod engine;
mod error;
mod expression;
mod form;
mod loader;
mod manager;
mod outcome;
mod rule;
mod store;
mod user;

pub use action::{ActionPlugin, ExecutionContext, UserRoleAdd, USER_ROLE_ADD};
pub use condition::{ConditionPlugin, EvaluationContext, UserHasRole, USER_HAS_ROLE};
pub use engine::RuleEngine;
pub use error::RuleError;
pub use expression::{
    ConditionContainer, ConditionExpression, ExpressionNode, Operator, EXPRESSION_AND,
    EXPRESSION_CONDITION, EXPRESSION_OR,
};
pub use form::{
    submit, AddLink, ConditionTable, ConditionTableForm, OperationLink, ParentId, RowValues,
    TableDrag, TableRow, ID_CLASS, PARENT_CLASS, ROUTE_EXPRESSION_ADD, ROUTE_EXPRESSION_DELETE,
    ROUTE_EXPRESSION_EDIT, WEIGHT_CLASS, WEIGHT_DELTA,
};
pub use loader::load_rules;
pub use manager::PluginManager;
pub use outcome::RuleOutcome;
pub use rule::{ActionConfig, Rule};
pub use store::{ComponentStore, RuleRevision};
pub use user::{
    Role, RoleId, RoleRef, RoleStore, User, ANONYMOUS_ROLE, AUTHENTICATED_ROLE,
};
