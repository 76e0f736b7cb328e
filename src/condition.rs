use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RuleError;
use crate::user::{RoleRef, RoleStore, User};

/// Plugin id of the role-membership condition.
pub const USER_HAS_ROLE: &str = "user_has_role";

/// Read-only view handed to condition plugins during evaluation.
pub struct EvaluationContext<'a> {
    pub user: &'a User,
    pub roles: &'a RoleStore,
}

/// A configured unit of condition logic.
pub trait ConditionPlugin: std::fmt::Debug {
    fn plugin_id(&self) -> &'static str;

    /// One line describing the configured check, for listings.
    fn summary(&self) -> String;

    fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<bool, RuleError>;
}

/// How a role list is matched against the user's roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleMatch {
    /// The user must hold every listed role.
    All,
    /// Holding at least one listed role is enough.
    Any,
}

fn parse_operation(operation: &str) -> Result<RoleMatch, RuleError> {
    match operation {
        "AND" => Ok(RoleMatch::All),
        "OR" => Ok(RoleMatch::Any),
        other => Err(RuleError::InvalidArgument(format!(
            "either use \"AND\" or \"OR\", leave empty for default \"AND\" behavior; got `{other}`"
        ))),
    }
}

/// Condition: the user holds the configured role(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHasRole {
    pub roles: Vec<RoleRef>,
    #[serde(default = "UserHasRole::default_operation")]
    pub operation: String,
}

impl UserHasRole {
    pub fn new(roles: Vec<RoleRef>, operation: impl Into<String>) -> Self {
        Self {
            roles,
            operation: operation.into(),
        }
    }

    pub fn default_operation() -> String {
        "AND".to_string()
    }

    pub fn from_config(config: &Map<String, Value>) -> Result<Self, RuleError> {
        Ok(serde_json::from_value(Value::Object(config.clone()))?)
    }
}

impl ConditionPlugin for UserHasRole {
    fn plugin_id(&self) -> &'static str {
        USER_HAS_ROLE
    }

    fn summary(&self) -> String {
        format!("User has role(s) [{}]", self.operation)
    }

    fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<bool, RuleError> {
        // An unrecognized operation is always an error, even when the role
        // list would not change the outcome.
        let matching = parse_operation(&self.operation)?;

        let mut role_ids = Vec::with_capacity(self.roles.len());
        for reference in &self.roles {
            role_ids.push(reference.resolve(context.roles)?);
        }

        let matched = match matching {
            RoleMatch::All => role_ids.iter().all(|id| context.user.has_role(id)),
            RoleMatch::Any => role_ids.iter().any(|id| context.user.has_role(id)),
        };
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;

    fn store() -> RoleStore {
        let mut store = RoleStore::new();
        store.insert(Role::new("administrator", "Administrator"));
        store.insert(Role::new("editor", "Content editor"));
        store.insert(Role::new("reviewer", "Reviewer"));
        store
    }

    fn evaluate(condition: &UserHasRole, user: &User, roles: &RoleStore) -> Result<bool, RuleError> {
        condition.evaluate(&EvaluationContext { user, roles })
    }

    #[test]
    fn and_requires_every_role() {
        let roles = store();
        let user = User::new(1, "ada").with_role("editor").with_role("reviewer");

        let both = UserHasRole::new(vec!["editor".into(), "reviewer".into()], "AND");
        assert!(evaluate(&both, &user, &roles).unwrap());

        let missing = UserHasRole::new(vec!["editor".into(), "administrator".into()], "AND");
        assert!(!evaluate(&missing, &user, &roles).unwrap());
    }

    #[test]
    fn or_requires_at_least_one_role() {
        let roles = store();
        let user = User::new(1, "ada").with_role("editor");

        let one_of = UserHasRole::new(vec!["administrator".into(), "editor".into()], "OR");
        assert!(evaluate(&one_of, &user, &roles).unwrap());

        let none_of = UserHasRole::new(vec!["administrator".into(), "reviewer".into()], "OR");
        assert!(!evaluate(&none_of, &user, &roles).unwrap());
    }

    #[test]
    fn label_references_resolve_before_matching() {
        let roles = store();
        let user = User::new(1, "ada").with_role("editor");

        let by_label = UserHasRole::new(vec!["Content editor".into()], "AND");
        assert!(evaluate(&by_label, &user, &roles).unwrap());
    }

    #[test]
    fn unknown_operation_is_invalid_argument() {
        let roles = store();
        let user = User::new(1, "ada");

        let condition = UserHasRole::new(vec!["editor".into()], "XOR");
        assert!(matches!(
            evaluate(&condition, &user, &roles),
            Err(RuleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn operation_defaults_to_and_in_config() {
        let config = serde_json::json!({"roles": ["editor"]});
        let condition = UserHasRole::from_config(config.as_object().unwrap()).unwrap();
        assert_eq!(condition.operation, "AND");
    }

    #[test]
    fn empty_role_list_matches_under_and_only() {
        let roles = store();
        let user = User::new(1, "ada");

        let all = UserHasRole::new(vec![], "AND");
        assert!(evaluate(&all, &user, &roles).unwrap());
        let any = UserHasRole::new(vec![], "OR");
        assert!(!evaluate(&any, &user, &roles).unwrap());
    }
}
