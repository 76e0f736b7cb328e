use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RuleError;
use crate::user::{RoleRef, RoleStore, User};

/// Plugin id of the role-granting action.
pub const USER_ROLE_ADD: &str = "user_role_add";

/// Mutable view handed to action plugins during execution.
pub struct ExecutionContext<'a> {
    pub user: &'a mut User,
    pub roles: &'a RoleStore,
}

/// A configured unit of action logic.
pub trait ActionPlugin {
    fn plugin_id(&self) -> &'static str;

    /// One line describing the configured action, for listings.
    fn summary(&self) -> String;

    fn execute(&mut self, context: &mut ExecutionContext<'_>) -> Result<(), RuleError>;

    /// Names of the context entities the host should persist after this
    /// action ran. Empty when nothing was mutated.
    fn auto_save_context(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Action: grant the configured role(s) to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleAdd {
    pub roles: Vec<RoleRef>,
    /// Set once at least one role was actually added.
    #[serde(skip)]
    save_later: bool,
}

impl UserRoleAdd {
    pub fn new(roles: Vec<RoleRef>) -> Self {
        Self {
            roles,
            save_later: false,
        }
    }

    pub fn from_config(config: &Map<String, Value>) -> Result<Self, RuleError> {
        Ok(serde_json::from_value(Value::Object(config.clone()))?)
    }
}

impl ActionPlugin for UserRoleAdd {
    fn plugin_id(&self) -> &'static str {
        USER_ROLE_ADD
    }

    fn summary(&self) -> String {
        format!("Add {} user role(s)", self.roles.len())
    }

    fn execute(&mut self, context: &mut ExecutionContext<'_>) -> Result<(), RuleError> {
        for reference in &self.roles {
            let role_id = reference.resolve(context.roles)?;
            // Roles the user already holds are skipped without flagging a save.
            if context.user.has_role(&role_id) {
                continue;
            }
            context.user.add_role(role_id)?;
            self.save_later = true;
        }
        Ok(())
    }

    fn auto_save_context(&self) -> Vec<String> {
        if self.save_later {
            vec!["user".to_string()]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{Role, RoleId, AUTHENTICATED_ROLE};

    fn store() -> RoleStore {
        let mut store = RoleStore::new();
        store.insert(Role::new("administrator", "Administrator"));
        store.insert(Role::new("editor", "Content editor"));
        store.insert(Role::new(AUTHENTICATED_ROLE, "Authenticated user"));
        store
    }

    #[test]
    fn adds_only_missing_roles_and_flags_save() {
        let roles = store();
        let mut user = User::new(1, "ada").with_role("editor");
        let mut action = UserRoleAdd::new(vec!["editor".into(), "administrator".into()]);

        action
            .execute(&mut ExecutionContext {
                user: &mut user,
                roles: &roles,
            })
            .unwrap();

        assert!(user.has_role(&RoleId::new("administrator")));
        assert_eq!(action.auto_save_context(), vec!["user".to_string()]);
    }

    #[test]
    fn held_roles_do_not_trigger_save() {
        let roles = store();
        let mut user = User::new(1, "ada").with_role("editor");
        let mut action = UserRoleAdd::new(vec!["editor".into()]);

        action
            .execute(&mut ExecutionContext {
                user: &mut user,
                roles: &roles,
            })
            .unwrap();

        assert!(action.auto_save_context().is_empty());
    }

    #[test]
    fn resolves_roles_by_label() {
        let roles = store();
        let mut user = User::new(1, "ada");
        let mut action = UserRoleAdd::new(vec!["Content editor".into()]);

        action
            .execute(&mut ExecutionContext {
                user: &mut user,
                roles: &roles,
            })
            .unwrap();

        assert!(user.has_role(&RoleId::new("editor")));
    }

    #[test]
    fn protected_roles_surface_invalid_argument() {
        let roles = store();
        let mut user = User::new(1, "ada");
        let mut action = UserRoleAdd::new(vec![AUTHENTICATED_ROLE.into()]);

        let err = action
            .execute(&mut ExecutionContext {
                user: &mut user,
                roles: &roles,
            })
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidArgument(_)));
        assert!(action.auto_save_context().is_empty());
    }
}
