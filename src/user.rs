use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Role id reserved for visitors without an account. Never assignable.
pub const ANONYMOUS_ROLE: &str = "anonymous";
/// Role id granted implicitly to every logged-in user. Never assignable.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Case-normalized machine identifier for a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id belongs to one of the system roles the host manages
    /// on its own and refuses to have assigned manually.
    pub fn is_protected(&self) -> bool {
        self.0 == ANONYMOUS_ROLE || self.0 == AUTHENTICATED_ROLE
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleId {
    fn from(value: &str) -> Self {
        RoleId::new(value)
    }
}

impl From<String> for RoleId {
    fn from(value: String) -> Self {
        RoleId::new(value)
    }
}

/// A named role as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub label: String,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Reference to a role as it appears in plugin configuration: either an
/// already-resolved role object or a string holding an id or a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleRef {
    Role(Role),
    Reference(String),
}

impl RoleRef {
    /// Resolve to a canonical role id. String references are tried as an id
    /// first and fall back to a linear scan over all role labels.
    pub fn resolve(&self, roles: &RoleStore) -> Result<RoleId, RuleError> {
        match self {
            RoleRef::Role(role) => Ok(role.id.clone()),
            RoleRef::Reference(reference) => {
                if let Some(role) = roles.load(reference) {
                    return Ok(role.id.clone());
                }
                roles
                    .find_by_label(reference)
                    .map(|role| role.id.clone())
                    .ok_or_else(|| RuleError::UnknownRole(reference.clone()))
            }
        }
    }
}

impl From<Role> for RoleRef {
    fn from(value: Role) -> Self {
        RoleRef::Role(value)
    }
}

impl From<&str> for RoleRef {
    fn from(value: &str) -> Self {
        RoleRef::Reference(value.to_string())
    }
}

/// In-memory stand-in for the host's role storage.
#[derive(Debug, Default, Clone)]
pub struct RoleStore {
    roles: BTreeMap<RoleId, Role>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role) {
        self.roles.insert(role.id.clone(), role);
    }

    /// Case-insensitive lookup by role id.
    pub fn load(&self, id: &str) -> Option<&Role> {
        self.roles.get(&RoleId::new(id))
    }

    pub fn load_multiple(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Role> {
        self.roles.values().find(|role| role.label == label)
    }
}

/// A user account holding a set of role ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uid: u64,
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Set when an action mutated the account and the host should persist it.
    #[serde(default)]
    pub needs_save: bool,
}

impl User {
    pub fn new(uid: u64, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            roles: BTreeSet::new(),
            needs_save: false,
        }
    }

    pub fn with_role(mut self, id: impl Into<RoleId>) -> Self {
        self.roles.insert(id.into());
        self
    }

    pub fn has_role(&self, id: &RoleId) -> bool {
        self.roles.contains(id)
    }

    /// Grant a role. Returns `false` when the user already held it. Protected
    /// roles are never assignable and surface as an invalid argument.
    pub fn add_role(&mut self, id: RoleId) -> Result<bool, RuleError> {
        if id.is_protected() {
            return Err(RuleError::InvalidArgument(format!(
                "the role `{id}` must not be assigned manually"
            )));
        }
        Ok(self.roles.insert(id))
    }

    pub fn mark_for_save(&mut self) {
        self.needs_save = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RoleStore {
        let mut store = RoleStore::new();
        store.insert(Role::new("administrator", "Administrator"));
        store.insert(Role::new("editor", "Content editor"));
        store
    }

    #[test]
    fn resolves_reference_by_id() {
        let store = store();
        let reference = RoleRef::from("Editor");
        assert_eq!(reference.resolve(&store).unwrap(), RoleId::new("editor"));
    }

    #[test]
    fn resolves_reference_by_label_fallback() {
        let store = store();
        let reference = RoleRef::from("Content editor");
        assert_eq!(reference.resolve(&store).unwrap(), RoleId::new("editor"));
    }

    #[test]
    fn resolved_role_objects_pass_through() {
        let store = RoleStore::new();
        let reference = RoleRef::from(Role::new("editor", "Content editor"));
        assert_eq!(reference.resolve(&store).unwrap(), RoleId::new("editor"));
    }

    #[test]
    fn unresolvable_reference_is_an_error() {
        let store = store();
        let reference = RoleRef::from("missing");
        assert!(matches!(
            reference.resolve(&store),
            Err(RuleError::UnknownRole(name)) if name == "missing"
        ));
    }

    #[test]
    fn adding_a_protected_role_is_rejected() {
        let mut user = User::new(1, "ada");
        let err = user.add_role(RoleId::new(AUTHENTICATED_ROLE)).unwrap_err();
        assert!(matches!(err, RuleError::InvalidArgument(_)));
        assert!(user.roles.is_empty());
    }

    #[test]
    fn adding_a_held_role_returns_false() {
        let mut user = User::new(1, "ada").with_role("editor");
        assert!(!user.add_role(RoleId::new("editor")).unwrap());
        assert!(user.add_role(RoleId::new("administrator")).unwrap());
    }
}
