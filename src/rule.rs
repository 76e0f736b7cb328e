use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::expression::{ConditionContainer, Operator};

/// A configured action invocation within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub action_id: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ActionConfig {
    pub fn new(action_id: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            action_id: action_id.into(),
            context,
        }
    }
}

/// Declarative reaction rule: a root condition container plus the actions
/// executed when the conditions pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier for the rule.
    pub id: String,
    /// Optional human readable label.
    #[serde(default)]
    pub label: Option<String>,
    /// Whether the rule is active.
    #[serde(default = "Rule::default_enabled")]
    pub enabled: bool,
    /// Additional tags for listing / filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Root condition container. Exactly one root per rule.
    #[serde(default = "Rule::default_conditions")]
    pub conditions: ConditionContainer,
    /// Actions executed in order once the conditions pass.
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            enabled: true,
            tags: Vec::new(),
            conditions: Self::default_conditions(),
            actions: Vec::new(),
        }
    }

    pub fn default_enabled() -> bool {
        true
    }

    pub fn default_conditions() -> ConditionContainer {
        ConditionContainer::new(Operator::And)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let rule: Rule = serde_yaml::from_str("id: promote-editors").unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.conditions.operator, Operator::And);
        assert!(rule.conditions.is_empty());
        assert!(rule.actions.is_empty());
    }

    #[test]
    fn round_trips_through_yaml() {
        let raw = r#"
id: promote-editors
label: Promote editors
conditions:
  operator: or
  conditions:
    - condition_id: user_has_role
      context:
        roles: ["editor"]
actions:
  - action_id: user_role_add
    context:
      roles: ["reviewer"]
"#;
        let rule: Rule = serde_yaml::from_str(raw).unwrap();
        assert_eq!(rule.conditions.operator, Operator::Or);
        assert_eq!(rule.conditions.conditions.len(), 1);
        assert_eq!(rule.actions[0].action_id, "user_role_add");

        let serialized = serde_yaml::to_string(&rule).unwrap();
        let restored: Rule = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(restored, rule);
    }
}
