use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::action::{ActionPlugin, UserRoleAdd, USER_ROLE_ADD};
use crate::condition::{ConditionPlugin, UserHasRole, USER_HAS_ROLE};
use crate::error::RuleError;
use crate::expression::{
    ConditionContainer, ConditionExpression, ExpressionNode, Operator, EXPRESSION_AND,
    EXPRESSION_CONDITION, EXPRESSION_OR,
};

type ConditionFactory = fn(&Map<String, Value>) -> Result<Box<dyn ConditionPlugin>, RuleError>;
type ActionFactory = fn(&Map<String, Value>) -> Result<Box<dyn ActionPlugin>, RuleError>;

fn user_has_role_factory(
    config: &Map<String, Value>,
) -> Result<Box<dyn ConditionPlugin>, RuleError> {
    Ok(Box::new(UserHasRole::from_config(config)?))
}

fn user_role_add_factory(config: &Map<String, Value>) -> Result<Box<dyn ActionPlugin>, RuleError> {
    Ok(Box::new(UserRoleAdd::from_config(config)?))
}

/// Stand-in for the host's plugin discovery: maps plugin ids to factories
/// that instantiate configured condition/action plugins, and reconstructs
/// expression nodes from their serialized configuration.
pub struct PluginManager {
    conditions: HashMap<&'static str, ConditionFactory>,
    actions: HashMap<&'static str, ActionFactory>,
}

impl PluginManager {
    /// Manager with the built-in user plugins registered.
    pub fn new() -> Self {
        let mut manager = Self {
            conditions: HashMap::new(),
            actions: HashMap::new(),
        };
        manager.register_condition(USER_HAS_ROLE, user_has_role_factory);
        manager.register_action(USER_ROLE_ADD, user_role_add_factory);
        manager
    }

    pub fn register_condition(&mut self, id: &'static str, factory: ConditionFactory) {
        self.conditions.insert(id, factory);
    }

    pub fn register_action(&mut self, id: &'static str, factory: ActionFactory) {
        self.actions.insert(id, factory);
    }

    pub fn create_condition(
        &self,
        id: &str,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn ConditionPlugin>, RuleError> {
        let factory = self
            .conditions
            .get(id)
            .ok_or_else(|| RuleError::UnknownPlugin(id.to_string()))?;
        factory(config)
    }

    pub fn create_action(
        &self,
        id: &str,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn ActionPlugin>, RuleError> {
        let factory = self
            .actions
            .get(id)
            .ok_or_else(|| RuleError::UnknownPlugin(id.to_string()))?;
        factory(config)
    }

    /// Instantiate an expression node from a plugin id and configuration.
    /// The configuration's uuid is always discarded so the new node gets a
    /// fresh identity; container children are discarded as well since the
    /// caller re-parents them explicitly.
    pub fn create_expression(
        &self,
        plugin_id: &str,
        mut configuration: Value,
    ) -> Result<ExpressionNode, RuleError> {
        let config = configuration.as_object_mut().ok_or_else(|| {
            RuleError::InvalidArgument("expression configuration must be an object".to_string())
        })?;
        config.remove("uuid");

        match plugin_id {
            EXPRESSION_AND | EXPRESSION_OR => {
                config.remove("conditions");
                let operator = if plugin_id == EXPRESSION_AND {
                    Operator::And
                } else {
                    Operator::Or
                };
                config.insert("operator".to_string(), serde_json::to_value(operator)?);
                let container: ConditionContainer = serde_json::from_value(configuration)?;
                Ok(ExpressionNode::Container(container))
            }
            EXPRESSION_CONDITION => {
                let condition: ConditionExpression = serde_json::from_value(configuration)?;
                Ok(ExpressionNode::Condition(condition))
            }
            other => Err(RuleError::UnknownPlugin(other.to_string())),
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
