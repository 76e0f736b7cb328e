use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::condition::EvaluationContext;
use crate::error::RuleError;
use crate::manager::PluginManager;

/// Plugin id for an AND condition container.
pub const EXPRESSION_AND: &str = "rules_and";
/// Plugin id for an OR condition container.
pub const EXPRESSION_OR: &str = "rules_or";
/// Plugin id for a leaf condition expression.
pub const EXPRESSION_CONDITION: &str = "rules_condition";

/// Boolean combinator applied by a condition container to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And,
    Or,
}

/// Leaf expression: one configured condition plugin check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionExpression {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default)]
    pub weight: i32,
    pub condition_id: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ConditionExpression {
    pub fn new(condition_id: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            weight: 0,
            condition_id: condition_id.into(),
            context,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Container expression: an ordered group of child expressions combined
/// with AND or OR semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionContainer {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default)]
    pub weight: i32,
    pub operator: Operator,
    #[serde(default)]
    pub conditions: Vec<ExpressionNode>,
}

impl ConditionContainer {
    pub fn new(operator: Operator) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            weight: 0,
            operator,
            conditions: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_condition(mut self, node: impl Into<ExpressionNode>) -> Self {
        self.conditions.push(node.into());
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExpressionNode> {
        self.conditions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append a child expression, becoming its parent.
    pub fn add_expression_object(&mut self, node: ExpressionNode) {
        self.conditions.push(node);
    }

    /// Recursive lookup by uuid anywhere in the subtree.
    pub fn expression(&self, uuid: Uuid) -> Option<&ExpressionNode> {
        for node in &self.conditions {
            if node.uuid() == uuid {
                return Some(node);
            }
            if let ExpressionNode::Container(container) = node {
                if let Some(found) = container.expression(uuid) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Remove the expression with the given uuid anywhere in the subtree.
    /// Returns whether a node was removed.
    pub fn delete_expression(&mut self, uuid: Uuid) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|node| node.uuid() != uuid);
        if self.conditions.len() != before {
            return true;
        }
        self.conditions.iter_mut().any(|node| match node {
            ExpressionNode::Container(container) => container.delete_expression(uuid),
            ExpressionNode::Condition(_) => false,
        })
    }

    /// Stable sort of every sibling list in the subtree by weight.
    pub fn sort_by_weight(&mut self) {
        self.conditions.sort_by_key(ExpressionNode::weight);
        for node in &mut self.conditions {
            if let ExpressionNode::Container(container) = node {
                container.sort_by_weight();
            }
        }
    }

    /// Evaluate the container against the context. AND requires every child
    /// to pass and is vacuously true when empty; OR requires at least one
    /// child and is vacuously false when empty.
    pub fn evaluate(
        &self,
        manager: &PluginManager,
        context: &EvaluationContext<'_>,
    ) -> Result<bool, RuleError> {
        match self.operator {
            Operator::And => {
                for node in &self.conditions {
                    if !node.evaluate(manager, context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operator::Or => {
                for node in &self.conditions {
                    if node.evaluate(manager, context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// A node of the condition expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionNode {
    Container(ConditionContainer),
    Condition(ConditionExpression),
}

impl ExpressionNode {
    pub fn uuid(&self) -> Uuid {
        match self {
            ExpressionNode::Container(container) => container.uuid,
            ExpressionNode::Condition(condition) => condition.uuid,
        }
    }

    pub fn weight(&self) -> i32 {
        match self {
            ExpressionNode::Container(container) => container.weight,
            ExpressionNode::Condition(condition) => condition.weight,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ExpressionNode::Container(_))
    }

    pub fn as_container(&self) -> Option<&ConditionContainer> {
        match self {
            ExpressionNode::Container(container) => Some(container),
            ExpressionNode::Condition(_) => None,
        }
    }

    /// Plugin-type identifier for this node.
    pub fn plugin_id(&self) -> &'static str {
        match self {
            ExpressionNode::Container(container) => match container.operator {
                Operator::And => EXPRESSION_AND,
                Operator::Or => EXPRESSION_OR,
            },
            ExpressionNode::Condition(_) => EXPRESSION_CONDITION,
        }
    }

    /// Human readable label for form rows.
    pub fn label(&self) -> String {
        match self {
            ExpressionNode::Container(container) => match container.operator {
                Operator::And => "Condition set (AND)".to_string(),
                Operator::Or => "Condition set (OR)".to_string(),
            },
            ExpressionNode::Condition(condition) => condition.condition_id.clone(),
        }
    }

    /// Serializable configuration for this node, the counterpart of
    /// [`PluginManager::create_expression`] when cloning.
    pub fn configuration(&self) -> Value {
        match self {
            ExpressionNode::Container(container) => {
                serde_json::to_value(container).unwrap_or(Value::Null)
            }
            ExpressionNode::Condition(condition) => {
                serde_json::to_value(condition).unwrap_or(Value::Null)
            }
        }
    }

    pub fn evaluate(
        &self,
        manager: &PluginManager,
        context: &EvaluationContext<'_>,
    ) -> Result<bool, RuleError> {
        match self {
            ExpressionNode::Container(container) => container.evaluate(manager, context),
            ExpressionNode::Condition(condition) => manager
                .create_condition(&condition.condition_id, &condition.context)?
                .evaluate(context),
        }
    }
}

impl From<ConditionContainer> for ExpressionNode {
    fn from(value: ConditionContainer) -> Self {
        ExpressionNode::Container(value)
    }
}

impl From<ConditionExpression> for ExpressionNode {
    fn from(value: ConditionExpression) -> Self {
        ExpressionNode::Condition(value)
    }
}
