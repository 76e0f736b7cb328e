use tracing::debug;

use crate::action::ExecutionContext;
use crate::condition::EvaluationContext;
use crate::error::RuleError;
use crate::manager::PluginManager;
use crate::outcome::RuleOutcome;
use crate::rule::Rule;
use crate::user::{RoleStore, User};

/// Runtime executor that evaluates a user against a set of reaction rules.
pub struct RuleEngine {
    rules: Vec<Rule>,
    manager: PluginManager,
}

impl RuleEngine {
    /// Construct an engine from the provided rules with the built-in
    /// plugins, sorting the rules by id.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self::with_manager(rules, PluginManager::new())
    }

    pub fn with_manager(mut rules: Vec<Rule>, manager: PluginManager) -> Self {
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        Self { rules, manager }
    }

    /// Borrow the underlying rule set.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    /// Whether the engine contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every enabled rule against the user and execute the actions
    /// of those whose condition tree passes. The user is marked as needing
    /// a save when any executed action flagged the `user` context.
    pub fn apply(&self, user: &mut User, roles: &RoleStore) -> Result<RuleOutcome, RuleError> {
        let mut outcome = RuleOutcome::new();

        for rule in &self.rules {
            if !rule.is_enabled() {
                continue;
            }

            let matched = rule.conditions.evaluate(
                &self.manager,
                &EvaluationContext { user: &*user, roles },
            )?;
            if !matched {
                continue;
            }

            debug!(rule_id = %rule.id, "rule conditions matched");
            outcome.record_rule(rule.id.clone());
            if let Some(label) = &rule.label {
                outcome.push_note(label.clone());
            }

            for config in &rule.actions {
                let mut action = self.manager.create_action(&config.action_id, &config.context)?;
                action.execute(&mut ExecutionContext {
                    user: &mut *user,
                    roles,
                })?;
                for context in action.auto_save_context() {
                    outcome.flag_auto_save(context);
                }
            }
        }

        if outcome.requires_save("user") {
            user.mark_for_save();
        }
        Ok(outcome)
    }
}
