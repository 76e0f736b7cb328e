use serde::{Deserialize, Serialize};

/// Aggregated view of one engine run over a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Ids of the rules whose conditions passed, in execution order.
    pub triggered_rules: Vec<String>,
    /// Context names flagged for persistence by executed actions.
    pub auto_save: Vec<String>,
    /// Diagnostic notes recorded while applying rules.
    pub notes: Vec<String>,
}

impl RuleOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rule(&mut self, id: impl Into<String>) {
        self.triggered_rules.push(id.into());
    }

    pub fn flag_auto_save(&mut self, context: impl Into<String>) {
        let context = context.into();
        if !self.auto_save.contains(&context) {
            self.auto_save.push(context);
        }
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn requires_save(&self, context: &str) -> bool {
        self.auto_save.iter().any(|name| name == context)
    }

    pub fn triggered(&self) -> bool {
        !self.triggered_rules.is_empty()
    }
}
