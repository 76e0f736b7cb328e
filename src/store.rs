use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::RuleEngine;
use crate::error::RuleError;
use crate::rule::Rule;

/// Versioned revision of a stored rule component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRevision {
    pub version: u32,
    pub rule: Rule,
    pub saved_at: DateTime<Utc>,
    pub saved_by: Option<String>,
}

impl RuleRevision {
    fn new(version: u32, rule: Rule, saved_by: Option<String>) -> Self {
        Self {
            version,
            rule,
            saved_at: Utc::now(),
            saved_by,
        }
    }
}

/// In-memory stand-in for the host's rule-component storage, with version
/// tracking. Saves are last-write-wins.
#[derive(Default, Clone)]
pub struct ComponentStore {
    inner: Arc<RwLock<HashMap<String, Vec<RuleRevision>>>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest revision of every stored rule.
    pub fn list(&self) -> Vec<RuleRevision> {
        let inner = self.inner.read();
        inner
            .values()
            .filter_map(|revisions| revisions.last().cloned())
            .collect()
    }

    /// Latest revision of one rule, if stored.
    pub fn latest(&self, rule_id: &str) -> Option<RuleRevision> {
        let inner = self.inner.read();
        inner
            .get(rule_id)
            .and_then(|revisions| revisions.last().cloned())
    }

    /// Full revision history of one rule.
    pub fn history(&self, rule_id: &str) -> Vec<RuleRevision> {
        let inner = self.inner.read();
        inner.get(rule_id).cloned().unwrap_or_default()
    }

    /// Persist a rule component, appending a new revision. A blank rule id
    /// receives a generated one.
    pub fn save_component(&self, mut rule: Rule, saved_by: Option<String>) -> RuleRevision {
        let mut inner = self.inner.write();

        if rule.id.trim().is_empty() {
            rule.id = format!("rule-{}", Uuid::new_v4());
        }

        let revisions = inner.entry(rule.id.clone()).or_default();
        let version = revisions.last().map(|last| last.version + 1).unwrap_or(1);
        let revision = RuleRevision::new(version, rule, saved_by);
        revisions.push(revision.clone());
        revision
    }

    /// Disable a rule by appending a revision with `enabled = false`.
    pub fn disable(&self, rule_id: &str, saved_by: Option<String>) -> Result<RuleRevision, RuleError> {
        let mut inner = self.inner.write();
        let revisions = inner
            .get_mut(rule_id)
            .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;

        let latest = match revisions.last() {
            Some(last) => last.clone(),
            None => return Err(RuleError::NotFound(rule_id.to_string())),
        };
        if !latest.rule.enabled {
            return Ok(latest);
        }

        let mut disabled = latest.rule.clone();
        disabled.enabled = false;
        let revision = RuleRevision::new(latest.version + 1, disabled, saved_by);
        revisions.push(revision.clone());
        Ok(revision)
    }

    /// Build an engine over the latest enabled revisions.
    pub fn engine(&self) -> RuleEngine {
        let rules = self
            .list()
            .into_iter()
            .filter(|revision| revision.rule.enabled)
            .map(|revision| revision.rule)
            .collect();
        RuleEngine::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_are_versioned() {
        let store = ComponentStore::new();
        let first = store.save_component(Rule::new("promote"), None);
        assert_eq!(first.version, 1);

        let mut updated = first.rule.clone();
        updated.label = Some("Promote editors".into());
        let second = store.save_component(updated, Some("admin".into()));
        assert_eq!(second.version, 2);
        assert_eq!(second.saved_by.as_deref(), Some("admin"));

        let history = store.history("promote");
        assert_eq!(history.len(), 2);
        assert_eq!(store.latest("promote").unwrap().version, 2);
    }

    #[test]
    fn blank_rule_ids_are_generated() {
        let store = ComponentStore::new();
        let revision = store.save_component(Rule::new("  "), None);
        assert!(revision.rule.id.starts_with("rule-"));
    }

    #[test]
    fn disabling_creates_a_new_revision_and_hides_the_rule() {
        let store = ComponentStore::new();
        let saved = store.save_component(Rule::new("promote"), None);

        let disabled = store.disable("promote", Some("admin".into())).unwrap();
        assert!(!disabled.rule.enabled);
        assert_eq!(disabled.version, saved.version + 1);

        // Disabling twice is a no-op returning the existing revision.
        let again = store.disable("promote", None).unwrap();
        assert_eq!(again.version, disabled.version);

        assert!(store.engine().is_empty());
    }
}
