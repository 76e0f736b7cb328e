use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RuleError;
use crate::rule::Rule;

/// Load rule definitions from a YAML/JSON file or a directory of them.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<Rule>, RuleError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RuleError::MissingPath(path.display().to_string()));
    }

    let mut rules = if path.is_dir() {
        load_from_directory(path)?
    } else {
        load_from_file(path)?
    };

    deduplicate(&rules)?;
    rules.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(rules)
}

fn load_from_directory(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let mut rules = Vec::new();
    for entry in fs::read_dir(path).map_err(|err| RuleError::from_io(path, err))? {
        let file = entry.map_err(|err| RuleError::from_io(path, err))?.path();
        if !file.is_file() {
            continue;
        }
        let ext = file.extension().and_then(|value| value.to_str());
        if matches!(ext, Some("json" | "yaml" | "yml")) {
            rules.extend(load_from_file(&file)?);
        }
    }
    Ok(rules)
}

fn load_from_file(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let raw = fs::read_to_string(path).map_err(|err| RuleError::from_io(path, err))?;
    parse_rules(&raw, path)
}

/// Accepts a `{ rules: [...] }` document, a bare rule list or a single rule.
fn parse_rules(raw: &str, path: &Path) -> Result<Vec<Rule>, RuleError> {
    if let Ok(doc) = serde_yaml::from_str::<RuleDocument>(raw) {
        return Ok(doc.rules);
    }
    if let Ok(list) = serde_yaml::from_str::<Vec<Rule>>(raw) {
        return Ok(list);
    }
    match serde_yaml::from_str::<Rule>(raw) {
        Ok(rule) => Ok(vec![rule]),
        Err(err) => Err(RuleError::parse_error(
            path.to_path_buf(),
            format!("not a rules document, a rule list or a single rule: {err}"),
        )),
    }
}

fn deduplicate(rules: &[Rule]) -> Result<(), RuleError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.id.clone()) {
            return Err(RuleError::DuplicateRule {
                id: rule.id.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    rules: Vec<Rule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_rules_document() {
        let raw = r#"
rules:
  - id: promote-editors
    actions:
      - action_id: user_role_add
        context:
          roles: ["reviewer"]
  - id: audit
"#;
        let rules = parse_rules(raw, Path::new("rules.yaml")).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "promote-editors");
    }

    #[test]
    fn parses_a_bare_list_and_a_single_rule() {
        let list = parse_rules("- id: a\n- id: b\n", Path::new("rules.yaml")).unwrap();
        assert_eq!(list.len(), 2);

        let single = parse_rules("id: only\n", Path::new("rule.yaml")).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].id, "only");
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let err = parse_rules(": not rules", Path::new("broken.yaml")).unwrap_err();
        assert!(matches!(err, RuleError::Parse { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let rules = parse_rules("- id: a\n- id: a\n", Path::new("rules.yaml")).unwrap();
        let err = deduplicate(&rules).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateRule { id } if id == "a"));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = load_rules("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, RuleError::MissingPath(_)));
    }
}
