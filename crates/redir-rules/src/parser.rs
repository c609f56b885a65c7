use redir_core::{MatchMode, Rule};
use serde_json::{Map, Value};

/// Error type for rule list import and export.
#[derive(Debug, thiserror::Error)]
pub enum RuleListError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected an array of rules or an object with a \"rules\" array")]
    NotAList,
    #[error("Rule #{index} is not an object")]
    NotAnObject { index: usize },
    #[error("Rule #{index}: field \"{field}\" must be a string")]
    MissingField { index: usize, field: &'static str },
}

/// Parse a persisted rule list.
///
/// Accepts either a bare array or the storage shape `{ "rules": [...] }`.
/// Order is preserved, unknown fields are dropped, an absent `enabled`
/// means true and an absent or unknown `mode` means auto.
pub fn parse_rule_list(json: &str) -> Result<Vec<Rule>, RuleListError> {
    let value: Value = serde_json::from_str(json)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("rules") {
            Some(Value::Array(entries)) => entries,
            // Storage that was never written holds no rules.
            Some(Value::Null) | None if object.is_empty() => Vec::new(),
            _ => return Err(RuleListError::NotAList),
        },
        _ => return Err(RuleListError::NotAList),
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(fields) => rule_from_fields(index, &fields),
            _ => Err(RuleListError::NotAnObject { index }),
        })
        .collect()
}

/// Parse a single rule object, with the same defaults as [`parse_rule_list`].
pub fn parse_rule(json: &str) -> Result<Rule, RuleListError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(fields) => rule_from_fields(0, &fields),
        _ => Err(RuleListError::NotAnObject { index: 0 }),
    }
}

fn rule_from_fields(index: usize, fields: &Map<String, Value>) -> Result<Rule, RuleListError> {
    let string_field = |field: &'static str| {
        fields
            .get(field)
            .and_then(Value::as_str)
            .ok_or(RuleListError::MissingField { index, field })
    };

    let from = string_field("from")?;
    let to = string_field("to")?;

    let mode = match fields.get("mode") {
        None | Some(Value::Null) => MatchMode::Auto,
        Some(Value::String(mode)) => {
            let parsed = MatchMode::from_name(mode);
            if parsed == MatchMode::Auto && mode != "auto" {
                log::warn!("Rule #{index}: unknown mode {mode:?}, using auto");
            }
            parsed
        }
        Some(other) => {
            log::warn!("Rule #{index}: mode {other} is not a string, using auto");
            MatchMode::Auto
        }
    };

    let enabled = match fields.get("enabled") {
        Some(Value::Bool(enabled)) => *enabled,
        None | Some(Value::Null) => true,
        Some(other) => {
            log::warn!("Rule #{index}: enabled {other} is not a boolean, keeping the rule enabled");
            true
        }
    };

    Ok(Rule {
        from: from.to_string(),
        to: to.to_string(),
        mode,
        enabled,
    })
}

/// Export rules in the persisted JSON form, `enabled` always written.
pub fn export_rule_list(rules: &[Rule]) -> Result<String, RuleListError> {
    Ok(serde_json::to_string_pretty(rules)?)
}
