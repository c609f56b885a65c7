//! Rule list diagnostics
//!
//! Bad rule content never fails at match time; it silently never matches
//! or renders verbatim. These checks surface such rules to the user.

use std::collections::HashMap;
use std::fmt;

use redir_core::template::Pipe;
use redir_core::url::Component;
use redir_core::{validate_pattern, Rule};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Position of the rule in the list
    pub index: usize,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    fn error(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "rule #{}: {level}: {}", self.index, self.message)
    }
}

/// Check every rule. Disabled rules are checked too, since they may be
/// re-enabled later.
pub fn validate_rules(rules: &[Rule]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut first_seen: HashMap<&Rule, usize> = HashMap::new();

    for (index, rule) in rules.iter().enumerate() {
        if rule.from.is_empty() {
            diagnostics.push(Diagnostic::error(index, "empty \"from\" pattern"));
        } else if let Err(e) = validate_pattern(&rule.from, rule.mode) {
            diagnostics.push(Diagnostic::error(index, format!("pattern never matches: {e}")));
        }

        if rule.to.is_empty() {
            diagnostics.push(Diagnostic::warning(index, "empty \"to\" template"));
        }
        check_template(index, &rule.to, &mut diagnostics);

        match first_seen.get(rule) {
            Some(first) => {
                diagnostics.push(Diagnostic::warning(index, format!("duplicate of rule #{first}")));
            }
            None => {
                first_seen.insert(rule, index);
            }
        }
    }

    diagnostics
}

fn check_template(index: usize, template: &str, diagnostics: &mut Vec<Diagnostic>) {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            diagnostics.push(Diagnostic::warning(
                index,
                "unterminated \"{{\" placeholder is copied literally",
            ));
            return;
        };

        let expression = &after[..end];
        let mut stages = expression.split('|');
        let path = stages.next().unwrap_or_default().trim();
        let root = path.split('.').next().unwrap_or_default();
        if !is_known_root(root) {
            diagnostics.push(Diagnostic::warning(
                index,
                format!("placeholder {{{{{expression}}}}} does not name a capture and is copied verbatim"),
            ));
        }
        for stage in stages {
            let name = stage.trim();
            if Pipe::from_name(name).is_none() {
                diagnostics.push(Diagnostic::warning(index, format!("unknown pipe {name:?} is ignored")));
            }
        }

        rest = &after[end + 2..];
    }
}

fn is_known_root(root: &str) -> bool {
    matches!(root, "input" | "groups") || Component::from_name(root).is_some()
}
