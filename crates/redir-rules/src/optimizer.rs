use std::collections::HashSet;

use redir_core::{MatchMode, Rule};

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub disabled: usize,
    pub deduped: usize,
}

/// Strip rules that cannot affect resolution: disabled rules and later
/// copies of an earlier rule (first match wins, so copies never fire).
///
/// The result is for resolution only; exporting it would lose the user's
/// disabled rules.
pub fn optimize_rules(rules: &mut Vec<Rule>) -> OptimizeStats {
    let before = rules.len();

    rules.retain(|rule| rule.enabled);
    let disabled = before - rules.len();

    let mut seen: HashSet<RuleKey> = HashSet::new();
    let mut deduped = 0usize;
    rules.retain(|rule| {
        let key = RuleKey::from(rule);
        if seen.contains(&key) {
            deduped += 1;
            false
        } else {
            seen.insert(key);
            true
        }
    });

    let after = rules.len();
    if after != before {
        log::debug!("Optimized rules: {before} -> {after} ({disabled} disabled, {deduped} duplicates)");
    }

    OptimizeStats {
        before,
        after,
        disabled,
        deduped,
    }
}

/// Remove later copies of a rule while keeping disabled rules.
/// Safe to export.
pub fn dedupe_rules(rules: &mut Vec<Rule>) -> usize {
    let before = rules.len();
    let mut seen: HashSet<Rule> = HashSet::new();
    rules.retain(|rule| seen.insert(rule.clone()));
    before - rules.len()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    from: String,
    to: String,
    mode: MatchMode,
}

impl From<&Rule> for RuleKey {
    fn from(rule: &Rule) -> Self {
        Self {
            from: rule.from.clone(),
            to: rule.to.clone(),
            mode: rule.mode,
        }
    }
}
