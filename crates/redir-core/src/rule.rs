//! Rule evaluation: pattern match followed by template rendering

use crate::pattern::CompiledPattern;
use crate::template::render;
use crate::types::{MatchOutcome, Rule};

/// A rule with its `from` pattern compiled once.
#[derive(Debug)]
pub struct CompiledRule {
    rule: Rule,
    pattern: CompiledPattern,
}

impl CompiledRule {
    pub fn new(rule: Rule) -> Self {
        let pattern = CompiledPattern::compile(&rule.from, rule.mode);
        Self { rule, pattern }
    }

    #[inline]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.rule.enabled
    }

    /// True when the pattern compiles under none of the grammars its mode
    /// allows. Such a rule can never match.
    pub fn is_dead(&self) -> bool {
        self.pattern.is_dead()
    }

    /// Apply the rule to `url`.
    pub fn apply(&self, url: &str) -> MatchOutcome {
        if !self.rule.enabled {
            return MatchOutcome::unmatched(url);
        }
        evaluate(&self.pattern, &self.rule.to, url)
    }
}

impl From<Rule> for CompiledRule {
    fn from(rule: Rule) -> Self {
        Self::new(rule)
    }
}

fn evaluate(pattern: &CompiledPattern, to: &str, url: &str) -> MatchOutcome {
    match pattern.captures(url) {
        Some(captures) => MatchOutcome::matched(render(to, &captures)),
        None => MatchOutcome::unmatched(url),
    }
}

/// Apply a single rule to `url`, compiling its pattern on the fly.
pub fn apply(rule: &Rule, url: &str) -> MatchOutcome {
    if !rule.enabled {
        return MatchOutcome::unmatched(url);
    }
    let pattern = CompiledPattern::compile(&rule.from, rule.mode);
    evaluate(&pattern, &rule.to, url)
}
