//! Pattern matching for rule `from` patterns
//!
//! Two grammars are supported: case-insensitive regular expressions and
//! URL patterns (`:name` groups and `*` wildcards per URL component). Auto
//! mode is an ordered trial of both, URL pattern first.
//!
//! Patterns that fail to compile never match. Nothing in this module panics
//! or returns an error for bad user input at match time.

mod regex;
mod url_pattern;

use std::collections::BTreeMap;

use crate::types::MatchMode;
use crate::url::Component;

pub use self::regex::RegexMatcher;
pub use self::url_pattern::UrlPatternMatcher;

/// Error type for pattern compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),
    #[error("Invalid URL pattern: {0}")]
    InvalidUrlPattern(String),
}

// =============================================================================
// Captures
// =============================================================================

/// Groups extracted by a regex match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexCaptures {
    /// The string the regex ran against
    pub input: String,
    /// Group 0 is the whole match; unmatched optional groups are None
    pub groups: Vec<Option<String>>,
    /// Named group name to group index
    pub names: BTreeMap<String, usize>,
}

/// Result of matching one URL component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMatch {
    pub input: String,
    /// Group name (or positional index for unnamed groups) to value
    pub groups: BTreeMap<String, Option<String>>,
}

/// Groups extracted by a URL-pattern match, keyed by URL component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPatternCaptures {
    components: [ComponentMatch; 8],
    /// Full URL followed by every pattern group in pattern order, so that
    /// `$N` works the same as for regex captures.
    positional: Vec<Option<String>>,
}

impl UrlPatternCaptures {
    #[inline]
    pub fn component(&self, component: Component) -> &ComponentMatch {
        &self.components[component.index()]
    }

    pub(crate) fn set(&mut self, component: Component, value: ComponentMatch) {
        self.components[component.index()] = value;
    }

    pub(crate) fn push_positional(&mut self, value: Option<String>) {
        self.positional.push(value);
    }
}

/// Captures produced by a successful match, shaped by the grammar that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captures {
    Regex(RegexCaptures),
    UrlPattern(UrlPatternCaptures),
}

impl Captures {
    /// Look up a dotted template path.
    ///
    /// The outer Option is None when any path segment does not exist; the
    /// inner Option is None for a group that exists but did not participate
    /// in the match.
    pub fn lookup(&self, path: &[&str]) -> Option<Option<&str>> {
        match self {
            Captures::Regex(caps) => match path {
                ["input"] => Some(Some(caps.input.as_str())),
                ["groups", key] => {
                    let index = match key.parse::<usize>() {
                        Ok(index) => index,
                        Err(_) => *caps.names.get(*key)?,
                    };
                    caps.groups.get(index).map(|group| group.as_deref())
                }
                _ => None,
            },
            Captures::UrlPattern(caps) => match path {
                [component, "input"] => {
                    let component = Component::from_name(component)?;
                    Some(Some(caps.component(component).input.as_str()))
                }
                [component, "groups", key] => {
                    let component = Component::from_name(component)?;
                    caps.component(component)
                        .groups
                        .get(*key)
                        .map(|group| group.as_deref())
                }
                _ => None,
            },
        }
    }

    /// Positional group for `$N` substitution. Index 0 is the whole match
    /// (the whole URL for URL patterns); None means out of range.
    pub fn positional(&self, index: usize) -> Option<Option<&str>> {
        let groups = match self {
            Captures::Regex(caps) => &caps.groups,
            Captures::UrlPattern(caps) => &caps.positional,
        };
        groups.get(index).map(|group| group.as_deref())
    }

    /// Number of positional groups excluding group 0.
    pub fn positional_count(&self) -> usize {
        match self {
            Captures::Regex(caps) => caps.groups.len().saturating_sub(1),
            Captures::UrlPattern(caps) => caps.positional.len().saturating_sub(1),
        }
    }
}

// =============================================================================
// Compiled Pattern
// =============================================================================

/// A `from` pattern compiled for its match mode.
///
/// Compilation never fails: a grammar that rejects the pattern simply has
/// no matcher and never matches.
#[derive(Debug)]
pub struct CompiledPattern {
    mode: MatchMode,
    url_pattern: Option<UrlPatternMatcher>,
    regex: Option<RegexMatcher>,
}

impl CompiledPattern {
    pub fn compile(pattern: &str, mode: MatchMode) -> Self {
        let url_pattern = match mode {
            MatchMode::Auto | MatchMode::UrlPattern => {
                compile_or_log(pattern, mode, UrlPatternMatcher::new(pattern))
            }
            MatchMode::Regex => None,
        };
        let regex = match mode {
            MatchMode::Auto | MatchMode::Regex => {
                compile_or_log(pattern, mode, RegexMatcher::new(pattern))
            }
            MatchMode::UrlPattern => None,
        };

        Self {
            mode,
            url_pattern,
            regex,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// True when no grammar accepted the pattern.
    pub fn is_dead(&self) -> bool {
        self.url_pattern.is_none() && self.regex.is_none()
    }

    /// Match a URL, URL pattern first, then regex.
    pub fn captures(&self, url: &str) -> Option<Captures> {
        if let Some(matcher) = &self.url_pattern {
            if let Some(caps) = matcher.captures(url) {
                return Some(Captures::UrlPattern(caps));
            }
        }
        if let Some(matcher) = &self.regex {
            if let Some(caps) = matcher.captures(url) {
                return Some(Captures::Regex(caps));
            }
        }
        None
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.captures(url).is_some()
    }
}

fn compile_or_log<T>(pattern: &str, mode: MatchMode, result: Result<T, PatternError>) -> Option<T> {
    match result {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            // Auto mode expects one grammar to reject most patterns.
            if mode == MatchMode::Auto {
                log::trace!("Pattern {pattern:?} rejected: {e}");
            } else {
                log::debug!("Invalid pattern {pattern:?}: {e}");
            }
            None
        }
    }
}

/// Match `pattern` against `url` under `mode`, compiling on the fly.
pub fn match_pattern(pattern: &str, mode: MatchMode, url: &str) -> Option<Captures> {
    CompiledPattern::compile(pattern, mode).captures(url)
}

/// Check whether `pattern` compiles under `mode`.
pub fn validate_pattern(pattern: &str, mode: MatchMode) -> Result<(), PatternError> {
    match mode {
        MatchMode::Regex => RegexMatcher::new(pattern).map(|_| ()),
        MatchMode::UrlPattern => UrlPatternMatcher::new(pattern).map(|_| ()),
        MatchMode::Auto => UrlPatternMatcher::new(pattern)
            .map(|_| ())
            .or_else(|_| RegexMatcher::new(pattern).map(|_| ())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prefers_url_pattern() {
        let caps = match_pattern("https://youtu.be/:id", MatchMode::Auto, "https://youtu.be/abc").unwrap();
        assert!(matches!(caps, Captures::UrlPattern(_)));
        assert_eq!(caps.lookup(&["pathname", "groups", "id"]), Some(Some("abc")));
    }

    #[test]
    fn test_auto_falls_back_to_regex() {
        let caps = match_pattern("^https://youtu.be/(.*)", MatchMode::Auto, "https://youtu.be/abc").unwrap();
        assert!(matches!(caps, Captures::Regex(_)));
        assert_eq!(caps.positional(1), Some(Some("abc")));
    }

    #[test]
    fn test_auto_url_pattern_groups_are_positional() {
        let caps = match_pattern("https://youtu.be/(.*)", MatchMode::Auto, "https://youtu.be/abc").unwrap();
        assert!(matches!(caps, Captures::UrlPattern(_)));
        assert_eq!(caps.positional(0), Some(Some("https://youtu.be/abc")));
        assert_eq!(caps.positional(1), Some(Some("abc")));
        assert_eq!(caps.positional_count(), 1);
    }

    #[test]
    fn test_explicit_regex_skips_url_pattern() {
        let caps = match_pattern("https://youtu.be/:id", MatchMode::Regex, "https://youtu.be/:id").unwrap();
        assert!(matches!(caps, Captures::Regex(_)));
        assert!(match_pattern("https://youtu.be/:id", MatchMode::Regex, "https://youtu.be/abc").is_none());
    }

    #[test]
    fn test_explicit_url_pattern_skips_regex() {
        assert!(match_pattern("youtu.be/(.*)", MatchMode::Auto, "https://youtu.be/abc").is_some());
        assert!(match_pattern("youtu.be/(.*)", MatchMode::UrlPattern, "https://youtu.be/abc").is_none());
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let compiled = CompiledPattern::compile("([unclosed", MatchMode::Auto);
        assert!(compiled.is_dead());
        assert!(!compiled.is_match("([unclosed"));
        assert!(validate_pattern("([unclosed", MatchMode::Auto).is_err());
    }

    #[test]
    fn test_lookup_missing_segments() {
        let caps = match_pattern("https://youtu.be/:id", MatchMode::UrlPattern, "https://youtu.be/abc").unwrap();
        assert_eq!(caps.lookup(&["pathname", "groups", "nope"]), None);
        assert_eq!(caps.lookup(&["nowhere", "groups", "id"]), None);
        assert_eq!(caps.lookup(&["pathname"]), None);
        assert_eq!(caps.lookup(&["pathname", "input"]), Some(Some("/abc")));
        assert_eq!(caps.positional(1), Some(Some("abc")));
        assert_eq!(caps.positional(2), None);
    }

    #[test]
    fn test_regex_lookup_by_name_and_index() {
        let caps = match_pattern(
            r"https://example\.com/(?P<section>\w+)/(\d+)?",
            MatchMode::Regex,
            "https://example.com/news/",
        )
        .unwrap();
        assert_eq!(caps.lookup(&["groups", "section"]), Some(Some("news")));
        assert_eq!(caps.lookup(&["groups", "1"]), Some(Some("news")));
        assert_eq!(caps.lookup(&["groups", "2"]), Some(None));
        assert_eq!(caps.lookup(&["groups", "9"]), None);
        assert_eq!(caps.positional_count(), 2);
    }
}
