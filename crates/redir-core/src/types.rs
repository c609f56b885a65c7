//! Core type definitions for the redirect engine
//!
//! These types mirror the persisted rule schema and the values handed back
//! to the host navigation layer.

use serde::{Deserialize, Serialize};

// =============================================================================
// Match Mode
// =============================================================================

/// How a rule's `from` pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Try URL-pattern syntax first, then fall back to a regular expression.
    #[default]
    Auto,
    /// Case-insensitive regular expression
    Regex,
    /// Path/query template syntax with `:name` groups and `*` wildcards
    UrlPattern,
}

impl MatchMode {
    /// Parse from the persisted mode string. Absent or unknown means auto.
    pub fn from_name(name: &str) -> Self {
        match name {
            "regex" => Self::Regex,
            "url-pattern" => Self::UrlPattern,
            _ => Self::Auto,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Regex => Some("regex"),
            Self::UrlPattern => Some("url-pattern"),
        }
    }
}

// =============================================================================
// Rule
// =============================================================================

fn default_enabled() -> bool {
    true
}

fn is_auto(mode: &MatchMode) -> bool {
    *mode == MatchMode::Auto
}

/// A user-defined rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Pattern interpreted per `mode`
    pub from: String,
    /// Template with `$N` back-references and `{{ path | pipe }}` placeholders
    pub to: String,
    #[serde(default, skip_serializing_if = "is_auto")]
    pub mode: MatchMode,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Rule {
    /// Create an enabled auto-mode rule.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            mode: MatchMode::Auto,
            enabled: true,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// =============================================================================
// Match Outcome
// =============================================================================

/// Result of applying one rule to one URL.
///
/// When `matched` is false, `url` is the input unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    #[serde(rename = "match")]
    pub matched: bool,
    pub url: String,
}

impl MatchOutcome {
    pub fn matched(url: String) -> Self {
        Self { matched: true, url }
    }

    pub fn unmatched(url: &str) -> Self {
        Self {
            matched: false,
            url: url.to_string(),
        }
    }
}

// =============================================================================
// Chain Result
// =============================================================================

/// Classification of a resolved redirect chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainStatus {
    /// The chain reached a URL no rule matches
    #[serde(rename = "matched")]
    Matched,
    /// No rule matched the input URL
    #[serde(rename = "not-matched")]
    NotMatched,
    /// A produced URL repeated an earlier one
    #[serde(rename = "circular-redirect")]
    Circular,
    /// The iteration budget ran out while still producing new URLs
    #[serde(rename = "infinite-redirect")]
    Infinite,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotMatched => "not-matched",
            Self::Circular => "circular-redirect",
            Self::Infinite => "infinite-redirect",
        }
    }
}

impl std::fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a URL against an ordered rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResult {
    pub status: ChainStatus,
    /// Every intermediate and final URL in visitation order. The input URL
    /// is never included.
    pub urls: Vec<String>,
}

impl ChainResult {
    pub fn not_matched() -> Self {
        Self {
            status: ChainStatus::NotMatched,
            urls: Vec::new(),
        }
    }

    /// The URL to navigate to. Only `Matched` chains are actionable.
    pub fn terminal_url(&self) -> Option<&str> {
        match self.status {
            ChainStatus::Matched => self.urls.last().map(String::as_str),
            _ => None,
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Default iteration budget for chain resolution.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Chain resolution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    #[serde(default = "default_max_iterations", alias = "maxRedirects")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}
