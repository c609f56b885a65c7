//! Redirect Rule Engine Core Library
//!
//! This crate rewrites URLs with user-defined rules and resolves the
//! resulting redirect chains.
//!
//! # Architecture
//!
//! A rule pairs a `from` pattern with a `to` template. Patterns are either
//! case-insensitive regular expressions or URL patterns matched per URL
//! component; auto mode tries URL patterns first. A matching rule renders its
//! template against the captures to produce the next URL, and the chain
//! resolver reapplies the rule set until the chain settles, loops, or runs
//! out of budget. Nothing here raises on bad rule content: invalid patterns
//! never match and broken placeholders stay verbatim.
//!
//! # Modules
//!
//! - `url`: Component splitting for absolute URLs without allocations
//! - `pattern`: Regex and URL-pattern matchers
//! - `template`: `$N` and `{{ path | pipe }}` rendering
//! - `rule`: Single-rule evaluation
//! - `chain`: Redirect chain resolution
//! - `throttle`: Per-key redirect throttle across navigations
//! - `redirector`: Host context tying rules and throttle together
//! - `types`: Shared type definitions

pub mod chain;
pub mod pattern;
pub mod redirector;
pub mod rule;
pub mod template;
pub mod throttle;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use chain::{resolve, resolve_with, RuleSet};
pub use pattern::{match_pattern, validate_pattern, Captures, CompiledPattern, PatternError};
pub use redirector::{NavigationDecision, Redirector};
pub use rule::{apply, CompiledRule};
pub use template::{render, Pipe};
pub use throttle::{RedirectThrottle, ThrottleConfig};
pub use types::{ChainResult, ChainStatus, MatchMode, MatchOutcome, ResolveOptions, Rule, DEFAULT_MAX_ITERATIONS};
