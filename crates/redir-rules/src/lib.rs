//! Redirect Rule List Tooling
//!
//! This crate imports and exports rule lists in their persisted JSON form,
//! removes rules that can never take part in resolution and reports rules
//! that are likely mistakes.

pub mod diagnostics;
pub mod optimizer;
pub mod parser;

pub use diagnostics::{validate_rules, Diagnostic, Severity};
pub use optimizer::{dedupe_rules, optimize_rules, OptimizeStats};
pub use parser::{export_rule_list, parse_rule, parse_rule_list, RuleListError};
