//! Regex-mode matcher

use std::collections::BTreeMap;

use fancy_regex::Regex;

use super::{PatternError, RegexCaptures};

/// A case-insensitive regular expression matched anywhere in the URL.
#[derive(Debug)]
pub struct RegexMatcher {
    regex: Regex,
    names: BTreeMap<String, usize>,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("(?i){pattern}"))
            .map_err(|e| PatternError::InvalidRegex(e.to_string()))?;

        let names = regex
            .capture_names()
            .enumerate()
            .filter_map(|(index, name)| name.map(|name| (name.to_string(), index)))
            .collect();

        Ok(Self { regex, names })
    }

    /// Captures of the leftmost match.
    pub fn captures(&self, url: &str) -> Option<RegexCaptures> {
        let captures = match self.regex.captures(url) {
            Ok(Some(captures)) => captures,
            Ok(None) => return None,
            Err(e) => {
                // Backtrack limit and similar runtime failures fail closed.
                log::debug!("Regex {} failed on {url:?}: {e}", self.regex.as_str());
                return None;
            }
        };

        let groups = (0..captures.len())
            .map(|index| captures.get(index).map(|m| m.as_str().to_string()))
            .collect();

        Some(RegexCaptures {
            input: url.to_string(),
            groups,
            names: self.names.clone(),
        })
    }
}
