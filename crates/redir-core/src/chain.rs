//! Redirect chain resolution
//!
//! Rules are reapplied to each produced URL until no rule matches, a URL
//! repeats, or the iteration budget runs out. Per iteration the first
//! enabled rule that matches wins.

use crate::rule::CompiledRule;
use crate::types::{ChainResult, ChainStatus, MatchOutcome, ResolveOptions, Rule};

/// An ordered, precompiled rule list.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile an ordered rule list. Order is preserved.
    pub fn compile(rules: &[Rule]) -> Self {
        rules.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// First enabled rule matching `url`, with its index and outcome.
    pub fn find_match(&self, url: &str) -> Option<(usize, MatchOutcome)> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.is_enabled())
            .find_map(|(index, rule)| {
                let outcome = rule.apply(url);
                outcome.matched.then_some((index, outcome))
            })
    }

    /// Resolve with the default iteration budget.
    pub fn resolve(&self, url: &str) -> ChainResult {
        self.resolve_with(url, &ResolveOptions::default())
    }

    pub fn resolve_with(&self, url: &str, options: &ResolveOptions) -> ChainResult {
        let mut visited: Vec<String> = Vec::new();
        let mut current = url.to_string();

        for iteration in 0..options.max_iterations {
            let Some((index, outcome)) = self.find_match(&current) else {
                if iteration == 0 {
                    return ChainResult::not_matched();
                }
                return ChainResult {
                    status: ChainStatus::Matched,
                    urls: visited,
                };
            };

            log::debug!("Rule #{index} rewrote {current} -> {}", outcome.url);

            // Exact string comparison, no normalization.
            if visited.contains(&outcome.url) {
                visited.push(outcome.url);
                return ChainResult {
                    status: ChainStatus::Circular,
                    urls: visited,
                };
            }

            visited.push(outcome.url.clone());
            current = outcome.url;
        }

        ChainResult {
            status: ChainStatus::Infinite,
            urls: visited,
        }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(CompiledRule::new).collect(),
        }
    }
}

/// Resolve `url` against `rules` with the default iteration budget.
pub fn resolve(rules: &[Rule], url: &str) -> ChainResult {
    RuleSet::compile(rules).resolve(url)
}

pub fn resolve_with(rules: &[Rule], url: &str, options: &ResolveOptions) -> ChainResult {
    RuleSet::compile(rules).resolve_with(url, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchMode;

    #[test]
    fn test_single_hop() {
        let rules = [Rule::new(
            "^https://duckduckgo.com/\\?.*&q=(.*?)(&.*)?$",
            "https://www.google.com/search?q=$1",
        )];
        assert_eq!(
            resolve(&rules, "https://duckduckgo.com/?t=h_&q=js&ia=web"),
            ChainResult {
                status: ChainStatus::Matched,
                urls: vec!["https://www.google.com/search?q=js".into()],
            }
        );
    }

    #[test]
    fn test_not_matched() {
        let rules = [Rule::new("https://www.reddit.com/r/(.*?)/", "https://www.reddit.com/r/$1/top/")];
        assert_eq!(resolve(&rules, "https://www.google.com/"), ChainResult::not_matched());
    }

    #[test]
    fn test_empty_rule_set() {
        assert_eq!(resolve(&[], "https://a.com/"), ChainResult::not_matched());
    }

    #[test]
    fn test_lazy_group_loops_back_to_itself() {
        // Unanchored regex: the lazy group stops at the first '/' on every pass.
        let rules = [Rule::new("https://www.reddit.com/r/(.*?)/", "https://www.reddit.com/r/$1/top/")
            .with_mode(MatchMode::Regex)];
        assert_eq!(
            resolve(&rules, "https://www.reddit.com/r/MadeMeSmile/"),
            ChainResult {
                status: ChainStatus::Circular,
                urls: vec![
                    "https://www.reddit.com/r/MadeMeSmile/top/".into(),
                    "https://www.reddit.com/r/MadeMeSmile/top/".into(),
                ],
            }
        );
    }

    #[test]
    fn test_url_pattern_group_keeps_growing() {
        // URL patterns are anchored per component, so the same rule grows the path.
        let rules = [Rule::new("https://www.reddit.com/r/(.*?)/", "https://www.reddit.com/r/$1/top/")];
        let result = resolve_with(&rules, "https://www.reddit.com/r/a/", &ResolveOptions { max_iterations: 3 });
        assert_eq!(result.status, ChainStatus::Infinite);
        assert_eq!(
            result.urls,
            vec![
                "https://www.reddit.com/r/a/top/".to_string(),
                "https://www.reddit.com/r/a/top/top/".into(),
                "https://www.reddit.com/r/a/top/top/top/".into(),
            ]
        );
    }

    #[test]
    fn test_anchored_rule_terminates() {
        let rules = [Rule::new("https://www.reddit.com/r/([^/]+)/$", "https://www.reddit.com/r/$1/top/")];
        assert_eq!(
            resolve(&rules, "https://www.reddit.com/r/MadeMeSmile/"),
            ChainResult {
                status: ChainStatus::Matched,
                urls: vec!["https://www.reddit.com/r/MadeMeSmile/top/".into()],
            }
        );
    }

    #[test]
    fn test_multi_rule_chain() {
        let target = "https://www.reddit.com/r/chrome/comments/1mr4kcr/why_is_chrome_listing_my_extensions_at_the_bottom/n9oca19/?%24deep_link=true&ref=email_comment_reply&ref_campaign=email_comment_reply";
        let url = format!("https://click.redditmail.com/CL0/{}", urlencoding::encode(target));
        let rules = [
            Rule::new("(https://www.reddit.com/r/.*/comments/.*)\\?.*&ref=email_comment_reply&.*", "$1"),
            Rule::new("https://click.redditmail.com/CL0/(.*)", "$1"),
        ];
        assert_eq!(
            resolve(&rules, &url),
            ChainResult {
                status: ChainStatus::Matched,
                urls: vec![
                    target.to_string(),
                    "https://www.reddit.com/r/chrome/comments/1mr4kcr/why_is_chrome_listing_my_extensions_at_the_bottom/n9oca19/".into(),
                ],
            }
        );
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let rules = [
            Rule::new("https://a.com/(.*)", "https://wrong.com/$1").disabled(),
            Rule::new("https://a.com/(.*)", "https://b.com/$1"),
        ];
        assert_eq!(resolve(&rules, "https://a.com/x").urls, vec!["https://b.com/x".to_string()]);
    }

    #[test]
    fn test_first_match_wins() {
        let rules = [
            Rule::new("https://a.com/special", "https://special.com/").with_mode(MatchMode::Regex),
            Rule::new("https://a.com/(.*)", "https://b.com/$1"),
        ];
        let set = RuleSet::compile(&rules);
        let (index, outcome) = set.find_match("https://a.com/special").unwrap();
        assert_eq!(index, 0);
        assert_eq!(outcome.url, "https://special.com/");
        assert_eq!(set.find_match("https://a.com/other").unwrap().0, 1);
    }

    #[test]
    fn test_custom_budget() {
        let rules = [Rule::new("https://x.com/r/(.*)/", "https://x.com/r/$1/top/")];
        let result = resolve_with(&rules, "https://x.com/r/Foo/", &ResolveOptions { max_iterations: 2 });
        assert_eq!(result.status, ChainStatus::Infinite);
        assert_eq!(result.urls.len(), 2);
    }

    #[test]
    fn test_zero_budget_reports_infinite() {
        let rules = [Rule::new("(.*)", "$1")];
        let result = resolve_with(&rules, "https://a.com/", &ResolveOptions { max_iterations: 0 });
        assert_eq!(result.status, ChainStatus::Infinite);
        assert!(result.urls.is_empty());
    }
}
