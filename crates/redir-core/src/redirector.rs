//! Host context: the current rule set plus the redirect throttle
//!
//! A host creates one `Redirector` at startup, calls `refresh` whenever the
//! stored rules change and consults it on every intercepted navigation.

use crate::chain::RuleSet;
use crate::throttle::{RedirectThrottle, ThrottleConfig};
use crate::types::{ChainResult, ChainStatus, ResolveOptions, Rule};

/// What the host should do with an intercepted navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Let the navigation continue unchanged
    Proceed,
    /// Navigate to this URL instead
    Redirect(String),
    /// The key hit the throttle ceiling; do not redirect
    Suppressed,
}

/// Rule set, resolution options and throttle owned by the host.
#[derive(Debug, Default)]
pub struct Redirector {
    rules: RuleSet,
    options: ResolveOptions,
    throttle: RedirectThrottle,
}

impl Redirector {
    pub fn new(rules: &[Rule]) -> Self {
        Self::with_options(rules, ResolveOptions::default(), ThrottleConfig::default())
    }

    pub fn with_options(rules: &[Rule], options: ResolveOptions, throttle: ThrottleConfig) -> Self {
        Self {
            rules: RuleSet::compile(rules),
            options,
            throttle: RedirectThrottle::new(throttle),
        }
    }

    /// Replace the rule set. Throttle state is kept.
    pub fn refresh(&mut self, rules: &[Rule]) {
        self.rules = RuleSet::compile(rules);
        log::debug!("Loaded {} rules", self.rules.len());
    }

    #[inline]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[inline]
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ResolveOptions) {
        self.options = options;
    }

    #[inline]
    pub fn throttle(&self) -> &RedirectThrottle {
        &self.throttle
    }

    pub fn resolve(&self, url: &str) -> ChainResult {
        self.rules.resolve_with(url, &self.options)
    }

    /// Terminal URL of a `Matched` chain. Other statuses are logged and
    /// yield None.
    pub fn redirect_url(&self, url: &str) -> Option<String> {
        let result = self.resolve(url);
        match result.status {
            ChainStatus::Matched => result.urls.into_iter().last(),
            ChainStatus::NotMatched => {
                log::debug!("No matching rule for url: {url}");
                None
            }
            ChainStatus::Circular | ChainStatus::Infinite => {
                log::error!("No redirect for url: {url}, status: {}", result.status);
                None
            }
        }
    }

    /// Decide an intercepted navigation. `key` is the throttle key (the URL
    /// itself or a tab id) and `now_ms` the host clock.
    ///
    /// The ceiling check and the count happen under one throttle lock, so
    /// concurrent navigations on one key never exceed the ceiling.
    pub fn on_navigation(&self, key: &str, url: &str, now_ms: u64) -> NavigationDecision {
        match self.redirect_url(url) {
            Some(target) if target != url => {
                if self.throttle.check_and_record(key, now_ms) {
                    NavigationDecision::Suppressed
                } else {
                    NavigationDecision::Redirect(target)
                }
            }
            _ => NavigationDecision::Proceed,
        }
    }
}
