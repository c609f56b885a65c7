//! WebAssembly bindings for the redirect engine
//!
//! The background script keeps one `Redirector`, calls `setRules` whenever
//! stored rules change and asks `redirectUrl` (guarded by the throttle) on
//! every top-level navigation. The free functions serve the rule-testing UI.

mod console;

use redir_core::{ChainResult, MatchOutcome, ResolveOptions, ThrottleConfig};
use redir_rules::{parse_rule, parse_rule_list, validate_rules as diagnose_rules, RuleListError};
use wasm_bindgen::prelude::*;

pub use console::init_logging;

fn to_js_error(e: RuleListError) -> JsValue {
    JsValue::from_str(&format!("Failed to parse rules: {}", e))
}

/// Host clock in milliseconds (`Date.now()`) as an unsigned timestamp.
fn timestamp(now: f64) -> u64 {
    if now.is_finite() && now > 0.0 {
        now as u64
    } else {
        0
    }
}

fn chain_result_to_js(result: &ChainResult) -> JsValue {
    let js_result = js_sys::Object::new();
    let urls = js_sys::Array::new();
    for url in &result.urls {
        urls.push(&JsValue::from_str(url));
    }
    let _ = js_sys::Reflect::set(&js_result, &"status".into(), &JsValue::from_str(result.status.as_str()));
    let _ = js_sys::Reflect::set(&js_result, &"urls".into(), &urls);
    js_result.into()
}

fn match_outcome_to_js(outcome: &MatchOutcome) -> JsValue {
    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"match".into(), &JsValue::from(outcome.matched));
    let _ = js_sys::Reflect::set(&js_result, &"url".into(), &JsValue::from_str(&outcome.url));
    js_result.into()
}

// =============================================================================
// Redirector
// =============================================================================

/// Rule set and redirect throttle held by the background script.
#[wasm_bindgen]
pub struct Redirector {
    inner: redir_core::Redirector,
}

#[wasm_bindgen]
impl Redirector {
    /// `perTab` selects the per-tab throttle ceiling; keys are then tab ids.
    #[wasm_bindgen(constructor)]
    pub fn new(rules_json: &str, per_tab: Option<bool>) -> Result<Redirector, JsValue> {
        let rules = parse_rule_list(rules_json).map_err(to_js_error)?;
        let throttle = if per_tab.unwrap_or(false) {
            ThrottleConfig::per_tab()
        } else {
            ThrottleConfig::per_url()
        };
        Ok(Self {
            inner: redir_core::Redirector::with_options(&rules, ResolveOptions::default(), throttle),
        })
    }

    /// Replace the rules. On error the previous rules stay active.
    #[wasm_bindgen(js_name = setRules)]
    pub fn set_rules(&mut self, rules_json: &str) -> Result<(), JsValue> {
        let rules = parse_rule_list(rules_json).map_err(to_js_error)?;
        self.inner.refresh(&rules);
        Ok(())
    }

    #[wasm_bindgen(js_name = setMaxRedirects)]
    pub fn set_max_redirects(&mut self, max_redirects: u32) {
        self.inner.set_options(ResolveOptions {
            max_iterations: max_redirects,
        });
    }

    #[wasm_bindgen(getter, js_name = ruleCount)]
    pub fn rule_count(&self) -> u32 {
        self.inner.rules().len() as u32
    }

    /// Full chain as `{ status, urls }`.
    pub fn resolve(&self, url: &str) -> JsValue {
        chain_result_to_js(&self.inner.resolve(url))
    }

    /// Final URL of a matched chain, or undefined.
    #[wasm_bindgen(js_name = redirectUrl)]
    pub fn redirect_url(&self, url: &str) -> Option<String> {
        self.inner.redirect_url(url)
    }

    #[wasm_bindgen(js_name = shouldSuppress)]
    pub fn should_suppress(&self, key: &str, now: f64) -> bool {
        self.inner.throttle().should_suppress(key, timestamp(now))
    }

    #[wasm_bindgen(js_name = recordRedirect)]
    pub fn record_redirect(&self, key: &str, now: f64) {
        self.inner.throttle().record_redirect(key, timestamp(now));
    }

    /// Returns true when the redirect must be suppressed; otherwise counts it.
    #[wasm_bindgen(js_name = checkAndRecord)]
    pub fn check_and_record(&self, key: &str, now: f64) -> bool {
        self.inner.throttle().check_and_record(key, timestamp(now))
    }

    pub fn reset(&self, key: &str) -> bool {
        self.inner.throttle().reset(key)
    }

    #[wasm_bindgen(js_name = evictExpired)]
    pub fn evict_expired(&self, now: f64) -> u32 {
        self.inner.throttle().evict_expired(timestamp(now)) as u32
    }
}

// =============================================================================
// Rule Testing
// =============================================================================

/// Resolve `url` against a JSON rule list. Returns `{ status, urls }`.
#[wasm_bindgen(js_name = checkRuleChain)]
pub fn check_rule_chain(rules_json: &str, url: &str, max_redirects: Option<u32>) -> Result<JsValue, JsValue> {
    let rules = parse_rule_list(rules_json).map_err(to_js_error)?;
    let options = max_redirects
        .map(|max_iterations| ResolveOptions { max_iterations })
        .unwrap_or_default();
    Ok(chain_result_to_js(&redir_core::resolve_with(&rules, url, &options)))
}

/// Apply one JSON rule to `url`. Returns `{ match, url }`.
#[wasm_bindgen(js_name = matchRule)]
pub fn match_rule(rule_json: &str, url: &str) -> Result<JsValue, JsValue> {
    let rule = parse_rule(rule_json).map_err(to_js_error)?;
    Ok(match_outcome_to_js(&redir_core::apply(&rule, url)))
}

/// Diagnostics for a JSON rule list as `[{ index, severity, message }]`.
#[wasm_bindgen(js_name = validateRules)]
pub fn validate_rules(rules_json: &str) -> Result<JsValue, JsValue> {
    let rules = parse_rule_list(rules_json).map_err(to_js_error)?;
    let diagnostics = js_sys::Array::new();
    for diagnostic in diagnose_rules(&rules) {
        let entry = js_sys::Object::new();
        let severity = match diagnostic.severity {
            redir_rules::Severity::Warning => "warning",
            redir_rules::Severity::Error => "error",
        };
        let _ = js_sys::Reflect::set(&entry, &"index".into(), &JsValue::from(diagnostic.index as u32));
        let _ = js_sys::Reflect::set(&entry, &"severity".into(), &JsValue::from_str(severity));
        let _ = js_sys::Reflect::set(&entry, &"message".into(), &JsValue::from_str(&diagnostic.message));
        diagnostics.push(&entry);
    }
    Ok(diagnostics.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_clamps() {
        assert_eq!(timestamp(1_700_000_000_123.9), 1_700_000_000_123);
        assert_eq!(timestamp(-5.0), 0);
        assert_eq!(timestamp(f64::NAN), 0);
        assert_eq!(timestamp(f64::INFINITY), 0);
    }
}
