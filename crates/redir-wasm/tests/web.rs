//! Binding tests. Run with `wasm-pack test --node crates/redir-wasm`.

#![cfg(target_arch = "wasm32")]

use redir_wasm::{check_rule_chain, match_rule, validate_rules, Redirector};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const RULES: &str = r#"[
    {"from": "https://youtu.be/(.*)", "to": "https://www.youtube.com/watch?v=$1"},
    {"from": "https://a.com/(.*)", "to": "https://b.com/$1"},
    {"from": "https://b.com/(.*)", "to": "https://a.com/$1"}
]"#;

fn get(value: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(value, &key.into()).unwrap()
}

#[wasm_bindgen_test]
fn resolves_chain_to_object() {
    let result = check_rule_chain(RULES, "https://youtu.be/abc", None).unwrap();
    assert_eq!(get(&result, "status").as_string().as_deref(), Some("matched"));
    let urls = js_sys::Array::from(&get(&result, "urls"));
    assert_eq!(urls.length(), 1);
    assert_eq!(urls.get(0).as_string().as_deref(), Some("https://www.youtube.com/watch?v=abc"));

    let looping = check_rule_chain(RULES, "https://a.com/x", Some(5)).unwrap();
    assert_eq!(get(&looping, "status").as_string().as_deref(), Some("circular-redirect"));
}

#[wasm_bindgen_test]
fn match_rule_reports_identity() {
    let rule = r#"{"from": "https://youtu.be/:id", "to": "{{pathname.groups.id}}"}"#;
    let hit = match_rule(rule, "https://youtu.be/abc").unwrap();
    assert_eq!(get(&hit, "match").as_bool(), Some(true));
    assert_eq!(get(&hit, "url").as_string().as_deref(), Some("abc"));

    let miss = match_rule(rule, "https://example.com/").unwrap();
    assert_eq!(get(&miss, "match").as_bool(), Some(false));
    assert_eq!(get(&miss, "url").as_string().as_deref(), Some("https://example.com/"));
}

#[wasm_bindgen_test]
fn redirector_throttles() {
    let mut redirector = Redirector::new(RULES, None).unwrap();
    assert_eq!(redirector.rule_count(), 3);
    assert_eq!(
        redirector.redirect_url("https://youtu.be/abc").as_deref(),
        Some("https://www.youtube.com/watch?v=abc")
    );
    assert_eq!(redirector.redirect_url("https://a.com/x"), None);

    for i in 0..3 {
        assert!(!redirector.check_and_record("k", 1000.0 + i as f64));
    }
    assert!(redirector.should_suppress("k", 1500.0));
    assert!(redirector.reset("k"));

    redirector.set_rules("[]").unwrap();
    assert_eq!(redirector.rule_count(), 0);
    assert!(redirector.set_rules("nope").is_err());
}

#[wasm_bindgen_test]
fn validate_rules_lists_errors() {
    let diagnostics = validate_rules(r#"[{"from": "([", "to": "x", "mode": "regex"}]"#).unwrap();
    let diagnostics = js_sys::Array::from(&diagnostics);
    assert_eq!(diagnostics.length(), 1);
    assert_eq!(get(&diagnostics.get(0), "severity").as_string().as_deref(), Some("error"));
}
