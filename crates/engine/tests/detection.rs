//! End-to-end detection scenarios: wire-shaped snapshots in, wire-shaped
//! results out.

use botvet_engine::{BotKind, Engine, EngineConfig, Snapshot};
use serde_json::json;

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).expect("registry invariants hold")
}

/// Parse a snapshot from the external wire contract.
fn wire_snapshot(value: serde_json::Value) -> Snapshot {
    serde_json::from_value(value).expect("snapshot contract")
}

#[test]
fn headless_chrome_user_agent_is_reported() {
    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 HeadlessChrome/120.0", "state": "Success"},
        "languages": {"value": ["en-US", "en"], "state": "Success"}
    }));

    let result = engine().detect(&snapshot);
    assert!(result.is_bot);
    assert_eq!(result.bot_kind, Some(BotKind::HeadlessBrowser));
}

#[test]
fn webdriver_flag_with_unremarkable_user_agent_resolves_to_selenium() {
    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 (Windows NT 10.0; Windows) Chrome/120.0", "state": "Success"},
        "webDriver": {"value": true, "state": "Success"}
    }));

    let result = engine().detect(&snapshot);
    assert!(result.is_bot);
    assert_eq!(result.bot_kind, Some(BotKind::Selenium));
}

#[test]
fn simplified_provider_rule_matches_and_is_audited() {
    let engine = engine();
    let records = engine.rules().publish_payload(&json!([
        {"type": "userAgent", "pattern": "bot", "result": "GenericAutomation"}
    ]));
    assert_eq!(records.len(), 1);

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 bot/1.0", "state": "Success"}
    }));
    let result = engine.detect(&snapshot);

    assert!(result.is_bot);
    assert_eq!(result.bot_kind, Some(BotKind::GenericAutomation));
    let outcome = &result.matched_rules[0];
    assert!(outcome.detected);
    assert_eq!(outcome.details.result, Some(BotKind::GenericAutomation));
    assert_eq!(
        outcome.details.parameters.get("userAgent"),
        Some(&json!("Mozilla/5.0 bot/1.0"))
    );
}

#[test]
fn all_signals_failed_with_empty_ruleset_is_human() {
    let snapshot = wire_snapshot(json!({
        "userAgent": {"state": "Failure"},
        "appVersion": {"state": "Failure"},
        "webDriver": {"state": "Failure"},
        "languages": {"state": "Failure"},
        "pluginsLength": {"state": "Failure"},
        "windowSize": {"state": "Failure"},
        "documentFocus": {"state": "Failure"},
        "errorTrace": {"state": "Failure"},
        "documentElementKeys": {"state": "Failure"},
        "functionBind": {"state": "Failure"},
        "distinctiveProps": {"state": "Failure"},
        "notificationPermission": {"state": "Failure"},
        "mimeTypesConsistent": {"state": "Failure"},
        "evalLength": {"state": "Failure"},
        "webGL": {"state": "Failure"},
        "windowExternal": {"state": "Failure"}
    }));

    let result = engine().detect(&snapshot);
    assert!(!result.is_bot);
    assert_eq!(result.bot_kind, None);
    assert!(result.matched_rules.is_empty());
    assert!(result.detector_outcomes.values().all(|o| !o.bot));
}

#[test]
fn malformed_record_does_not_disturb_detectors_or_other_rules() {
    let engine = engine();
    engine.rules().publish_payload(&json!([
        {"name": "broken", "parameters": [{"name": "userAgent"}], "conditions": "oops"},
        {"type": "userAgent", "pattern": "spider", "result": "GenericAutomation"}
    ]));

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 spider HeadlessChrome/120.0", "state": "Success"}
    }));
    let result = engine.detect(&snapshot);

    // Only the well-formed rule survived ingestion.
    assert_eq!(result.matched_rules.len(), 1);
    assert!(result.matched_rules[0].detected);
    // Detectors ran regardless; the headless identity wins precedence.
    assert_eq!(result.bot_kind, Some(BotKind::HeadlessBrowser));
}

#[test]
fn structured_rule_with_multiple_conditions_uses_last_match() {
    let engine = engine();
    engine.rules().publish_payload(&json!([{
        "name": "stacked",
        "parameters": [{"name": "userAgent"}, {"name": "hardwareConcurrency"}],
        "conditions": [
            {"condition": "matches(userAgent, \"chrome\")", "result": "GenericAutomation"},
            {"condition": "hardwareConcurrency <= 2", "result": "PuppeteerStealth"}
        ]
    }]));

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 (Windows) Chrome/120.0 Windows", "state": "Success"},
        "hardwareConcurrency": {"value": 2, "state": "Success"},
        "languages": {"value": ["en-US", "en"], "state": "Success"},
        "pluginsLength": {"value": 3, "state": "Success"}
    }));
    let result = engine.detect(&snapshot);

    assert!(result.is_bot);
    let outcome = &result.matched_rules[0];
    assert_eq!(outcome.details.result, Some(BotKind::PuppeteerStealth));
    assert_eq!(
        outcome.details.matched_condition.as_deref(),
        Some("hardwareConcurrency <= 2")
    );
}

#[test]
fn repeated_detection_serializes_byte_identically() {
    let engine = engine();
    engine.rules().publish_payload(&json!([
        {"type": "navigatorProperty", "property": "webDriver", "value": true,
         "result": "Selenium", "name": "wd"}
    ]));

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 PhantomJS/2.1", "state": "Success"},
        "webDriver": {"value": true, "state": "Success"},
        "distinctiveProps": {"value": {"phantom": true}, "state": "Success"}
    }));

    let first = serde_json::to_string(&engine.detect(&snapshot)).unwrap();
    let second = serde_json::to_string(&engine.detect(&snapshot)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn ruleset_refresh_is_a_full_replace() {
    let engine = engine();
    engine.rules().publish_payload(&json!([
        {"type": "userAgent", "pattern": "alpha", "result": "GenericAutomation"}
    ]));
    engine.rules().publish_payload(&json!([
        {"type": "userAgent", "pattern": "beta", "result": "GenericAutomation"}
    ]));

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 alpha/1.0", "state": "Success"}
    }));
    let result = engine.detect(&snapshot);

    // The alpha rule is gone, not merged.
    assert!(!result.is_bot);
    assert_eq!(result.matched_rules.len(), 1);
    assert!(!result.matched_rules[0].detected);
}

#[test]
fn wire_output_shape_matches_the_published_contract() {
    let engine = engine();
    engine.rules().publish_payload(&json!([
        {"type": "userAgent", "pattern": "bot", "result": "GenericAutomation"}
    ]));

    let snapshot = wire_snapshot(json!({
        "userAgent": {"value": "Mozilla/5.0 bot/1.0", "state": "Success"}
    }));
    let wire = serde_json::to_value(engine.detect(&snapshot)).unwrap();

    assert_eq!(wire["isBot"], json!(true));
    assert_eq!(wire["botKind"], json!("GenericAutomation"));
    assert_eq!(wire["matchedRules"][0]["ruleName"], json!("rule_0"));
    assert_eq!(wire["matchedRules"][0]["detected"], json!(true));
    assert_eq!(
        wire["matchedRules"][0]["details"]["matchedCondition"],
        json!("matches(userAgent, \"bot\")")
    );
    assert!(wire["detectorOutcomes"]["user_agent"]["bot"].is_boolean());
}
