//! Integration tests for the fastpath-kernel crate.
//!
//! These tests exercise the built-in pattern tables and the parameter
//! extractor together, the way the router uses them.

use serde_json::json;

use fastpath_kernel::catalogue::{ACTION_INTENTS, QUERY_INTENTS, intents};
use fastpath_kernel::{KernelError, ParameterExtractor, PatternMatcher, RouteResult};

fn matcher() -> PatternMatcher {
    PatternMatcher::builtin().expect("built-in tables compile")
}

fn extractor() -> ParameterExtractor {
    ParameterExtractor::new().expect("extraction cascades compile")
}

// ═══════════════════════════════════════════════════════════════════════
//  Catalogue
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn every_action_intent_has_an_extraction_cascade() {
    let e = extractor();
    for intent in ACTION_INTENTS {
        assert!(e.supports(intent), "no cascade for {intent}");
    }
    for intent in QUERY_INTENTS {
        assert!(!e.supports(intent), "unexpected cascade for {intent}");
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Matching and extraction agree
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn deterministic_params_match_extractor_output() {
    let m = matcher();
    let e = extractor();
    for query in [
        "mute",
        "set volume to 42",
        "turn up the volume",
        "set a timer for 2 hours",
        "set brightness to 70%",
        "pause the music",
        "open https://example.com/docs",
    ] {
        let matched = m.match_query(query);
        assert!(matched.matched, "{query} did not match");
        let from_rule = matched.params.expect("action rule carries params");
        let from_extractor = e.extract(query, &matched.tool_name);
        assert_eq!(from_rule, from_extractor, "disagreement on {query}");
    }
}

#[test]
fn canonical_extraction_examples() {
    let e = extractor();
    assert_eq!(
        serde_json::Value::Object(e.extract("mute", intents::SYSTEM_VOLUME)),
        json!({"action": "mute"})
    );
    assert_eq!(
        serde_json::Value::Object(e.extract("turn up the volume", intents::SYSTEM_VOLUME)),
        json!({"action": "set", "level": 75})
    );
    assert_eq!(
        serde_json::Value::Object(e.extract("set volume to 42", intents::SYSTEM_VOLUME)),
        json!({"action": "set", "level": 42})
    );
    assert_eq!(
        e.extract("set a timer for 90 seconds", intents::SET_TIMER)["duration_minutes"],
        json!(1)
    );
    assert_eq!(
        e.extract("2 hours", intents::SET_TIMER)["duration_minutes"],
        json!(120)
    );
}

#[test]
fn action_rules_shadow_query_rules() {
    let mut m = PatternMatcher::new();
    m.add_query_rule("volume_status", r"(?i)\bvolume\b", 1.0).unwrap();
    m.add_action_rule("set_volume", r"(?i)^volume\s+(?P<n>\d+)$", 0.97, |caps| {
        let n: u64 = caps["n"].parse().map_err(|_| KernelError::ExtractionFailed {
            intent: "set_volume".into(),
            reason: "not a number".into(),
        })?;
        Ok(fastpath_kernel::extract::params([("level", n.into())]))
    })
    .unwrap();

    let hit = m.match_query("volume 30");
    assert_eq!(hit.tool_name, "set_volume");
    assert_eq!(hit.params.unwrap()["level"], json!(30));

    let broad = m.match_query("what is the volume");
    assert_eq!(broad.tool_name, "volume_status");
    assert!(broad.params.is_none());
}

#[test]
fn failing_extractor_falls_through_to_next_rule() {
    let mut m = PatternMatcher::new();
    m.add_action_rule("first", r"^go$", 1.0, |_| {
        Err(KernelError::ExtractionFailed {
            intent: "first".into(),
            reason: "rejected".into(),
        })
    })
    .unwrap();
    m.add_query_rule("second", r"^go$", 0.96).unwrap();

    let hit = m.match_query("go");
    assert!(hit.matched);
    assert_eq!(hit.tool_name, "second");
}

#[test]
fn invalid_rules_are_rejected() {
    let mut m = PatternMatcher::new();
    assert!(matches!(
        m.add_query_rule("bad", r"(unclosed", 1.0),
        Err(KernelError::InvalidPattern { .. })
    ));
    assert!(matches!(
        m.add_query_rule("bad", r"ok", 1.5),
        Err(KernelError::InvalidConfidence { .. })
    ));
    assert_eq!(m.query_rule_count(), 0);
}

#[test]
fn rule_confidences_are_probabilities() {
    // Every built-in rule was accepted by the bounds check, so any query that
    // matches reports a confidence in [0, 1].
    let m = matcher();
    for query in ["mute", "louder", "cpu usage please", "help", "close window"] {
        let hit = m.match_query(query);
        assert!(hit.matched, "{query}");
        assert!((0.0..=1.0).contains(&hit.confidence));
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Route results
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn route_result_json_omits_absent_fields() {
    let handled = RouteResult::handled(
        fastpath_kernel::ClassificationTier::Deterministic,
        "system_volume",
        1.0,
        "muted",
    );
    let json = serde_json::to_value(&handled).unwrap();
    assert_eq!(json["tier"], "deterministic");
    assert!(json.get("reason").is_none());
    assert!(json.get("failed_error").is_none());

    let fallback = RouteResult::unhandled("no tier resolved the query");
    let json = serde_json::to_value(&fallback).unwrap();
    assert_eq!(json["handled"], false);
    assert_eq!(json["tier"], "fallback");
    assert!(json.get("tool_name").is_none());
}
