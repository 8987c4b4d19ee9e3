//! End-to-end session tests
//!
//! Drives a ThoughtGraphStore through untyped JSON payloads the way the MCP
//! handler does, checking the observable response fields.

use std::sync::Arc;

use mcp_thought_graph::config::Config;
use mcp_thought_graph::error::ValidationError;
use mcp_thought_graph::graph::{Phase, ThoughtGraphStore};
use mcp_thought_graph::profile::{Priority, TaskType};
use mcp_thought_graph::telemetry::{NoopSink, RecordingSink, SessionEvent};
use mcp_thought_graph::text::HashVectorizer;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const CSV_PROMPT: &str = "I must write a Python script that parses CSV files. Urgent.";

fn store() -> ThoughtGraphStore {
    let config = Config::default();
    ThoughtGraphStore::new(
        &config,
        Arc::new(HashVectorizer::from_config(&config.vectors)),
        Arc::new(NoopSink),
    )
}

fn payload(thought: &str, number: u32, total: u32) -> Value {
    json!({
        "thought": thought,
        "thoughtNumber": number,
        "totalThoughts": total,
        "nextThoughtNeeded": true
    })
}

fn submit(store: &mut ThoughtGraphStore, value: Value) -> Value {
    serde_json::to_value(store.submit(&value).unwrap()).unwrap()
}

// ============================================================================
// Acceptance scenarios
// ============================================================================

#[test]
fn test_first_thought_profiles_the_prompt() {
    let mut s = store();
    submit(&mut s, payload(CSV_PROMPT, 1, 3));

    let profile = s.profile().unwrap();
    assert_eq!(profile.task_type, TaskType::Technical);
    assert_eq!(profile.priority, Priority::High);
    assert!(profile
        .constraints
        .iter()
        .any(|c| c.to_lowercase().contains("must write")));
}

#[test]
fn test_negated_conclusion_contradicts_earlier_conclusion() {
    let mut s = store();
    let mut first = payload("The CSV parser handles quoted fields correctly", 1, 3);
    first["classification"] = json!("conclusion");
    submit(&mut s, first);

    let mut second = payload("The CSV parser does not handle quoted fields correctly", 2, 3);
    second["classification"] = json!("conclusion");
    let response = submit(&mut s, second);

    let contradictions = response["thoughtAnalysis"]["contradictions"].as_array().unwrap();
    assert_eq!(contradictions.len(), 1);
    assert_eq!(contradictions[0]["thoughtNumber"], 1);
    assert_eq!(contradictions[0]["explanation"], "Conflicting conclusions detected");
}

#[test]
fn test_off_topic_thought_is_flagged() {
    let mut s = store();
    submit(&mut s, payload(CSV_PROMPT, 1, 3));
    let response = submit(
        &mut s,
        payload("Penguins migrate across frozen oceans every winter", 2, 3),
    );

    let analysis = &response["thoughtAnalysis"];
    assert!(analysis["alignmentScore"].as_f64().unwrap() <= 4.0);
    assert!(analysis["driftWarning"].is_string());
    assert!(!analysis["correctiveSuggestions"].as_array().unwrap().is_empty());
}

#[test]
fn test_dependencies_show_in_adjacency() {
    let mut s = store();
    submit(&mut s, payload("Read the input file", 1, 3));
    submit(&mut s, payload("Detect the delimiter", 2, 3));
    let mut third = payload("Parse rows with the detected delimiter", 3, 3);
    third["dependencies"] = json!([1, 2]);
    submit(&mut s, third);

    assert_eq!(s.dependents_of(1), vec![3]);
    assert_eq!(s.dependents_of(2), vec![3]);

    let snapshot = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(snapshot["adjacency"]["1"], json!([3]));
    assert_eq!(snapshot["adjacency"]["2"], json!([3]));
}

// ============================================================================
// Ingress handling
// ============================================================================

#[test]
fn test_rejected_payloads_change_nothing() {
    let mut s = store();
    let cases = [
        (json!("just text"), None),
        (json!({"thoughtNumber": 1, "totalThoughts": 1, "nextThoughtNeeded": true}), Some("thought")),
        (json!({"thought": "   ", "thoughtNumber": 1, "totalThoughts": 1, "nextThoughtNeeded": true}), Some("thought")),
        (json!({"thought": "x", "thoughtNumber": "1", "totalThoughts": 1, "nextThoughtNeeded": true}), Some("thoughtNumber")),
        (json!({"thought": "x", "thoughtNumber": 1, "totalThoughts": 0, "nextThoughtNeeded": true}), Some("totalThoughts")),
        (json!({"thought": "x", "thoughtNumber": 4_294_967_296u64, "totalThoughts": 1, "nextThoughtNeeded": true}), Some("thoughtNumber")),
        (json!({"thought": "x", "thoughtNumber": 1, "totalThoughts": 1, "nextThoughtNeeded": "yes"}), Some("nextThoughtNeeded")),
    ];

    for (value, field) in cases {
        let err = s.submit(&value).unwrap_err();
        assert_eq!(err.field(), field, "payload {}", value);
        assert_eq!(err.to_failure().status, "failed");
    }
    assert!(s.thoughts().is_empty());
    assert!(s.profile().is_none());
}

#[test]
fn test_failure_object_shape() {
    let mut s = store();
    let err = s.submit(&json!({"thought": "x"})).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingField {
            field: "thoughtNumber".to_string()
        }
    );
    assert_eq!(
        serde_json::to_value(err.to_failure()).unwrap(),
        json!({"error": "Missing required field: thoughtNumber", "status": "failed"})
    );
}

#[test]
fn test_mistyped_optional_fields_become_warnings() {
    let mut s = store();
    let mut value = payload("Read the input file", 1, 3);
    value["phase"] = json!("Daydreaming");
    value["dependencies"] = json!("1");
    let response = submit(&mut s, value);

    assert_eq!(response["currentPhase"], "Planning");
    assert!(response["warnings"].as_array().unwrap().len() >= 2);
}

// ============================================================================
// Session behaviour
// ============================================================================

#[test]
fn test_full_session_walkthrough() {
    let sink = Arc::new(RecordingSink::new());
    let config = Config::default();
    let mut s = ThoughtGraphStore::new(
        &config,
        Arc::new(HashVectorizer::from_config(&config.vectors)),
        sink.clone(),
    );

    submit(&mut s, payload(CSV_PROMPT, 1, 4));

    let mut second = payload("Use the csv module to read each row", 2, 4);
    second["phase"] = json!("analysis");
    second["toolsUsed"] = json!(["code_interpreter"]);
    second["dependencies"] = json!([1]);
    submit(&mut s, second);

    let mut third = payload("Maybe pandas would parse large CSV files faster", 3, 4);
    third["branchFromThought"] = json!(2);
    third["branchId"] = json!("pandas");
    submit(&mut s, third);

    let mut fourth = payload("Therefore the csv module is enough for this script", 4, 4);
    fourth["phase"] = json!("Verification");
    fourth["nextThoughtNeeded"] = json!(false);
    let response = submit(&mut s, fourth);

    assert_eq!(response["thoughtHistoryLength"], 4);
    assert_eq!(response["branches"], json!(["pandas"]));
    assert_eq!(response["currentPhase"], "Verification");
    assert_eq!(response["nextThoughtNeeded"], false);
    assert_eq!(response["recentThoughts"].as_array().unwrap().len(), 3);
    assert_eq!(response["toolUsageStats"]["code_interpreter"]["count"], 1);
    assert!(response["recommendations"]["patternAnalysis"].is_object());
    assert!(response["sessionProgress"]["goalCoverage"]["total"].as_u64().unwrap() >= 1);

    assert_eq!(s.current_phase(), Phase::Verification);
    assert_eq!(s.thought(3).unwrap().branch_id.as_deref(), Some("pandas"));

    let events = sink.events();
    assert!(matches!(events[0], SessionEvent::SessionInitialized { .. }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ThoughtAppended { .. }))
            .count(),
        4
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::BranchCreated { from_thought: 2, .. })));
}

#[test]
fn test_largest_thought_number_is_the_last_one() {
    let mut s = store();
    submit(&mut s, payload("Read the input file", u32::MAX, 3));

    let err = s.submit(&payload("Parse each row", 1, 3)).unwrap_err();
    assert_eq!(err.field(), Some("thoughtNumber"));
    assert_eq!(err.to_failure().status, "failed");
    assert_eq!(s.thoughts().len(), 1);
}

#[test]
fn test_prompt_negation_ignores_unrelated_negated_words() {
    let mut s = store();
    submit(
        &mut s,
        payload("We need to build a response cache for the product catalog.", 1, 3),
    );
    let response = submit(
        &mut s,
        payload("Access tokens should never cache on shared proxies", 2, 3),
    );
    assert_eq!(response["thoughtAnalysis"]["promptContradictions"], json!([]));
}

#[test]
fn test_sessions_are_deterministic() {
    let inputs = [
        payload(CSV_PROMPT, 1, 3),
        payload("Open the file with the csv module", 2, 3),
        payload("Maybe pandas is faster", 3, 3),
        payload("Penguins migrate across frozen oceans", 4, 3),
    ];

    let run = || {
        let mut s = store();
        inputs
            .iter()
            .map(|value| submit(&mut s, value.clone()))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}
