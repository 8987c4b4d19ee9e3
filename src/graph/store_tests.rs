use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::analysis::ContradictionKind;
use crate::config::Config;
use crate::error::{SessionError, ValidationError};
use crate::telemetry::{NoopSink, RecordingSink};
use crate::text::HashVectorizer;

fn store() -> ThoughtGraphStore {
    ThoughtGraphStore::new(
        &Config::default(),
        Arc::new(HashVectorizer::new(64, 256)),
        Arc::new(NoopSink),
    )
}

fn recording_store() -> (ThoughtGraphStore, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let store = ThoughtGraphStore::new(
        &Config::default(),
        Arc::new(HashVectorizer::new(64, 256)),
        sink.clone(),
    );
    (store, sink)
}

fn submit(store: &mut ThoughtGraphStore, input: SubmitThought) -> ThoughtResponse {
    store.submit_thought(input).unwrap()
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn test_first_thought_initializes_profile() {
    let mut s = store();
    assert!(!s.is_initialized());
    submit(
        &mut s,
        SubmitThought::new("I must write a Python script that parses CSV files. Urgent.", 1, 3, true),
    );
    let profile = s.profile().unwrap();
    assert_eq!(profile.task_type, crate::profile::TaskType::Technical);
    assert_eq!(profile.priority, crate::profile::Priority::High);
}

#[test]
fn test_initialize_session_exactly_once() {
    let mut s = store();
    s.initialize_session("We need to reduce churn.").unwrap();
    let err = s.initialize_session("again").unwrap_err();
    assert!(matches!(err, SessionError::AlreadyInitialized { .. }));

    // The explicit prompt stays the profile source.
    submit(&mut s, SubmitThought::new("Look at the cancellation data", 1, 3, true));
    assert_eq!(s.profile().unwrap().goals, vec!["We need to reduce churn".to_string()]);
}

#[test]
fn test_validation_failure_leaves_store_untouched() {
    let mut s = store();
    let err = s
        .submit(&json!({"thought": "x", "thoughtNumber": 1, "totalThoughts": 3}))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingField {
            field: "nextThoughtNeeded".to_string()
        }
    );
    assert!(s.thoughts().is_empty());
    assert!(s.profile().is_none());
    assert_eq!(s.total_thoughts(), 0);

    let err = s
        .submit_thought(SubmitThought::new("text", 0, 3, true))
        .unwrap_err();
    assert_eq!(err.field(), Some("thoughtNumber"));
    assert!(s.thoughts().is_empty());
}

// ============================================================================
// Numbering and references
// ============================================================================

#[test]
fn test_thought_numbers_strictly_increase() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 3, true));
    let response = submit(&mut s, SubmitThought::new("Parse each row", 1, 3, true));
    assert_eq!(response.thought_number, 2);
    assert!(response.warnings.iter().any(|w| w.contains("assigned 2")));

    let response = submit(&mut s, SubmitThought::new("Skip ahead", 7, 3, true));
    assert_eq!(response.thought_number, 7);

    let numbers: Vec<u32> = s.thoughts().iter().map(|t| t.thought_number).collect();
    assert_eq!(numbers, vec![1, 2, 7]);
}

#[test]
fn test_renumbering_past_max_thought_number_is_rejected() {
    let mut s = store();
    let response = s
        .submit(&json!({
            "thought": "Read the input file",
            "thoughtNumber": u32::MAX,
            "totalThoughts": 3,
            "nextThoughtNeeded": true
        }))
        .unwrap();
    assert_eq!(response.thought_number, u32::MAX);

    let err = s
        .submit_thought(SubmitThought::new("Parse each row", 2, 3, true))
        .unwrap_err();
    assert_eq!(err.field(), Some("thoughtNumber"));
    assert!(matches!(err, ValidationError::OutOfRange { .. }));
    assert_eq!(s.thoughts().len(), 1);
    assert_eq!(s.thoughts()[0].thought_number, u32::MAX);
}

#[test]
fn test_dangling_references_are_dropped() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 3, true));
    let response = submit(
        &mut s,
        SubmitThought::new("Parse each row", 2, 3, true)
            .with_dependencies([1, 5])
            .with_branch(9, "alt"),
    );

    let thought = s.thought(2).unwrap();
    assert_eq!(thought.dependencies.iter().copied().collect::<Vec<_>>(), vec![1]);
    assert_eq!(thought.branch_from_thought, None);
    assert_eq!(thought.branch_id, None);
    assert!(s.branches().is_empty());
    assert_eq!(response.warnings.len(), 3);
}

#[test]
fn test_self_reference_is_dropped() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 3, true));
    submit(
        &mut s,
        SubmitThought::new("Parse each row", 2, 3, true).with_dependencies([2]),
    );
    assert!(s.thought(2).unwrap().dependencies.is_empty());
}

#[test]
fn test_adjacency_lists_dependents() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 4, true));
    submit(&mut s, SubmitThought::new("Detect the delimiter", 2, 4, true));
    submit(
        &mut s,
        SubmitThought::new("Parse rows using the detected delimiter", 3, 4, true)
            .with_dependencies([1, 2]),
    );

    assert_eq!(s.dependents_of(1), vec![3]);
    assert_eq!(s.dependents_of(2), vec![3]);
    assert!(s.dependents_of(3).is_empty());
    assert!(s.dependents_of(42).is_empty());
    assert_eq!(s.adjacency().len(), 3);
}

// ============================================================================
// Estimates and phases
// ============================================================================

#[test]
fn test_total_thoughts_never_decreases() {
    let mut s = store();
    let inputs = [
        SubmitThought::new("I must write a Python script that parses CSV files.", 1, 2, true),
        SubmitThought::new("Open the file with the csv module", 2, 1, true),
        SubmitThought::new("Handle quoted fields", 3, 1, true),
        SubmitThought::new("Write tests for the parser", 30, 2, false),
    ];

    let mut totals = Vec::new();
    for input in inputs {
        let response = submit(&mut s, input);
        assert!(response.total_thoughts >= response.thought_number);
        totals.push(response.total_thoughts);
    }
    assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*totals.last().unwrap(), 30);
    assert_eq!(s.total_thoughts(), 30);
}

#[test]
fn test_total_raised_to_recommended_count() {
    let mut s = store();
    let response = submit(
        &mut s,
        SubmitThought::new("I must write a Python script that parses CSV files.", 1, 1, true),
    );
    let recommended = response
        .recommendations
        .as_ref()
        .unwrap()
        .complexity
        .recommended_thoughts;
    assert_eq!(response.total_thoughts, recommended.max(1));
}

#[test]
fn test_phase_carries_over_until_changed() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 5, true));
    assert_eq!(s.current_phase(), Phase::Planning);

    submit(
        &mut s,
        SubmitThought::new("Write the parser", 2, 5, true).with_phase(Phase::Execution),
    );
    let response = submit(&mut s, SubmitThought::new("Handle quoted fields", 3, 5, true));
    assert_eq!(s.thought(3).unwrap().phase, Phase::Execution);
    assert_eq!(response.current_phase, Phase::Execution);
}

#[test]
fn test_suggested_phase_is_only_a_suggestion() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Sort the invoices", 1, 2, true));
    let response = submit(&mut s, SubmitThought::new("Group invoices by month", 40, 2, true));
    assert_eq!(response.progress, 100.0);
    assert_eq!(response.current_phase, Phase::Planning);
    assert_eq!(response.suggested_next_phase, Phase::Analysis);
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_conflicting_conclusions_flagged() {
    let mut s = store();
    submit(
        &mut s,
        SubmitThought::new("The CSV parser handles quoted fields correctly", 1, 3, true)
            .with_classification(Classification::Conclusion),
    );
    let response = submit(
        &mut s,
        SubmitThought::new("The CSV parser does not handle quoted fields correctly", 2, 3, true)
            .with_classification(Classification::Conclusion),
    );

    let contradictions = &response.thought_analysis.contradictions;
    assert_eq!(contradictions.len(), 1);
    assert_eq!(contradictions[0].thought_number, 1);
    assert_eq!(contradictions[0].explanation, "Conflicting conclusions detected");
    assert_eq!(contradictions[0].kind, ContradictionKind::ConflictingConclusions);
    assert!(!response.thought_analysis.resolution_strategies.is_empty());
}

#[test]
fn test_revisions_skip_contradiction_checks() {
    let mut s = store();
    submit(
        &mut s,
        SubmitThought::new("The CSV parser handles quoted fields correctly", 1, 3, true)
            .with_classification(Classification::Conclusion),
    );
    let response = submit(
        &mut s,
        SubmitThought::new("The CSV parser does not handle quoted fields correctly", 2, 3, true)
            .with_classification(Classification::Conclusion)
            .with_revision_of(1),
    );
    assert!(response.thought_analysis.contradictions.is_empty());
    assert!(response.thought_analysis.prompt_contradictions.is_empty());
    assert_eq!(s.thought(2).unwrap().revises_thought, Some(1));

    // A later thought never targets the revision either; only thought 1 remains.
    let response = submit(
        &mut s,
        SubmitThought::new("The CSV parser does not handle quoted fields correctly", 3, 3, false)
            .with_classification(Classification::Conclusion),
    );
    assert!(response
        .thought_analysis
        .contradictions
        .iter()
        .all(|c| c.thought_number == 1));
}

#[test]
fn test_unrelated_thought_drifts() {
    let mut s = store();
    submit(
        &mut s,
        SubmitThought::new("I must write a Python script that parses CSV files. Urgent.", 1, 3, true),
    );
    let response = submit(
        &mut s,
        SubmitThought::new("Penguins migrate across frozen oceans every winter", 2, 3, true),
    );

    let analysis = &response.thought_analysis;
    assert!(analysis.alignment_score <= 4.0);
    assert!(analysis.drift_warning.is_some());
    assert!(analysis.drift_score > 0.55);
    assert!(s.thought(2).unwrap().drift_warning.is_some());
}

#[test]
fn test_classification_inferred_when_absent() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Should we stream the file?", 1, 3, true));
    assert_eq!(s.thought(1).unwrap().classification, Classification::Question);
}

#[test]
fn test_scores_within_bounds() {
    let mut s = store();
    let texts = [
        "I must write a Python script that parses CSV files.",
        "Therefore the csv module is enough",
        "Maybe pandas is faster for large files",
        "Penguins migrate across frozen oceans",
    ];
    for (i, text) in texts.iter().enumerate() {
        submit(&mut s, SubmitThought::new(*text, i as u32 + 1, 4, true));
    }
    for t in s.thoughts() {
        assert!((0.0..=10.0).contains(&t.alignment_score));
        assert!((0.0..=10.0).contains(&t.quality_score));
        assert!((0.0..=10.0).contains(&t.insight_value));
        assert_eq!(t.vector.len(), 64);
    }
    assert_eq!(s.thought(1).unwrap().insight_value, 5.0);
}

// ============================================================================
// Branches, tools and clusters
// ============================================================================

#[test]
fn test_branch_created_lazily_and_grows() {
    let (mut s, sink) = recording_store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 5, true));
    submit(&mut s, SubmitThought::new("Use the csv module", 2, 5, true));
    let response = submit(
        &mut s,
        SubmitThought::new("Try pandas instead", 3, 5, true).with_branch(2, "pandas"),
    );
    assert_eq!(response.branches, vec!["pandas".to_string()]);

    let mut joined = SubmitThought::new("Benchmark pandas", 4, 5, true);
    joined.branch_id = Some("pandas".to_string());
    submit(&mut s, joined);

    let branch = s.branch("pandas").unwrap();
    assert_eq!(branch.from_thought, 2);
    assert_eq!(branch.thoughts, vec![3, 4]);
    assert_eq!(
        sink.names()
            .iter()
            .filter(|n| **n == "branch_created")
            .count(),
        1
    );
}

#[test]
fn test_tool_usage_stats() {
    let mut s = store();
    submit(
        &mut s,
        SubmitThought::new("Search for csv libraries", 1, 3, true).with_tools(["web_search"]),
    );
    let response = submit(
        &mut s,
        SubmitThought::new("Run the parser", 2, 3, true)
            .with_tools(["code_interpreter", "web_search"])
            .with_phase(Phase::Execution),
    );

    let web = &response.tool_usage_stats["web_search"];
    assert_eq!(web.count, 2);
    assert_eq!(web.thought_numbers, vec![1, 2]);
    assert_eq!(web.by_phase[&Phase::Planning], 1);
    assert_eq!(web.by_phase[&Phase::Execution], 1);
    assert_eq!(s.tool_stats()["code_interpreter"].count, 1);
}

#[test]
fn test_clusters_cover_every_thought() {
    let mut s = store();
    let texts = [
        "Parse the CSV file with a streaming reader",
        "Parse the CSV file with a streaming reader quickly",
        "Quarterly revenue grew in every region",
    ];
    for (i, text) in texts.iter().enumerate() {
        submit(&mut s, SubmitThought::new(*text, i as u32 + 1, 3, true));
    }
    let mut members: Vec<u32> = s
        .clusters()
        .iter()
        .flat_map(|c| c.thought_numbers.iter().copied())
        .collect();
    members.sort_unstable();
    assert_eq!(members, vec![1, 2, 3]);
}

// ============================================================================
// Response and telemetry
// ============================================================================

#[test]
fn test_response_shape() {
    let mut s = store();
    submit(
        &mut s,
        SubmitThought::new("My goal is to reduce churn. We need to cut costs.", 1, 4, true),
    );
    submit(&mut s, SubmitThought::new("Reduce churn with better onboarding", 2, 4, true));
    let response = submit(&mut s, SubmitThought::new("Survey cancelled customers", 3, 4, true));

    assert_eq!(response.thought_history_length, 3);
    assert_eq!(response.recent_thoughts.len(), 3);
    assert_eq!(response.recent_thoughts[0].thought_number, 1);
    assert_eq!(response.available_tools.len(), 5);
    assert!(response.estimated_complexity.is_some());

    let progress = response.session_progress.as_ref().unwrap();
    assert_eq!(progress.goal_coverage.total, 2);
    assert!(progress.goal_coverage.covered >= 1);
    assert_eq!(
        progress.remaining_thoughts_estimate,
        response.total_thoughts - 3
    );

    let value = serde_json::to_value(&response).unwrap();
    for key in [
        "thoughtNumber",
        "totalThoughts",
        "nextThoughtNeeded",
        "branches",
        "thoughtHistoryLength",
        "availableTools",
        "currentPhase",
        "progress",
        "recentThoughts",
        "suggestedNextPhase",
        "thoughtAnalysis",
        "recommendations",
        "toolUsageStats",
        "sessionProgress",
    ] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_events_emitted_after_append() {
    let (mut s, sink) = recording_store();
    submit(
        &mut s,
        SubmitThought::new("I must write a Python script that parses CSV files.", 1, 3, true),
    );
    assert_eq!(sink.names(), vec!["session_initialized", "thought_appended"]);

    sink.clear();
    submit(
        &mut s,
        SubmitThought::new("Penguins migrate across frozen oceans every winter", 2, 3, true),
    );
    assert!(sink.names().contains(&"drift_detected"));
}

#[test]
fn test_snapshot_serializes_without_vectors() {
    let mut s = store();
    submit(&mut s, SubmitThought::new("Read the input file", 1, 2, true));
    let value = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(value["thoughts"].as_array().unwrap().len(), 1);
    assert!(value["thoughts"][0].get("vector").is_none());
    assert!(value["adjacency"].get("1").is_some());
    assert_eq!(value["sessionId"], s.session_id().to_string());
}

#[test]
fn test_same_inputs_same_outputs() {
    let inputs = || {
        vec![
            SubmitThought::new("I must write a Python script that parses CSV files. Urgent.", 1, 3, true),
            SubmitThought::new("Open the file with the csv module", 2, 3, true).with_dependencies([1]),
            SubmitThought::new("Maybe pandas is faster", 3, 3, true).with_tools(["calculator"]),
            SubmitThought::new("Therefore the csv module is enough", 4, 4, false),
        ]
    };

    let mut a = store();
    let mut b = store();
    for (x, y) in inputs().into_iter().zip(inputs()) {
        let ra = submit(&mut a, x);
        let rb = submit(&mut b, y);
        assert_eq!(ra.thought_analysis, rb.thought_analysis);
        assert_eq!(ra.recommendations, rb.recommendations);
        assert_eq!(ra.total_thoughts, rb.total_thoughts);
    }
}
