//! MCP tool dispatch tests
//!
//! Exercises `handle_tool_call` against a shared AppState: the route the
//! stdio server takes for every `tools/call` request.

use std::sync::Arc;

use mcp_thought_graph::config::Config;
use mcp_thought_graph::error::McpError;
use mcp_thought_graph::server::{handle_tool_call, tool_definitions, AppState, SharedState, ToolOutput};
use serde_json::{json, Value};

fn state() -> SharedState {
    Arc::new(AppState::new(Config::default()))
}

async fn call(state: &SharedState, tool: &str, arguments: Value) -> ToolOutput {
    handle_tool_call(state, tool, Some(arguments)).await.unwrap()
}

fn thought(text: &str, number: u32) -> Value {
    json!({
        "thought": text,
        "thoughtNumber": number,
        "totalThoughts": 3,
        "nextThoughtNeeded": true
    })
}

#[test]
fn test_every_listed_tool_routes() {
    let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
    assert!(names.contains(&"sequential_thinking".to_string()));
    assert!(names.contains(&"thought_graph_state".to_string()));
    assert!(names.contains(&"analyze_prompt".to_string()));
}

#[tokio::test]
async fn test_calls_share_one_session() {
    let state = state();

    let first = call(&state, "sequential_thinking", thought("We need to reduce churn.", 1)).await;
    assert!(!first.is_error);
    assert_eq!(first.value["thoughtHistoryLength"], 1);

    let mut second_args = thought("Survey customers who cancelled", 2);
    second_args["dependencies"] = json!([1]);
    let second = call(&state, "sequential_thinking", second_args).await;
    assert_eq!(second.value["thoughtHistoryLength"], 2);
    assert_eq!(second.value["thoughtAnalysis"]["dependencies"], json!([1]));

    let graph = call(&state, "thought_graph_state", json!({})).await;
    assert_eq!(graph.value["thoughts"].as_array().unwrap().len(), 2);
    assert_eq!(graph.value["adjacency"]["1"], json!([2]));
    assert_eq!(graph.value["profile"]["goals"], json!(["We need to reduce churn"]));

    let one = call(&state, "thought_graph_state", json!({"thoughtNumber": 1})).await;
    assert_eq!(one.value["thought"]["thoughtNumber"], 1);
    assert_eq!(one.value["dependents"], json!([2]));
}

#[tokio::test]
async fn test_graph_state_without_arguments() {
    let state = state();
    let out = handle_tool_call(&state, "thought_graph_state", None).await.unwrap();
    assert!(out.value["thoughts"].as_array().unwrap().is_empty());
    assert!(out.value["profile"].is_null());
}

#[tokio::test]
async fn test_rejected_thought_reports_failure() {
    let state = state();
    let out = call(
        &state,
        "sequential_thinking",
        json!({"thought": "", "thoughtNumber": 1, "totalThoughts": 3, "nextThoughtNeeded": true}),
    )
    .await;

    assert!(out.is_error);
    assert_eq!(out.value["status"], "failed");
    assert!(out.value["error"].as_str().unwrap().contains("thought"));

    let graph = call(&state, "thought_graph_state", json!({})).await;
    assert!(graph.value["thoughts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_prompt_is_stateless() {
    let state = state();
    let out = call(
        &state,
        "analyze_prompt",
        json!({"prompt": "I must write a Python script that parses CSV files. Urgent."}),
    )
    .await;

    assert_eq!(out.value["profile"]["taskType"], "technical");
    assert_eq!(out.value["profile"]["priority"], "high");
    assert!(out.value["complexityEstimate"]["dimensions"].is_object());

    let graph = call(&state, "thought_graph_state", json!({})).await;
    assert!(graph.value["profile"].is_null());
}

#[tokio::test]
async fn test_analyze_prompt_requires_prompt() {
    let err = handle_tool_call(&state(), "analyze_prompt", Some(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::InvalidParameters { .. }));
}

#[tokio::test]
async fn test_unknown_tool_is_protocol_error() {
    let err = handle_tool_call(&state(), "reasoning_tree", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown tool: reasoning_tree");
}
