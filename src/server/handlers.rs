use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::SharedState;
use crate::analysis::{ComplexityEstimate, RecommendationEngine};
use crate::error::{McpError, McpResult};
use crate::graph::Thought;
use crate::profile::{PromptProfile, PromptProfiler};

/// Value produced by a tool, plus whether it reports a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// JSON body returned to the client
    pub value: Value,
    /// Set for results the client should treat as errors
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful result
    pub fn success(value: Value) -> Self {
        Self {
            value,
            is_error: false,
        }
    }

    /// A failed result carrying a structured body
    pub fn failure(value: Value) -> Self {
        Self {
            value,
            is_error: true,
        }
    }
}

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<ToolOutput> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "sequential_thinking" => handle_sequential_thinking(state, arguments).await,
        "thought_graph_state" => handle_graph_state(state, arguments).await,
        "analyze_prompt" => handle_analyze_prompt(arguments),
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Session tools
// ============================================================================

/// Submit one thought.
///
/// A rejected payload is not a protocol error: the client gets the
/// `{"error", "status": "failed"}` body flagged as an error result.
async fn handle_sequential_thinking(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<ToolOutput> {
    let payload = arguments.unwrap_or(Value::Null);

    let outcome = {
        let mut store = state.store.lock().await;
        store.submit(&payload)
    };

    match outcome {
        Ok(response) => Ok(ToolOutput::success(serde_json::to_value(response)?)),
        Err(e) => {
            warn!(error = %e, field = ?e.field(), "Thought rejected");
            Ok(ToolOutput::failure(serde_json::to_value(e.to_failure())?))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphStateParams {
    #[serde(default)]
    thought_number: Option<u32>,
}

/// One thought with the thoughts that depend on it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThoughtView<'a> {
    thought: &'a Thought,
    dependents: Vec<u32>,
}

/// Read-only view of the graph, or of one thought when `thoughtNumber` is given.
async fn handle_graph_state(state: &SharedState, arguments: Option<Value>) -> McpResult<ToolOutput> {
    let params: GraphStateParams = match arguments {
        Some(Value::Object(map)) if map.is_empty() => GraphStateParams::default(),
        Some(args) => parse_arguments("thought_graph_state", Some(args))?,
        None => GraphStateParams::default(),
    };

    let store = state.store.lock().await;
    let value = match params.thought_number {
        None => serde_json::to_value(store.snapshot())?,
        Some(n) => {
            let thought = store.thought(n).ok_or_else(|| McpError::InvalidParameters {
                tool_name: "thought_graph_state".to_string(),
                message: format!("No thought numbered {}", n),
            })?;
            serde_json::to_value(ThoughtView {
                thought,
                dependents: store.dependents_of(n),
            })?
        }
    };

    Ok(ToolOutput::success(value))
}

// ============================================================================
// Stateless tools
// ============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzePromptParams {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptAnalysis {
    profile: PromptProfile,
    complexity_estimate: ComplexityEstimate,
}

/// Profile arbitrary text. Never touches the session.
fn handle_analyze_prompt(arguments: Option<Value>) -> McpResult<ToolOutput> {
    let params: AnalyzePromptParams = parse_arguments("analyze_prompt", arguments)?;

    let profile = PromptProfiler::new().profile(&params.prompt);
    let complexity_estimate = RecommendationEngine::new().estimate_complexity(&profile);

    Ok(ToolOutput::success(serde_json::to_value(PromptAnalysis {
        profile,
        complexity_estimate,
    })?))
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse tool arguments into a typed struct.
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
