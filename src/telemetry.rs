//! Structured session events.
//!
//! The store never logs while scoring. After a thought has been appended it
//! hands one or more [`SessionEvent`]s to a [`TelemetrySink`]; the default
//! [`TracingSink`] turns them into `tracing` records on stderr.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::{Classification, Phase};
use crate::profile::{Complexity, TaskType};

/// Something that happened in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A prompt profile was built.
    SessionInitialized {
        /// Session identifier
        session_id: String,
        /// Inferred task type
        task_type: TaskType,
        /// Inferred complexity
        complexity: Complexity,
        /// Number of goals found
        goals: usize,
        /// Number of constraints found
        constraints: usize,
    },
    /// A thought was appended to the graph.
    ThoughtAppended {
        /// Canonical thought number
        thought_number: u32,
        /// Phase of the thought
        phase: Phase,
        /// Classification of the thought
        classification: Classification,
        /// Alignment score (0-10)
        alignment_score: f64,
        /// Quality score (0-10)
        quality_score: f64,
        /// Whether the thought revises an earlier one
        is_revision: bool,
        /// Adjustments made to the submitted input
        warnings: Vec<String>,
    },
    /// A branch was created.
    BranchCreated {
        /// Branch label
        branch_id: String,
        /// Thought the branch forks from
        from_thought: u32,
    },
    /// Contradictions were found for a thought.
    ContradictionsDetected {
        /// Thought the contradictions belong to
        thought_number: u32,
        /// Conflicts with earlier thoughts
        with_thoughts: Vec<u32>,
        /// Conflicts with the prompt
        with_prompt: usize,
    },
    /// A thought drifted from the prompt.
    DriftDetected {
        /// Drifting thought
        thought_number: u32,
        /// Drift score (0-1)
        score: f64,
        /// Warning text
        reason: String,
    },
    /// A pretrained vector table was installed.
    PretrainedVectorsInstalled {
        /// Where the table came from
        source: String,
        /// Number of words in the table
        words: usize,
        /// Vector dimension of the table
        dimension: usize,
    },
}

impl SessionEvent {
    /// Event name as serialized
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionInitialized { .. } => "session_initialized",
            SessionEvent::ThoughtAppended { .. } => "thought_appended",
            SessionEvent::BranchCreated { .. } => "branch_created",
            SessionEvent::ContradictionsDetected { .. } => "contradictions_detected",
            SessionEvent::DriftDetected { .. } => "drift_detected",
            SessionEvent::PretrainedVectorsInstalled { .. } => "pretrained_vectors_installed",
        }
    }
}

/// Consumer of session events.
pub trait TelemetrySink: Send + Sync {
    /// Receive one event.
    fn emit(&self, event: &SessionEvent);
}

/// Writes events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SessionInitialized {
                session_id,
                task_type,
                complexity,
                goals,
                constraints,
            } => info!(
                session_id = %session_id,
                task_type = %task_type,
                complexity = %complexity,
                goals = goals,
                constraints = constraints,
                "Session initialized"
            ),
            SessionEvent::ThoughtAppended {
                thought_number,
                phase,
                classification,
                alignment_score,
                quality_score,
                is_revision,
                warnings,
            } => {
                for warning in warnings {
                    warn!(thought_number = thought_number, warning = %warning, "Thought input adjusted");
                }
                info!(
                    thought_number = thought_number,
                    phase = %phase,
                    classification = %classification,
                    alignment_score = alignment_score,
                    quality_score = quality_score,
                    is_revision = is_revision,
                    "Thought appended"
                );
            }
            SessionEvent::BranchCreated {
                branch_id,
                from_thought,
            } => info!(branch_id = %branch_id, from_thought = from_thought, "Branch created"),
            SessionEvent::ContradictionsDetected {
                thought_number,
                with_thoughts,
                with_prompt,
            } => warn!(
                thought_number = thought_number,
                with_thoughts = ?with_thoughts,
                with_prompt = with_prompt,
                "Contradictions detected"
            ),
            SessionEvent::DriftDetected {
                thought_number,
                score,
                reason,
            } => warn!(
                thought_number = thought_number,
                score = score,
                reason = %reason,
                "Drift detected"
            ),
            SessionEvent::PretrainedVectorsInstalled {
                source,
                words,
                dimension,
            } => debug!(
                source = %source,
                words = words,
                dimension = dimension,
                "Pretrained vectors installed"
            ),
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: &SessionEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Names of the events received so far
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(SessionEvent::name)
            .collect()
    }

    /// Forget all events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drift() -> SessionEvent {
        SessionEvent::DriftDetected {
            thought_number: 3,
            score: 0.8,
            reason: "off topic".to_string(),
        }
    }

    #[test]
    fn test_recording_sink_collects_in_order() {
        let sink = RecordingSink::new();
        sink.emit(&drift());
        sink.emit(&SessionEvent::BranchCreated {
            branch_id: "alt".to_string(),
            from_thought: 1,
        });
        assert_eq!(sink.names(), vec!["drift_detected", "branch_created"]);
        assert_eq!(sink.events()[0], drift());

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let value = serde_json::to_value(drift()).unwrap();
        assert_eq!(value["event"], "drift_detected");
        assert_eq!(value["thought_number"], 3);
    }

    #[test]
    fn test_noop_and_tracing_sinks_accept_events() {
        NoopSink.emit(&drift());
        TracingSink.emit(&drift());
    }
}
