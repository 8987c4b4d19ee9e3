//! Thought graph data model and the stateful store.
//!
//! This module provides:
//! - [`Thought`], [`Branch`] and [`ToolUsage`] records owned by the store
//! - [`SubmitThought`] parsing and validation of ingress payloads
//! - [`ThoughtGraphStore`], which enriches, appends and synthesizes guidance
//! - The response types returned to the transport

mod guidance;
mod input;
mod store;

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;

pub use guidance::*;
pub use input::*;
pub use store::*;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{Contradiction, PromptContradiction};

/// Coarse stage label on a thought.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Understanding the problem and laying out an approach.
    #[default]
    Planning,
    /// Examining the problem in depth.
    Analysis,
    /// Carrying out the approach.
    Execution,
    /// Checking results against the requirements.
    Verification,
}

impl Phase {
    /// All phases in session order.
    pub const ALL: [Phase; 4] = [
        Phase::Planning,
        Phase::Analysis,
        Phase::Execution,
        Phase::Verification,
    ];

    /// Get the phase name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "Planning",
            Phase::Analysis => "Analysis",
            Phase::Execution => "Execution",
            Phase::Verification => "Verification",
        }
    }

    /// Phase suggested for a thought at `progress` (0-1) in this phase.
    ///
    /// The store only suggests; the caller decides whether to move on.
    pub fn suggest_next(&self, progress: f64) -> Phase {
        match self {
            Phase::Planning if progress > 0.2 => Phase::Analysis,
            Phase::Analysis if progress > 0.4 => Phase::Execution,
            Phase::Execution if progress > 0.8 => Phase::Verification,
            other => *other,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" => Ok(Phase::Planning),
            "analysis" => Ok(Phase::Analysis),
            "execution" => Ok(Phase::Execution),
            "verification" => Ok(Phase::Verification),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}

/// Epistemic role of a thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Hypothesis,
    Observation,
    Conclusion,
    Question,
    Solution,
}

const CONCLUSION_MARKERS: &[&str] = &["therefore", "thus", "in conclusion", "conclude", "hence"];
const HYPOTHESIS_MARKERS: &[&str] = &[
    "hypothesis",
    "maybe",
    "might",
    "perhaps",
    "suppose",
    "possibly",
];
const SOLUTION_MARKERS: &[&str] = &["solution", "solve", "fix", "implement", "approach is"];

impl Classification {
    /// Get the classification name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Hypothesis => "hypothesis",
            Classification::Observation => "observation",
            Classification::Conclusion => "conclusion",
            Classification::Question => "question",
            Classification::Solution => "solution",
        }
    }

    /// Guess a classification from marker words when the caller gave none.
    pub fn infer(text: &str) -> Classification {
        if text.trim_end().ends_with('?') {
            return Classification::Question;
        }
        let text_words = crate::text::words(text);
        let has = |markers: &[&str]| {
            markers
                .iter()
                .any(|m| crate::text::contains_phrase(&text_words, &crate::text::words(m)))
        };
        if has(CONCLUSION_MARKERS) {
            Classification::Conclusion
        } else if has(HYPOTHESIS_MARKERS) {
            Classification::Hypothesis
        } else if has(SOLUTION_MARKERS) {
            Classification::Solution
        } else {
            Classification::Observation
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hypothesis" => Ok(Classification::Hypothesis),
            "observation" => Ok(Classification::Observation),
            "conclusion" => Ok(Classification::Conclusion),
            "question" => Ok(Classification::Question),
            "solution" => Ok(Classification::Solution),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

/// One appended unit of reasoning with its computed annotations.
///
/// Thoughts are immutable once appended; the store only hands out shared
/// references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    pub thought_number: u32,
    pub text: String,
    pub total_thoughts_estimate: u32,
    pub next_thought_needed: bool,
    pub phase: Phase,
    pub is_revision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    pub dependencies: BTreeSet<u32>,
    pub tools_used: Vec<String>,
    pub classification: Classification,
    /// Pseudo-embedding; omitted from serialized snapshots.
    #[serde(skip_serializing, default)]
    pub vector: Vec<f32>,
    pub concepts_extracted: Vec<String>,
    pub assumptions: Vec<String>,
    pub contradictions: Vec<Contradiction>,
    pub prompt_contradictions: Vec<PromptContradiction>,
    pub alignment_score: f64,
    pub relevance_by_aspect: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_warning: Option<String>,
    pub missing_aspects: Vec<String>,
    pub quality_score: f64,
    pub insight_value: f64,
    pub created_at: DateTime<Utc>,
}

impl Thought {
    /// Create a bare thought with neutral scores.
    pub fn new(thought_number: u32, text: impl Into<String>) -> Self {
        Self {
            thought_number,
            text: text.into(),
            total_thoughts_estimate: thought_number,
            next_thought_needed: true,
            phase: Phase::default(),
            is_revision: false,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            dependencies: BTreeSet::new(),
            tools_used: Vec::new(),
            classification: Classification::Observation,
            vector: Vec::new(),
            concepts_extracted: Vec::new(),
            assumptions: Vec::new(),
            contradictions: Vec::new(),
            prompt_contradictions: Vec::new(),
            alignment_score: 5.0,
            relevance_by_aspect: BTreeMap::new(),
            drift_warning: None,
            missing_aspects: Vec::new(),
            quality_score: 5.0,
            insight_value: 5.0,
            created_at: Utc::now(),
        }
    }

    /// Set the phase
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the classification
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Mark as a revision of an earlier thought
    pub fn with_revision_of(mut self, thought_number: u32) -> Self {
        self.is_revision = true;
        self.revises_thought = Some(thought_number);
        self
    }

    /// Set dependencies
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = u32>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Set assumptions
    pub fn with_assumptions(mut self, assumptions: Vec<String>) -> Self {
        self.assumptions = assumptions;
        self
    }

    /// Set tools used
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools_used = tools;
        self
    }

    /// Compact view used by the recommendation engine.
    pub fn summary(&self) -> ThoughtSummary {
        ThoughtSummary {
            thought_number: self.thought_number,
            phase: self.phase,
            classification: self.classification,
            tools_used: self.tools_used.clone(),
            alignment_score: self.alignment_score,
        }
    }
}

/// Compact per-thought facts fed to pattern analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtSummary {
    pub thought_number: u32,
    pub phase: Phase,
    pub classification: Classification,
    pub tools_used: Vec<String>,
    pub alignment_score: f64,
}

/// A named sequence of thoughts forked from an earlier thought.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub from_thought: u32,
    pub thoughts: Vec<u32>,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// Create an empty branch forked from `from_thought`.
    pub fn new(id: impl Into<String>, from_thought: u32) -> Self {
        Self {
            id: id.into(),
            from_thought,
            thoughts: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Usage counters for one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsage {
    pub count: usize,
    pub thought_numbers: Vec<u32>,
    pub by_phase: BTreeMap<Phase, usize>,
}

impl ToolUsage {
    /// Count one use in a thought.
    pub fn record(&mut self, thought_number: u32, phase: Phase) {
        self.count += 1;
        self.thought_numbers.push(thought_number);
        *self.by_phase.entry(phase).or_insert(0) += 1;
    }
}

/// Per-tool counters keyed by tool name.
pub type ToolUsageStats = BTreeMap<String, ToolUsage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_str_case_insensitive() {
        assert_eq!("planning".parse::<Phase>().unwrap(), Phase::Planning);
        assert_eq!("ANALYSIS".parse::<Phase>().unwrap(), Phase::Analysis);
        assert_eq!(" Execution ".parse::<Phase>().unwrap(), Phase::Execution);
        assert!("testing".parse::<Phase>().is_err());
    }

    #[test]
    fn test_phase_serializes_capitalized() {
        assert_eq!(
            serde_json::to_value(Phase::Verification).unwrap(),
            "Verification"
        );
    }

    #[test]
    fn test_phase_suggest_next_thresholds() {
        assert_eq!(Phase::Planning.suggest_next(0.2), Phase::Planning);
        assert_eq!(Phase::Planning.suggest_next(0.21), Phase::Analysis);
        assert_eq!(Phase::Analysis.suggest_next(0.4), Phase::Analysis);
        assert_eq!(Phase::Analysis.suggest_next(0.5), Phase::Execution);
        assert_eq!(Phase::Execution.suggest_next(0.8), Phase::Execution);
        assert_eq!(Phase::Execution.suggest_next(0.9), Phase::Verification);
        assert_eq!(Phase::Verification.suggest_next(1.0), Phase::Verification);
    }

    #[test]
    fn test_classification_from_str() {
        assert_eq!(
            "Conclusion".parse::<Classification>().unwrap(),
            Classification::Conclusion
        );
        assert!("guess".parse::<Classification>().is_err());
    }

    #[test]
    fn test_classification_infer() {
        assert_eq!(
            Classification::infer("Should we cache the results?"),
            Classification::Question
        );
        assert_eq!(
            Classification::infer("Therefore the parser is correct."),
            Classification::Conclusion
        );
        assert_eq!(
            Classification::infer("Maybe the delimiter varies per file."),
            Classification::Hypothesis
        );
        assert_eq!(
            Classification::infer("We fix it with a streaming reader."),
            Classification::Solution
        );
        assert_eq!(
            Classification::infer("The file has 3 columns."),
            Classification::Observation
        );
    }

    #[test]
    fn test_thought_builder() {
        let t = Thought::new(3, "text")
            .with_phase(Phase::Execution)
            .with_classification(Classification::Solution)
            .with_dependencies([1, 2, 1]);
        assert_eq!(t.thought_number, 3);
        assert_eq!(t.phase, Phase::Execution);
        assert_eq!(t.dependencies.len(), 2);
        assert!(!t.is_revision);

        let r = Thought::new(4, "rev").with_revision_of(2);
        assert!(r.is_revision);
        assert_eq!(r.revises_thought, Some(2));
    }

    #[test]
    fn test_thought_serialization_omits_vector() {
        let mut t = Thought::new(1, "hello");
        t.vector = vec![0.5; 4];
        let value = serde_json::to_value(&t).unwrap();
        assert!(value.get("vector").is_none());
        assert_eq!(value["thoughtNumber"], 1);
        assert!(value.get("revisesThought").is_none());
    }

    #[test]
    fn test_tool_usage_record() {
        let mut usage = ToolUsage::default();
        usage.record(1, Phase::Planning);
        usage.record(3, Phase::Planning);
        usage.record(4, Phase::Execution);
        assert_eq!(usage.count, 3);
        assert_eq!(usage.thought_numbers, vec![1, 3, 4]);
        assert_eq!(usage.by_phase[&Phase::Planning], 2);
        assert_eq!(usage.by_phase[&Phase::Execution], 1);
    }
}
