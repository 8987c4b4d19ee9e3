//! Response and guidance types returned for each submitted thought.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Branch, Classification, Phase, Thought, ToolUsageStats};
use crate::analysis::{
    Contradiction, PromptContradiction, RecommendationBundle, TopicCluster,
};
use crate::profile::{Complexity, PromptProfile};
use crate::text::summarize;

/// Characters kept in a recent-thought summary.
const SUMMARY_CHARS: usize = 80;

/// Everything returned for one accepted thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtResponse {
    /// Canonical number assigned to the thought
    pub thought_number: u32,
    /// Session length estimate after this thought
    pub total_thoughts: u32,
    /// Echo of the caller's flag
    pub next_thought_needed: bool,
    /// Branch ids in creation order
    pub branches: Vec<String>,
    /// Number of thoughts in the store
    pub thought_history_length: usize,
    /// Tools the caller may use
    pub available_tools: Vec<String>,
    /// Session phase after this thought
    pub current_phase: Phase,
    /// Complexity from the prompt profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_complexity: Option<Complexity>,
    /// Percent of the estimate completed
    pub progress: f64,
    /// Up to the last three thoughts
    pub recent_thoughts: Vec<RecentThought>,
    /// Phase the store suggests next; the caller decides
    pub suggested_next_phase: Phase,
    /// Analysis of this thought
    pub thought_analysis: ThoughtAnalysis,
    /// Recommendations, when a profile exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationBundle>,
    /// Accumulated tool usage
    pub tool_usage_stats: ToolUsageStats,
    /// Topic clusters over all thoughts
    pub topic_clusters: Vec<TopicCluster>,
    /// Adjustments made to the submitted input
    pub warnings: Vec<String>,
    /// Session-level progress, when a profile exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_progress: Option<SessionProgress>,
}

/// Compact view of a recent thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentThought {
    /// Thought number
    pub thought_number: u32,
    /// Phase of the thought
    pub phase: Phase,
    /// Classification of the thought
    pub classification: Classification,
    /// Truncated text
    pub summary: String,
}

impl From<&Thought> for RecentThought {
    fn from(thought: &Thought) -> Self {
        Self {
            thought_number: thought.thought_number,
            phase: thought.phase,
            classification: thought.classification,
            summary: summarize(&thought.text, SUMMARY_CHARS),
        }
    }
}

/// Scores and findings for the thought just appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtAnalysis {
    /// Submitted or inferred classification
    pub classification: Classification,
    /// Quality, 0-10
    pub quality_score: f64,
    /// Novelty against earlier thoughts, 0-10
    pub insight_value: f64,
    /// Alignment with the profile, 0-10
    pub alignment_score: f64,
    /// Relevance per prompt aspect
    pub relevance_by_aspect: BTreeMap<String, f64>,
    /// Drift score, 0-1
    pub drift_score: f64,
    /// Set when the thought drifted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_warning: Option<String>,
    /// Extracted key concepts
    pub concepts: Vec<String>,
    /// Extracted assumptions
    pub assumptions: Vec<String>,
    /// Conflicts with earlier thoughts
    pub contradictions: Vec<Contradiction>,
    /// Conflicts with the prompt
    pub prompt_contradictions: Vec<PromptContradiction>,
    /// Ways to resolve the conflicts found
    pub resolution_strategies: Vec<String>,
    /// Important aspects not yet addressed
    pub missing_aspects: Vec<String>,
    /// Suggestions to steer back on topic
    pub corrective_suggestions: Vec<String>,
    /// Accepted dependencies
    pub dependencies: BTreeSet<u32>,
    /// Thought this one revises
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<u32>,
    /// Branch the thought belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

/// Direction of alignment over recent thoughts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentTrend {
    /// Recent thoughts align better than the ones before
    Improving,
    /// No clear change
    Stable,
    /// Recent thoughts align worse than the ones before
    Declining,
}

impl AlignmentTrend {
    /// Window compared on each side.
    pub const WINDOW: usize = 3;

    /// Compare the mean of the last window of scores against the window before it.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.len() < 2 {
            return AlignmentTrend::Stable;
        }
        let split = scores.len().saturating_sub(Self::WINDOW).max(1);
        let recent = &scores[split..];
        let earlier = &scores[split.saturating_sub(Self::WINDOW)..split];

        let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        let delta = mean(recent) - mean(earlier);
        if delta > 0.5 {
            AlignmentTrend::Improving
        } else if delta < -0.5 {
            AlignmentTrend::Declining
        } else {
            AlignmentTrend::Stable
        }
    }
}

/// How many of the prompt's goals have been addressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCoverage {
    /// Goals some thought has addressed
    pub covered: usize,
    /// Goals in the profile
    pub total: usize,
    /// `covered / total` in percent; 100 when there are no goals
    pub percentage: f64,
    /// Goals not addressed yet
    pub uncovered: Vec<String>,
}

/// Session-level progress reported once a profile exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    /// Percent of the estimate completed
    pub overall_progress: f64,
    /// Thoughts left in the estimate
    pub remaining_thoughts_estimate: u32,
    /// Goal coverage so far
    pub goal_coverage: GoalCoverage,
    /// Alignment direction over recent thoughts
    pub alignment_trend: AlignmentTrend,
}

/// Read-only view of the whole graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot<'a> {
    /// Session identifier
    pub session_id: String,
    /// Prompt profile, once initialized
    pub profile: Option<&'a PromptProfile>,
    /// All thoughts in append order
    pub thoughts: &'a [Thought],
    /// Branch table
    pub branches: &'a [Branch],
    /// Dependency to dependents
    pub adjacency: &'a BTreeMap<u32, BTreeSet<u32>>,
    /// Topic clusters over all thoughts
    pub topic_clusters: &'a [TopicCluster],
    /// Tool usage per tool
    pub tool_usage_stats: &'a ToolUsageStats,
    /// Current total estimate
    pub total_thoughts: u32,
    /// Phase of the last thought
    pub current_phase: Phase,
}
