//! Guidance recommendations for the next step of a session.
//!
//! [`RecommendationEngine::recommend`] is a pure function of a
//! [`RecommendationContext`]. Every list it produces is rule-based and
//! capped, so the same context always yields the same bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Classification, Phase, ThoughtSummary};
use crate::profile::{Complexity, PromptProfile, TaskType};

const MAX_STRATEGIES: usize = 3;
const MIN_REASONING_TYPES: usize = 2;
const MAX_REASONING_TYPES: usize = 3;
const MAX_METACOGNITIVE: usize = 3;
const MAX_INSIGHT_PROMPTS: usize = 3;
const MAX_LEARNING: usize = 2;

/// Prior thoughts required before pattern analysis runs.
pub const PATTERN_ANALYSIS_MIN_THOUGHTS: usize = 3;

/// Dimension score above which a phase gets extra weight.
const HIGH_DIMENSION: f64 = 7.0;

// ============================================================================
// Context
// ============================================================================

/// Everything the engine reads.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationContext<'a> {
    /// Session prompt profile
    pub profile: &'a PromptProfile,
    /// Number of the thought being recommended for
    pub thought_number: u32,
    /// Current total thought estimate
    pub total_thoughts: u32,
    /// Phase of the current thought
    pub phase: Phase,
    /// Summaries of the thoughts appended before this one
    pub prior: &'a [ThoughtSummary],
    /// Tools the agent can call
    pub available_tools: &'a [String],
}

impl RecommendationContext<'_> {
    /// Fraction of the estimated session completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        (self.thought_number as f64 / self.total_thoughts.max(1) as f64).clamp(0.0, 1.0)
    }

    fn bucket(&self) -> ProgressBucket {
        ProgressBucket::from_progress(self.progress())
    }
}

/// Coarse position within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBucket {
    /// Less than 30% done
    Early,
    /// Less than 70% done
    Middle,
    /// The rest
    Late,
}

impl ProgressBucket {
    /// Bucket for a progress fraction
    pub fn from_progress(progress: f64) -> Self {
        if progress < 0.3 {
            ProgressBucket::Early
        } else if progress < 0.7 {
            ProgressBucket::Middle
        } else {
            ProgressBucket::Late
        }
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// A named approach to the next step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name, unique within a bundle
    pub name: String,
    /// What to do
    pub description: String,
}

/// A reasoning style worth applying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningSuggestion {
    /// Reasoning type, unique within a bundle
    pub reasoning_type: String,
    /// Why it fits
    pub rationale: String,
}

/// Dimensional complexity estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityEstimate {
    /// Profile complexity the estimate starts from
    pub level: Complexity,
    /// conceptual, technical, scope and uncertainty scores (0-10)
    pub dimensions: BTreeMap<String, f64>,
    /// Mean of the dimension scores
    pub overall: f64,
    /// Suggested session length
    pub recommended_thoughts: u32,
}

/// A bias the agent is prone to at this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveBias {
    /// Bias name
    pub name: String,
    /// Fixed likelihood (0-1)
    pub likelihood: f64,
    /// How to counter it
    pub mitigation: String,
}

/// Whether a dominant pattern helps or hurts this task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternImpact {
    /// Fits the task
    Positive,
    /// Works against the task
    Negative,
    /// Neither
    Neutral,
}

/// A pattern that dominates the session so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantPattern {
    /// Pattern name, e.g. `Planning-Heavy`
    pub name: String,
    /// Share of thoughts (or tool uses) showing the pattern (0-1)
    pub share: f64,
    /// Impact given the task
    pub impact: PatternImpact,
}

/// Direction of reasoning diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiversityTrend {
    /// Second half more diverse by more than one point
    Improving,
    /// Within one point
    Stable,
    /// Second half less diverse by more than one point
    Narrowing,
}

/// Cross-thought pattern analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    /// Thoughts per phase
    pub phase_distribution: BTreeMap<Phase, usize>,
    /// Uses per tool
    pub tool_distribution: BTreeMap<String, usize>,
    /// Thoughts per classification
    pub classification_distribution: BTreeMap<Classification, usize>,
    /// Entropy-based diversity (0-10)
    pub diversity_score: f64,
    /// Detected dominant patterns
    pub dominant_patterns: Vec<DominantPattern>,
    /// Diversity trend from the first half to the second
    pub trend: DiversityTrend,
}

/// Everything recommended for one thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationBundle {
    /// Up to three strategies
    pub strategies: Vec<Strategy>,
    /// Two or three reasoning types
    pub reasoning_types: Vec<ReasoningSuggestion>,
    /// Complexity estimate
    pub complexity: ComplexityEstimate,
    /// Suggested share of thoughts per phase, in percent
    pub phase_distribution: BTreeMap<Phase, f64>,
    /// Recommended tools from the available list
    pub tools: Vec<String>,
    /// What to concentrate on now
    pub focus_areas: Vec<String>,
    /// What tends to go wrong
    pub pitfalls: Vec<String>,
    /// Biases to watch for
    pub cognitive_biases: Vec<CognitiveBias>,
    /// Self-monitoring strategies
    pub metacognitive_strategies: Vec<String>,
    /// Course corrections based on the session so far
    pub adaptive_suggestions: Vec<String>,
    /// Questions that may unlock insight
    pub insight_prompts: Vec<String>,
    /// Things worth learning for this task
    pub learning_recommendations: Vec<String>,
    /// Present once enough thoughts exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_analysis: Option<PatternAnalysis>,
}

// ============================================================================
// Engine
// ============================================================================

/// Rule-based recommendation engine. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// Create an engine
    pub fn new() -> Self {
        Self
    }

    /// Build the full bundle for a context.
    pub fn recommend(&self, ctx: &RecommendationContext<'_>) -> RecommendationBundle {
        let complexity = estimate_complexity(ctx.profile);
        let tools = recommend_tools(ctx);

        RecommendationBundle {
            strategies: strategies(ctx),
            reasoning_types: reasoning_types(ctx),
            phase_distribution: phase_distribution(&complexity),
            adaptive_suggestions: adaptive_suggestions(ctx, &tools),
            tools,
            complexity,
            focus_areas: focus_areas(ctx),
            pitfalls: pitfalls(ctx.profile),
            cognitive_biases: cognitive_biases(ctx),
            metacognitive_strategies: metacognitive_strategies(ctx),
            insight_prompts: insight_prompts(ctx),
            learning_recommendations: learning_recommendations(ctx.profile),
            pattern_analysis: (ctx.prior.len() >= PATTERN_ANALYSIS_MIN_THOUGHTS)
                .then(|| analyze_patterns(ctx.prior, ctx.profile)),
        }
    }

    /// Complexity estimate alone.
    pub fn estimate_complexity(&self, profile: &PromptProfile) -> ComplexityEstimate {
        estimate_complexity(profile)
    }
}

// ============================================================================
// Strategies and reasoning types
// ============================================================================

fn task_strategy(task: TaskType) -> (&'static str, &'static str) {
    match task {
        TaskType::Technical => (
            "Incremental Implementation",
            "Build the solution in small steps and verify each one before moving on",
        ),
        TaskType::Analytical => (
            "Structured Decomposition",
            "Break the problem into components and analyze each separately",
        ),
        TaskType::Creative => (
            "Divergent Exploration",
            "Generate several distinct ideas before committing to one",
        ),
        TaskType::Informational => (
            "Source Synthesis",
            "Collect the key facts and organize them around the question",
        ),
        TaskType::Mixed => (
            "Hybrid Approach",
            "Alternate between analysis and exploration as the task requires",
        ),
    }
}

fn phase_strategy(phase: Phase) -> (&'static str, &'static str) {
    match phase {
        Phase::Planning => (
            "Goal Clarification",
            "Restate the goals and constraints before choosing an approach",
        ),
        Phase::Analysis => (
            "Evidence Gathering",
            "Collect the facts that distinguish the candidate approaches",
        ),
        Phase::Execution => (
            "Stepwise Execution",
            "Carry out the plan one step at a time and record each result",
        ),
        Phase::Verification => (
            "Requirement Checklist",
            "Check the result against every goal and constraint",
        ),
    }
}

fn progress_strategy(bucket: ProgressBucket) -> (&'static str, &'static str) {
    match bucket {
        ProgressBucket::Early => ("Broad Survey", "Map the problem space before going deep"),
        ProgressBucket::Middle => (
            "Depth First",
            "Pursue the most promising line of reasoning to a concrete result",
        ),
        ProgressBucket::Late => (
            "Convergence",
            "Consolidate findings and drive toward a final answer",
        ),
    }
}

fn complexity_strategy(complexity: Complexity) -> (&'static str, &'static str) {
    match complexity {
        Complexity::Complex => (
            "Divide and Conquer",
            "Split the task into independent parts with their own checks",
        ),
        Complexity::Medium => (
            "Iterative Refinement",
            "Produce a rough answer first and improve it in passes",
        ),
        Complexity::Simple => ("Direct Path", "Take the most direct route to the answer"),
    }
}

fn strategies(ctx: &RecommendationContext<'_>) -> Vec<Strategy> {
    let candidates = [
        task_strategy(ctx.profile.task_type),
        phase_strategy(ctx.phase),
        progress_strategy(ctx.bucket()),
        complexity_strategy(ctx.profile.complexity),
    ];

    let mut out: Vec<Strategy> = Vec::new();
    for (name, description) in candidates {
        if out.len() == MAX_STRATEGIES {
            break;
        }
        if !out.iter().any(|s| s.name == name) {
            out.push(Strategy {
                name: name.to_string(),
                description: description.to_string(),
            });
        }
    }
    out
}

fn reasoning_types(ctx: &RecommendationContext<'_>) -> Vec<ReasoningSuggestion> {
    let task = match ctx.profile.task_type {
        TaskType::Technical => ("deductive", "Derive each step from the requirements"),
        TaskType::Analytical => ("causal", "Trace causes and effects behind the observations"),
        TaskType::Creative => ("analogical", "Borrow structure from similar problems"),
        TaskType::Informational => ("inductive", "Generalize from the collected facts"),
        TaskType::Mixed => ("systems", "Consider how the parts of the task interact"),
    };
    let phase = match ctx.phase {
        Phase::Planning => ("systems", "Lay out the parts of the problem and how they connect"),
        Phase::Analysis => ("causal", "Explain why the observations hold"),
        Phase::Execution => ("deductive", "Apply the plan step by step"),
        Phase::Verification => ("critical", "Look for flaws in the result"),
    };
    let complexity = match ctx.profile.complexity {
        Complexity::Complex => ("systems", "Keep the interactions between parts in view"),
        Complexity::Medium => ("inductive", "Build the solution up from worked examples"),
        Complexity::Simple => ("deductive", "Go straight from premises to conclusion"),
    };
    let padding = [
        ("critical", "Challenge the current line of reasoning"),
        ("deductive", "Check that conclusions follow from the premises"),
    ];

    let mut out: Vec<ReasoningSuggestion> = Vec::new();
    for (kind, rationale) in [task, phase, complexity] {
        push_reasoning(&mut out, kind, rationale);
    }
    for (kind, rationale) in padding {
        if out.len() >= MIN_REASONING_TYPES {
            break;
        }
        push_reasoning(&mut out, kind, rationale);
    }
    out.truncate(MAX_REASONING_TYPES);
    out
}

fn push_reasoning(out: &mut Vec<ReasoningSuggestion>, kind: &str, rationale: &str) {
    if !out.iter().any(|r| r.reasoning_type == kind) {
        out.push(ReasoningSuggestion {
            reasoning_type: kind.to_string(),
            rationale: rationale.to_string(),
        });
    }
}

// ============================================================================
// Complexity and phase distribution
// ============================================================================

fn estimate_complexity(profile: &PromptProfile) -> ComplexityEstimate {
    let goals = profile.goals.len() as f64;
    let constraints = profile.constraints.len() as f64;
    let domains = profile.domains.len() as f64;
    let entities = profile.entities.len().min(4) as f64;
    let task = profile.task_type;
    let level_nudge = match profile.complexity {
        Complexity::Complex => 1.0,
        Complexity::Medium => 0.0,
        Complexity::Simple => -1.0,
    };

    let mut conceptual = 5.0 + 0.5 * (domains - 1.0).max(0.0) + level_nudge;
    if matches!(task, TaskType::Analytical | TaskType::Creative) {
        conceptual += 1.0;
    }

    let mut technical = 5.0;
    if task == TaskType::Technical {
        technical += 2.0;
    }
    if profile
        .domains
        .iter()
        .any(|d| d == "programming" || d == "math" || d == "data")
    {
        technical += 1.0;
    }
    if task == TaskType::Informational {
        technical -= 1.0;
    }

    let scope = 5.0 + 0.5 * (goals - 1.0).max(0.0) + 0.5 * constraints.min(4.0) + level_nudge;

    let mut uncertainty = 5.0 - 0.25 * entities;
    if constraints == 0.0 {
        uncertainty += 1.0;
    } else {
        uncertainty -= 0.5 * constraints.min(4.0);
    }
    if matches!(task, TaskType::Creative | TaskType::Mixed) {
        uncertainty += 1.0;
    }

    let dimensions: BTreeMap<String, f64> = [
        ("conceptual", conceptual),
        ("technical", technical),
        ("scope", scope),
        ("uncertainty", uncertainty),
    ]
    .into_iter()
    .map(|(name, score)| (name.to_string(), score.clamp(0.0, 10.0)))
    .collect();

    let overall = dimensions.values().sum::<f64>() / dimensions.len() as f64;
    let base = match profile.complexity {
        Complexity::Simple => 5.0,
        Complexity::Medium => 8.0,
        Complexity::Complex => 12.0,
    };
    let recommended = (base * (1.0 + (overall - 5.0) / 10.0)).round().max(3.0) as u32;

    ComplexityEstimate {
        level: profile.complexity,
        dimensions,
        overall,
        recommended_thoughts: recommended,
    }
}

fn phase_distribution(estimate: &ComplexityEstimate) -> BTreeMap<Phase, f64> {
    let base = match estimate.level {
        Complexity::Simple => [20.0, 25.0, 40.0, 15.0],
        Complexity::Medium => [20.0, 30.0, 35.0, 15.0],
        Complexity::Complex => [25.0, 30.0, 30.0, 15.0],
    };
    let mut weights: BTreeMap<Phase, f64> = Phase::ALL.into_iter().zip(base).collect();

    // Each demanding dimension leans on one phase.
    let leans = [
        ("scope", Phase::Planning),
        ("conceptual", Phase::Analysis),
        ("technical", Phase::Execution),
        ("uncertainty", Phase::Verification),
    ];
    for (dimension, phase) in leans {
        if estimate.dimensions.get(dimension).copied().unwrap_or(5.0) > HIGH_DIMENSION {
            *weights.entry(phase).or_insert(0.0) += 5.0;
        }
    }

    let total: f64 = weights.values().sum();
    for value in weights.values_mut() {
        *value = *value * 100.0 / total;
    }
    weights
}

// ============================================================================
// Tools, focus, pitfalls and biases
// ============================================================================

fn recommend_tools(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let profile = ctx.profile;
    let has_domain = |name: &str| profile.domains.iter().any(|d| d == name);
    let mentions = |terms: &[&str]| {
        profile
            .keywords
            .iter()
            .any(|k| terms.iter().any(|t| k.split(' ').any(|w| w == *t)))
    };

    ctx.available_tools
        .iter()
        .filter(|tool| match tool.as_str() {
            "web_search" => {
                profile.task_type == TaskType::Informational
                    || has_domain("science")
                    || has_domain("business")
                    || ctx.phase == Phase::Analysis
            }
            "code_interpreter" => {
                profile.task_type == TaskType::Technical
                    || has_domain("programming")
                    || has_domain("data")
                    || ctx.phase == Phase::Execution
            }
            "calculator" => has_domain("math") || has_domain("business") || has_domain("data"),
            "file_reader" => has_domain("data") || mentions(&["file", "files", "document", "documents"]),
            "knowledge_base" => {
                matches!(profile.task_type, TaskType::Informational | TaskType::Analytical)
                    || ctx.phase == Phase::Planning
            }
            _ => false,
        })
        .cloned()
        .collect()
}

fn focus_areas(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let mut areas: Vec<String> = match ctx.bucket() {
        ProgressBucket::Early => vec![
            "Clarify the requirements".to_string(),
            "Identify the main unknowns".to_string(),
        ],
        ProgressBucket::Middle => vec![
            "Develop the core approach".to_string(),
            "Test intermediate results".to_string(),
        ],
        ProgressBucket::Late => vec![
            "Consolidate the findings".to_string(),
            "Verify the solution against the goals".to_string(),
        ],
    };

    if ctx.bucket() == ProgressBucket::Early && !ctx.profile.constraints.is_empty() {
        areas.push("Map out the constraints".to_string());
    }
    if let Some(domain) = ctx.profile.domains.first() {
        areas.push(format!("Apply {} best practices", domain));
    }
    areas
}

fn pitfalls(profile: &PromptProfile) -> Vec<String> {
    let mut out = vec![match profile.task_type {
        TaskType::Technical => "Skipping edge cases and error handling",
        TaskType::Analytical => "Drawing conclusions from incomplete evidence",
        TaskType::Creative => "Settling on the first idea too early",
        TaskType::Informational => "Presenting unverified facts",
        TaskType::Mixed => "Losing track of which part of the task is being addressed",
    }
    .to_string()];

    match profile.complexity {
        Complexity::Complex => out.push("Underestimating the number of moving parts".to_string()),
        Complexity::Simple => out.push("Overengineering a simple task".to_string()),
        Complexity::Medium => {}
    }
    if !profile.constraints.is_empty() {
        out.push("Violating an explicit constraint".to_string());
    }
    if profile.domains.len() > 1 {
        out.push("Mixing assumptions from different domains".to_string());
    }
    out
}

fn bias(name: &str, likelihood: f64, mitigation: &str) -> CognitiveBias {
    CognitiveBias {
        name: name.to_string(),
        likelihood,
        mitigation: mitigation.to_string(),
    }
}

fn cognitive_biases(ctx: &RecommendationContext<'_>) -> Vec<CognitiveBias> {
    let task = match ctx.profile.task_type {
        TaskType::Technical => bias(
            "Confirmation Bias",
            0.6,
            "Write checks that try to break the solution",
        ),
        TaskType::Analytical => bias(
            "Anchoring",
            0.6,
            "Consider alternatives before settling on the first estimate",
        ),
        TaskType::Creative => bias(
            "Functional Fixedness",
            0.5,
            "Ask how the problem would be solved with entirely different tools",
        ),
        TaskType::Informational => bias(
            "Availability Heuristic",
            0.5,
            "Check that the most memorable facts are also the most relevant",
        ),
        TaskType::Mixed => bias(
            "Framing Effect",
            0.4,
            "Restate the problem in a different way and compare",
        ),
    };
    let phase = match ctx.phase {
        Phase::Planning => bias(
            "Planning Fallacy",
            0.7,
            "Add slack to the estimate and list what could go wrong",
        ),
        Phase::Analysis => bias(
            "Confirmation Bias",
            0.6,
            "Look for evidence against the favored explanation",
        ),
        Phase::Execution => bias(
            "Sunk Cost Fallacy",
            0.5,
            "Be ready to drop an approach that is not working",
        ),
        Phase::Verification => bias(
            "Overconfidence",
            0.6,
            "Verify against the original requirements, not the memory of them",
        ),
    };

    let mut out: Vec<CognitiveBias> = Vec::new();
    let mut candidates = vec![task, phase];
    if ctx.profile.complexity == Complexity::Complex {
        candidates.push(bias(
            "Overconfidence",
            0.5,
            "Estimate confidence explicitly for each major step",
        ));
    }
    for candidate in candidates {
        if !out.iter().any(|b| b.name == candidate.name) {
            out.push(candidate);
        }
    }
    out
}

// ============================================================================
// Metacognition, adaptation, insight and learning
// ============================================================================

fn metacognitive_strategies(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let progress = match ctx.bucket() {
        ProgressBucket::Early => "Restate the problem in your own words",
        ProgressBucket::Middle => "Pause and check whether the current path still serves the goal",
        ProgressBucket::Late => "Review which assumptions were never verified",
    };
    let task = match ctx.profile.task_type {
        TaskType::Technical => "Trace the solution on a concrete example",
        TaskType::Analytical => "Argue against your own conclusion",
        TaskType::Creative => "Rate each idea before developing it further",
        TaskType::Informational => "Check that each claim has a source",
        TaskType::Mixed => "Name which kind of thinking the next step needs",
    };

    [progress, task, "Estimate your confidence in the current thought"]
        .into_iter()
        .take(MAX_METACOGNITIVE)
        .map(String::from)
        .collect()
}

fn adaptive_suggestions(ctx: &RecommendationContext<'_>, tools: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let progress = ctx.progress();

    let recent: Vec<f64> = ctx
        .prior
        .iter()
        .rev()
        .take(3)
        .map(|s| s.alignment_score)
        .collect();
    if recent.len() >= 2 && recent.iter().sum::<f64>() / (recent.len() as f64) < 4.0 {
        out.push("Recent thoughts are drifting from the prompt; revisit the goals".to_string());
    }
    if ctx.thought_number >= ctx.total_thoughts {
        out.push("Decide whether more thoughts are needed or the session can conclude".to_string());
    }
    if ctx.phase == Phase::Planning && progress > 0.3 {
        out.push("Planning is running long; consider moving to analysis".to_string());
    }
    if ctx.phase == Phase::Verification && progress < 0.5 {
        out.push("Verification is starting early; make sure the solution is complete".to_string());
    }
    let used_tools = ctx.prior.iter().any(|s| !s.tools_used.is_empty());
    if let Some(tool) = tools.first().filter(|_| !used_tools && ctx.thought_number > 2) {
        out.push(format!("Consider using a tool such as {}", tool));
    }
    out
}

fn insight_prompts(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let task = match ctx.profile.task_type {
        TaskType::Technical => "Which input would break the current design?",
        TaskType::Analytical => "What evidence would change the conclusion?",
        TaskType::Creative => "What would the opposite approach look like?",
        TaskType::Informational => "What does the reader most need to know first?",
        TaskType::Mixed => "Which part of the task matters most to the outcome?",
    };
    let phase = match ctx.phase {
        Phase::Planning => "What is the simplest plan that meets every goal?",
        Phase::Analysis => "Which assumption is doing the most work?",
        Phase::Execution => "What is the smallest next step that can be checked?",
        Phase::Verification => "Which requirement is the easiest to miss?",
    };

    [task, phase, "What has been overlooked so far?"]
        .into_iter()
        .take(MAX_INSIGHT_PROMPTS)
        .map(String::from)
        .collect()
}

fn learning_recommendations(profile: &PromptProfile) -> Vec<String> {
    let domain = profile.domains.iter().filter_map(|d| {
        let advice = match d.as_str() {
            "programming" => "Review idiomatic patterns for the language in use",
            "math" => "Revisit the definitions and theorems the problem relies on",
            "science" => "Check the experimental method behind the claims",
            "business" => "Study how similar organizations measured success",
            "writing" => "Read strong examples of the target form",
            "design" => "Look at established design systems for precedent",
            "data" => "Profile the data before drawing conclusions from it",
            _ => return None,
        };
        Some(advice.to_string())
    });

    let task = match profile.task_type {
        TaskType::Technical => "Practice writing test cases before the implementation",
        TaskType::Analytical => "Learn a structured analysis framework",
        TaskType::Creative => "Try a timed ideation technique",
        TaskType::Informational => "Practice summarizing sources in a few sentences",
        TaskType::Mixed => "Practice breaking mixed tasks into typed subtasks",
    };

    domain
        .chain(std::iter::once(task.to_string()))
        .take(MAX_LEARNING)
        .collect()
}

// ============================================================================
// Pattern analysis
// ============================================================================

/// Entropy of a distribution normalized by `log2(distinct)`; 0 with at most one value.
pub fn normalized_entropy<K>(distribution: &BTreeMap<K, usize>) -> f64 {
    let distinct = distribution.values().filter(|&&c| c > 0).count();
    if distinct <= 1 {
        return 0.0;
    }
    let total: usize = distribution.values().sum();
    let entropy: f64 = distribution
        .values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / (distinct as f64).log2()
}

struct Distributions {
    phases: BTreeMap<Phase, usize>,
    tools: BTreeMap<String, usize>,
    classifications: BTreeMap<Classification, usize>,
}

impl Distributions {
    fn of(thoughts: &[ThoughtSummary]) -> Self {
        let mut phases = BTreeMap::new();
        let mut tools = BTreeMap::new();
        let mut classifications = BTreeMap::new();
        for t in thoughts {
            *phases.entry(t.phase).or_insert(0) += 1;
            *classifications.entry(t.classification).or_insert(0) += 1;
            for tool in &t.tools_used {
                *tools.entry(tool.clone()).or_insert(0) += 1;
            }
        }
        Self {
            phases,
            tools,
            classifications,
        }
    }

    fn diversity(&self) -> f64 {
        (4.0 * normalized_entropy(&self.phases)
            + 3.0 * normalized_entropy(&self.tools)
            + 3.0 * normalized_entropy(&self.classifications))
        .clamp(0.0, 10.0)
    }
}

/// Diversity score (0-10) of a thought sequence.
pub fn diversity_score(thoughts: &[ThoughtSummary]) -> f64 {
    Distributions::of(thoughts).diversity()
}

fn analyze_patterns(prior: &[ThoughtSummary], profile: &PromptProfile) -> PatternAnalysis {
    let dist = Distributions::of(prior);
    let n = prior.len();
    let share_of = |count: usize| count as f64 / n as f64;
    let phase_share = |p: Phase| share_of(dist.phases.get(&p).copied().unwrap_or(0));
    let class_share = |c: Classification| share_of(dist.classifications.get(&c).copied().unwrap_or(0));

    let complex = profile.complexity == Complexity::Complex;
    let task = profile.task_type;
    let mut patterns = Vec::new();

    let planning = phase_share(Phase::Planning);
    if planning > 0.4 {
        patterns.push(pattern(
            "Planning-Heavy",
            planning,
            if complex {
                PatternImpact::Positive
            } else {
                PatternImpact::Negative
            },
        ));
    }

    let execution = phase_share(Phase::Execution);
    if execution > 0.5 {
        patterns.push(pattern(
            "Execution-Focused",
            execution,
            if task == TaskType::Technical && !complex {
                PatternImpact::Positive
            } else {
                PatternImpact::Negative
            },
        ));
    }

    if n >= 5 && phase_share(Phase::Verification) == 0.0 {
        patterns.push(pattern(
            "Verification-Light",
            0.0,
            if complex || task == TaskType::Technical {
                PatternImpact::Negative
            } else {
                PatternImpact::Neutral
            },
        ));
    }

    let tool_uses: usize = dist.tools.values().sum();
    if let Some(top) = dist.tools.values().max().filter(|_| tool_uses > 0) {
        let share = *top as f64 / tool_uses as f64;
        if share > 0.5 {
            patterns.push(pattern(
                "Tool-Reliant",
                share,
                if matches!(task, TaskType::Technical | TaskType::Informational) {
                    PatternImpact::Positive
                } else {
                    PatternImpact::Neutral
                },
            ));
        }
    }

    let hypothesis = class_share(Classification::Hypothesis);
    if hypothesis > 0.4 {
        patterns.push(pattern(
            "Hypothesis-Driven",
            hypothesis,
            if matches!(task, TaskType::Analytical | TaskType::Creative) {
                PatternImpact::Positive
            } else {
                PatternImpact::Neutral
            },
        ));
    }

    let question = class_share(Classification::Question);
    if question > 0.4 {
        patterns.push(pattern(
            "Question-Heavy",
            question,
            if task == TaskType::Technical {
                PatternImpact::Negative
            } else {
                PatternImpact::Neutral
            },
        ));
    }

    let (first, second) = prior.split_at(n / 2);
    let delta = diversity_score(second) - diversity_score(first);
    let trend = if delta > 1.0 {
        DiversityTrend::Improving
    } else if delta < -1.0 {
        DiversityTrend::Narrowing
    } else {
        DiversityTrend::Stable
    };

    PatternAnalysis {
        diversity_score: dist.diversity(),
        phase_distribution: dist.phases,
        tool_distribution: dist.tools,
        classification_distribution: dist.classifications,
        dominant_patterns: patterns,
        trend,
    }
}

fn pattern(name: &str, share: f64, impact: PatternImpact) -> DominantPattern {
    DominantPattern {
        name: name.to_string(),
        share,
        impact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PromptProfiler;

    fn tools() -> Vec<String> {
        crate::config::DEFAULT_AVAILABLE_TOOLS
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    fn summary(n: u32, phase: Phase, classification: Classification, tools: &[&str]) -> ThoughtSummary {
        ThoughtSummary {
            thought_number: n,
            phase,
            classification,
            tools_used: tools.iter().map(|t| t.to_string()).collect(),
            alignment_score: 6.0,
        }
    }

    fn ctx<'a>(
        profile: &'a PromptProfile,
        prior: &'a [ThoughtSummary],
        tools: &'a [String],
        thought_number: u32,
        total: u32,
        phase: Phase,
    ) -> RecommendationContext<'a> {
        RecommendationContext {
            profile,
            thought_number,
            total_thoughts: total,
            phase,
            prior,
            available_tools: tools,
        }
    }

    #[test]
    fn test_progress_buckets() {
        assert_eq!(ProgressBucket::from_progress(0.0), ProgressBucket::Early);
        assert_eq!(ProgressBucket::from_progress(0.29), ProgressBucket::Early);
        assert_eq!(ProgressBucket::from_progress(0.3), ProgressBucket::Middle);
        assert_eq!(ProgressBucket::from_progress(0.7), ProgressBucket::Late);
    }

    #[test]
    fn test_strategies_layered_and_capped() {
        let profile = PromptProfiler::new().profile("Implement a parser in Python code.");
        let tools = tools();
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 1, 10, Phase::Planning));

        let names: Vec<&str> = bundle.strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Incremental Implementation", "Goal Clarification", "Broad Survey"]
        );
    }

    #[test]
    fn test_reasoning_types_unique_and_bounded() {
        let profile = PromptProfiler::new().profile("Implement a parser in Python code.");
        let tools = tools();
        let bundle =
            RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 5, 6, Phase::Execution));

        let types: Vec<&str> = bundle
            .reasoning_types
            .iter()
            .map(|r| r.reasoning_type.as_str())
            .collect();
        // technical task, execution phase and simple complexity all suggest deduction
        assert_eq!(types, vec!["deductive", "critical"]);
    }

    #[test]
    fn test_reasoning_types_capped_at_three() {
        let profile = PromptProfiler::new().profile("Compare the two designs.");
        let tools = tools();
        let bundle =
            RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 1, 5, Phase::Verification));
        assert!(bundle.reasoning_types.len() <= 3);
        assert!(bundle.reasoning_types.len() >= 2);
    }

    #[test]
    fn test_complexity_estimate() {
        let simple = PromptProfiler::new().profile("Sort the invoices");
        let estimate = RecommendationEngine::new().estimate_complexity(&simple);
        assert_eq!(estimate.dimensions.len(), 4);
        assert!(estimate.dimensions.values().all(|d| (0.0..=10.0).contains(d)));
        assert!(estimate.recommended_thoughts >= 3);
        assert!(estimate.recommended_thoughts <= 6);

        let complex = PromptProfiler::new().profile(
            "Design a comprehensive pricing model. It must cover revenue and cost. \
             It must stay within budget. We need to compare competitors.",
        );
        let estimate = RecommendationEngine::new().estimate_complexity(&complex);
        assert_eq!(estimate.level, Complexity::Complex);
        assert!(estimate.recommended_thoughts >= 10);
    }

    #[test]
    fn test_phase_distribution_sums_to_hundred() {
        let profile = PromptProfiler::new().profile("Implement a parser in Python code. It must be fast.");
        let tools = tools();
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 1, 5, Phase::Planning));
        let total: f64 = bundle.phase_distribution.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(bundle.phase_distribution.len(), 4);
    }

    #[test]
    fn test_tools_come_from_available_list() {
        let profile = PromptProfiler::new().profile("Implement a parser in Python code.");
        let available = vec!["code_interpreter".to_string(), "telescope".to_string()];
        let bundle =
            RecommendationEngine::new().recommend(&ctx(&profile, &[], &available, 1, 5, Phase::Planning));
        assert_eq!(bundle.tools, vec!["code_interpreter".to_string()]);
    }

    #[test]
    fn test_lists_are_capped() {
        let profile = PromptProfiler::new().profile("Implement a parser in Python code for CSV data.");
        let tools = tools();
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 2, 5, Phase::Analysis));
        assert!(bundle.metacognitive_strategies.len() <= 3);
        assert!(bundle.insight_prompts.len() <= 3);
        assert!(bundle.learning_recommendations.len() <= 2);
        assert!(!bundle.cognitive_biases.is_empty());
        assert!(!bundle.pitfalls.is_empty());
    }

    #[test]
    fn test_bias_names_unique() {
        let profile = PromptProfiler::new().profile("Implement the parser code.");
        let tools = tools();
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &[], &tools, 2, 5, Phase::Analysis));
        // technical task and analysis phase both suggest confirmation bias
        assert_eq!(bundle.cognitive_biases.len(), 1);
        assert_eq!(bundle.cognitive_biases[0].name, "Confirmation Bias");
    }

    #[test]
    fn test_pattern_analysis_needs_three_prior() {
        let profile = PromptProfiler::new().profile("Implement the parser code.");
        let tools = tools();
        let two = vec![
            summary(1, Phase::Planning, Classification::Observation, &[]),
            summary(2, Phase::Planning, Classification::Observation, &[]),
        ];
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &two, &tools, 3, 5, Phase::Planning));
        assert!(bundle.pattern_analysis.is_none());

        let mut three = two.clone();
        three.push(summary(3, Phase::Planning, Classification::Hypothesis, &["calculator"]));
        let bundle =
            RecommendationEngine::new().recommend(&ctx(&profile, &three, &tools, 4, 5, Phase::Planning));
        let analysis = bundle.pattern_analysis.unwrap();
        assert_eq!(analysis.phase_distribution[&Phase::Planning], 3);
        assert!(analysis
            .dominant_patterns
            .iter()
            .any(|p| p.name == "Planning-Heavy" && p.impact == PatternImpact::Negative));
        assert!(analysis
            .dominant_patterns
            .iter()
            .any(|p| p.name == "Tool-Reliant"));
    }

    #[test]
    fn test_normalized_entropy() {
        let mut uniform = BTreeMap::new();
        uniform.insert("a", 2);
        uniform.insert("b", 2);
        assert!((normalized_entropy(&uniform) - 1.0).abs() < 1e-9);

        let mut single = BTreeMap::new();
        single.insert("a", 5);
        assert_eq!(normalized_entropy(&single), 0.0);
        assert_eq!(normalized_entropy::<&str>(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_diversity_score_bounds() {
        let monotone: Vec<ThoughtSummary> = (1..=4)
            .map(|n| summary(n, Phase::Planning, Classification::Observation, &[]))
            .collect();
        assert_eq!(diversity_score(&monotone), 0.0);

        let varied = vec![
            summary(1, Phase::Planning, Classification::Question, &["web_search"]),
            summary(2, Phase::Analysis, Classification::Hypothesis, &["calculator"]),
            summary(3, Phase::Execution, Classification::Solution, &["code_interpreter"]),
            summary(4, Phase::Verification, Classification::Conclusion, &["file_reader"]),
        ];
        assert!((diversity_score(&varied) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_improving() {
        let profile = PromptProfiler::new().profile("Implement the parser code.");
        let tools = tools();
        let prior = vec![
            summary(1, Phase::Planning, Classification::Observation, &[]),
            summary(2, Phase::Planning, Classification::Observation, &[]),
            summary(3, Phase::Analysis, Classification::Hypothesis, &["web_search"]),
            summary(4, Phase::Execution, Classification::Solution, &["calculator"]),
        ];
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &prior, &tools, 5, 8, Phase::Execution));
        assert_eq!(bundle.pattern_analysis.unwrap().trend, DiversityTrend::Improving);
    }

    #[test]
    fn test_adaptive_suggestions() {
        let profile = PromptProfiler::new().profile("Implement the parser code.");
        let tools = tools();
        let mut prior = vec![
            summary(1, Phase::Planning, Classification::Observation, &[]),
            summary(2, Phase::Planning, Classification::Observation, &[]),
        ];
        for p in prior.iter_mut() {
            p.alignment_score = 2.0;
        }
        let bundle = RecommendationEngine::new().recommend(&ctx(&profile, &prior, &tools, 3, 3, Phase::Planning));
        let joined = bundle.adaptive_suggestions.join("\n");
        assert!(joined.contains("drifting"));
        assert!(joined.contains("conclude"));
        assert!(joined.contains("Planning is running long"));
        assert!(joined.contains("Consider using a tool"));
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let profile = PromptProfiler::new().profile("Analyze why revenue fell. It must be concise.");
        let tools = tools();
        let prior = vec![
            summary(1, Phase::Planning, Classification::Question, &[]),
            summary(2, Phase::Analysis, Classification::Hypothesis, &["web_search"]),
            summary(3, Phase::Analysis, Classification::Observation, &[]),
        ];
        let c = ctx(&profile, &prior, &tools, 4, 6, Phase::Analysis);
        assert_eq!(
            RecommendationEngine::new().recommend(&c),
            RecommendationEngine::new().recommend(&c)
        );
    }
}
