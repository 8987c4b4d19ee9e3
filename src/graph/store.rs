//! The stateful thought graph.
//!
//! [`ThoughtGraphStore`] owns every [`Thought`] and [`Branch`] of one
//! session. Each submission runs to completion before the next one:
//!
//! ```text
//! parse → (init profile) → enrich → contradictions → align → recommend → append → guidance → telemetry
//! ```
//!
//! Validation is the only step that can fail, and it runs before anything
//! is mutated. Past thoughts are never rescored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::{
    AlignmentTrend, Branch, Classification, GoalCoverage, GraphSnapshot, Phase, RecentThought,
    SessionProgress, SubmitThought, Thought, ThoughtAnalysis, ThoughtResponse, ToolUsageStats,
};
use crate::analysis::{
    extract_assumptions, AlignmentEngine, AlignmentReport, ContradictionEngine,
    RecommendationBundle, RecommendationContext, RecommendationEngine, SimilarityEngine,
    TopicCluster,
};
use crate::config::Config;
use crate::error::{SessionError, ValidationError, ValidationResult};
use crate::profile::{PromptProfile, PromptProfiler};
use crate::telemetry::{SessionEvent, TelemetrySink};
use crate::text::{extract_keywords, words, Vectorizer};

/// Concepts kept per thought.
const CONCEPT_LIMIT: usize = 5;

/// Goal relevance at which a goal counts as addressed.
const GOAL_COVERED_RELEVANCE: f64 = 0.5;

/// Number of recent thoughts echoed in each response.
const RECENT_THOUGHTS: usize = 3;

/// Owner of one reasoning session.
pub struct ThoughtGraphStore {
    session_id: Uuid,
    vectorizer: Arc<dyn Vectorizer>,
    sink: Arc<dyn TelemetrySink>,
    profiler: PromptProfiler,
    similarity: SimilarityEngine,
    contradiction: ContradictionEngine,
    alignment: AlignmentEngine,
    recommendation: RecommendationEngine,
    available_tools: Vec<String>,
    profile: Option<PromptProfile>,
    thoughts: Vec<Thought>,
    /// thought number -> index into `thoughts`
    index: BTreeMap<u32, usize>,
    /// dependency -> dependents
    adjacency: BTreeMap<u32, BTreeSet<u32>>,
    branches: Vec<Branch>,
    tool_stats: ToolUsageStats,
    total_thoughts: u32,
    current_phase: Phase,
    clusters: Vec<TopicCluster>,
    covered_goals: BTreeSet<usize>,
}

impl std::fmt::Debug for ThoughtGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThoughtGraphStore")
            .field("session_id", &self.session_id)
            .field("thoughts", &self.thoughts.len())
            .field("branches", &self.branches.len())
            .field("total_thoughts", &self.total_thoughts)
            .field("current_phase", &self.current_phase)
            .finish()
    }
}

/// Fields of a submission after canonical numbering and reference checks.
struct Resolved {
    thought_number: u32,
    is_revision: bool,
    revises_thought: Option<u32>,
    branch_from_thought: Option<u32>,
    branch_id: Option<String>,
    dependencies: BTreeSet<u32>,
    phase: Phase,
}

impl ThoughtGraphStore {
    /// Create an empty store.
    pub fn new(config: &Config, vectorizer: Arc<dyn Vectorizer>, sink: Arc<dyn TelemetrySink>) -> Self {
        let analysis = &config.analysis;
        Self {
            session_id: Uuid::new_v4(),
            vectorizer,
            sink,
            profiler: PromptProfiler::new(),
            similarity: SimilarityEngine::new(analysis.cluster_similarity),
            contradiction: ContradictionEngine::new(analysis.contradiction_similarity),
            alignment: AlignmentEngine::new(analysis.drift_threshold),
            recommendation: RecommendationEngine::new(),
            available_tools: config.session.available_tools.clone(),
            profile: None,
            thoughts: Vec::new(),
            index: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            branches: Vec::new(),
            tool_stats: ToolUsageStats::new(),
            total_thoughts: 0,
            current_phase: Phase::default(),
            clusters: Vec::new(),
            covered_goals: BTreeSet::new(),
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Build the prompt profile. Allowed exactly once per store.
    pub fn initialize_session(&mut self, prompt: &str) -> Result<&PromptProfile, SessionError> {
        if self.profile.is_some() {
            return Err(SessionError::AlreadyInitialized {
                session_id: self.session_id.to_string(),
            });
        }

        let profile = self.profiler.profile(prompt);
        self.sink.emit(&SessionEvent::SessionInitialized {
            session_id: self.session_id.to_string(),
            task_type: profile.task_type,
            complexity: profile.complexity,
            goals: profile.goals.len(),
            constraints: profile.constraints.len(),
        });

        Ok(self.profile.insert(profile))
    }

    /// Whether a profile has been built
    pub fn is_initialized(&self) -> bool {
        self.profile.is_some()
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Parse, validate and process an untyped payload.
    ///
    /// On error nothing in the store has changed.
    pub fn submit(&mut self, payload: &Value) -> ValidationResult<ThoughtResponse> {
        let parsed = SubmitThought::parse(payload)?;
        self.process(parsed.input, parsed.warnings)
    }

    /// Validate and process a typed submission.
    pub fn submit_thought(&mut self, input: SubmitThought) -> ValidationResult<ThoughtResponse> {
        input.validate()?;
        self.process(input, Vec::new())
    }

    fn process(
        &mut self,
        input: SubmitThought,
        mut warnings: Vec<String>,
    ) -> ValidationResult<ThoughtResponse> {
        let thought_number = self.assign_number(&input, &mut warnings)?;

        if self.profile.is_none() {
            // Cannot fail: the profile was checked just above.
            let _ = self.initialize_session(&input.thought);
        }

        let resolved = self.resolve(&input, thought_number, &mut warnings);
        let classification = input
            .classification
            .unwrap_or_else(|| Classification::infer(&input.thought));

        // Enrich
        let mut thought = Thought::new(resolved.thought_number, input.thought.as_str())
            .with_phase(resolved.phase)
            .with_classification(classification)
            .with_dependencies(resolved.dependencies.iter().copied())
            .with_assumptions(extract_assumptions(&input.thought))
            .with_tools(input.tools_used.clone());
        thought.next_thought_needed = input.next_thought_needed;
        thought.is_revision = resolved.is_revision;
        thought.revises_thought = resolved.revises_thought;
        thought.branch_from_thought = resolved.branch_from_thought;
        thought.branch_id = resolved.branch_id.clone();
        thought.vector = self.vectorizer.vectorize(&input.thought);
        thought.concepts_extracted = extract_keywords(&input.thought, CONCEPT_LIMIT);

        // Contradictions
        thought.contradictions = self
            .contradiction
            .detect(&thought, &self.thoughts, &self.similarity);
        if let Some(profile) = &self.profile {
            thought.prompt_contradictions = self.contradiction.detect_prompt(&thought, profile);
        }
        let kinds: BTreeSet<_> = thought
            .contradictions
            .iter()
            .map(|c| c.kind)
            .chain(thought.prompt_contradictions.iter().map(|c| c.kind))
            .collect();
        let resolution_strategies = self
            .contradiction
            .resolution_strategies(kinds, resolved.phase);

        // Align
        let report = self
            .alignment
            .analyze_optional(&input.thought, self.profile.as_ref());
        thought.alignment_score = report.alignment_score;
        thought.relevance_by_aspect = report.relevance_by_aspect.clone();
        thought.drift_warning = report.drift.warning();
        thought.missing_aspects = report.missing_aspects.clone();
        thought.quality_score = quality_score(&thought);
        thought.insight_value = self.insight_value(&thought);

        // Recommend
        let mut total = self
            .total_thoughts
            .max(input.total_thoughts)
            .max(resolved.thought_number);
        let recommendations = self.profile.as_ref().map(|profile| {
            let prior: Vec<_> = self.thoughts.iter().map(Thought::summary).collect();
            self.recommendation.recommend(&RecommendationContext {
                profile,
                thought_number: resolved.thought_number,
                total_thoughts: total,
                phase: resolved.phase,
                prior: &prior,
                available_tools: &self.available_tools,
            })
        });
        if let Some(bundle) = &recommendations {
            total = total.max(bundle.complexity.recommended_thoughts);
        }
        self.total_thoughts = total;
        thought.total_thoughts_estimate = total;

        // Append
        let (index, created_branch) = self.append(thought, &report);

        let response = self.guidance(
            index,
            &input,
            &report,
            recommendations,
            resolution_strategies,
            warnings,
        );
        self.emit_events(index, &response, created_branch);
        Ok(response)
    }

    /// Canonical thought number: the submitted one when it follows the last
    /// thought, otherwise the next free number.
    fn assign_number(&self, input: &SubmitThought, warnings: &mut Vec<String>) -> ValidationResult<u32> {
        let last = self.thoughts.last().map_or(0, |t| t.thought_number);
        if input.thought_number > last {
            return Ok(input.thought_number);
        }
        let assigned = last.checked_add(1).ok_or_else(|| ValidationError::OutOfRange {
            field: "thoughtNumber".to_string(),
            reason: format!("no thought number is left after {}", last),
        })?;
        warnings.push(format!(
            "thoughtNumber {} is not after the last thought {}; assigned {}",
            input.thought_number, last, assigned
        ));
        Ok(assigned)
    }

    /// Reference checks. Drops what cannot be honored.
    fn resolve(&self, input: &SubmitThought, thought_number: u32, warnings: &mut Vec<String>) -> Resolved {

        let mut check = |field: &str, n: u32| {
            let ok = self.index.contains_key(&n);
            if !ok {
                warnings.push(format!("Dropped {} {}: no such earlier thought", field, n));
            }
            ok
        };

        let dependencies: BTreeSet<u32> = input
            .dependencies
            .iter()
            .copied()
            .filter(|&n| check("dependency", n))
            .collect();
        let revises_thought = input.revises_thought.filter(|&n| check("revisesThought", n));
        let branch_from_thought = input
            .branch_from_thought
            .filter(|&n| check("branchFromThought", n));

        let known_branch = |id: &String| self.branches.iter().any(|b| &b.id == id);
        let branch_id = match (&input.branch_id, branch_from_thought) {
            (Some(id), Some(_)) => Some(id.clone()),
            (Some(id), None) if known_branch(id) => Some(id.clone()),
            (Some(id), None) => {
                warnings.push(format!(
                    "Dropped branchId {}: a new branch needs a valid branchFromThought",
                    id
                ));
                None
            }
            (None, _) => None,
        };

        Resolved {
            thought_number,
            is_revision: input.is_revision || revises_thought.is_some(),
            revises_thought,
            branch_from_thought,
            branch_id,
            dependencies,
            phase: input.phase.unwrap_or(self.current_phase),
        }
    }

    fn insight_value(&self, thought: &Thought) -> f64 {
        let Some((_, best)) = self.similarity.most_similar(thought, &self.thoughts) else {
            return 5.0;
        };
        let bonus = match thought.classification {
            Classification::Conclusion | Classification::Solution => 1.0,
            _ => 0.0,
        };
        (10.0 * (1.0 - best) + bonus).clamp(0.0, 10.0)
    }

    /// Append a fully scored thought. Returns its index and the branch created, if any.
    fn append(&mut self, thought: Thought, report: &AlignmentReport) -> (usize, Option<Branch>) {
        let number = thought.thought_number;

        for &dependency in &thought.dependencies {
            self.adjacency.entry(dependency).or_default().insert(number);
        }
        self.adjacency.entry(number).or_default();

        let mut created = None;
        if let Some(id) = &thought.branch_id {
            match self.branches.iter_mut().find(|b| &b.id == id) {
                Some(branch) => branch.thoughts.push(number),
                None => {
                    if let Some(from) = thought.branch_from_thought {
                        let mut branch = Branch::new(id.clone(), from);
                        branch.thoughts.push(number);
                        created = Some(branch.clone());
                        self.branches.push(branch);
                    }
                }
            }
        }

        for tool in &thought.tools_used {
            self.tool_stats
                .entry(tool.clone())
                .or_default()
                .record(number, thought.phase);
        }

        for (i, relevance) in report.goal_relevance.iter().enumerate() {
            if *relevance >= GOAL_COVERED_RELEVANCE {
                self.covered_goals.insert(i);
            }
        }

        let index = self.thoughts.len();
        self.current_phase = thought.phase;
        self.index.insert(number, index);
        self.thoughts.push(thought);
        self.clusters = self.similarity.cluster(&self.thoughts);

        (index, created)
    }

    // ========================================================================
    // Guidance
    // ========================================================================

    fn guidance(
        &self,
        index: usize,
        input: &SubmitThought,
        report: &AlignmentReport,
        recommendations: Option<RecommendationBundle>,
        resolution_strategies: Vec<String>,
        warnings: Vec<String>,
    ) -> ThoughtResponse {
        let thought = &self.thoughts[index];
        let fraction = (thought.thought_number as f64 / self.total_thoughts.max(1) as f64).min(1.0);
        let progress = fraction * 100.0;

        let recent_thoughts = self
            .thoughts
            .iter()
            .rev()
            .take(RECENT_THOUGHTS)
            .rev()
            .map(RecentThought::from)
            .collect();

        let session_progress = self.profile.as_ref().map(|profile| SessionProgress {
            overall_progress: progress,
            remaining_thoughts_estimate: self.total_thoughts.saturating_sub(thought.thought_number),
            goal_coverage: self.goal_coverage(profile),
            alignment_trend: AlignmentTrend::from_scores(
                &self
                    .thoughts
                    .iter()
                    .map(|t| t.alignment_score)
                    .collect::<Vec<_>>(),
            ),
        });

        ThoughtResponse {
            thought_number: thought.thought_number,
            total_thoughts: self.total_thoughts,
            next_thought_needed: input.next_thought_needed,
            branches: self.branches.iter().map(|b| b.id.clone()).collect(),
            thought_history_length: self.thoughts.len(),
            available_tools: self.available_tools.clone(),
            current_phase: self.current_phase,
            estimated_complexity: self.profile.as_ref().map(|p| p.complexity),
            progress,
            recent_thoughts,
            suggested_next_phase: self.current_phase.suggest_next(fraction),
            thought_analysis: ThoughtAnalysis {
                classification: thought.classification,
                quality_score: thought.quality_score,
                insight_value: thought.insight_value,
                alignment_score: thought.alignment_score,
                relevance_by_aspect: thought.relevance_by_aspect.clone(),
                drift_score: report.drift.score,
                drift_warning: thought.drift_warning.clone(),
                concepts: thought.concepts_extracted.clone(),
                assumptions: thought.assumptions.clone(),
                contradictions: thought.contradictions.clone(),
                prompt_contradictions: thought.prompt_contradictions.clone(),
                resolution_strategies,
                missing_aspects: thought.missing_aspects.clone(),
                corrective_suggestions: report.corrective_suggestions.clone(),
                dependencies: thought.dependencies.clone(),
                revises_thought: thought.revises_thought,
                branch_id: thought.branch_id.clone(),
            },
            recommendations,
            tool_usage_stats: self.tool_stats.clone(),
            topic_clusters: self.clusters.clone(),
            warnings,
            session_progress,
        }
    }

    fn goal_coverage(&self, profile: &PromptProfile) -> GoalCoverage {
        let total = profile.goals.len();
        let covered = self.covered_goals.len();
        GoalCoverage {
            covered,
            total,
            percentage: if total == 0 {
                100.0
            } else {
                covered as f64 * 100.0 / total as f64
            },
            uncovered: profile
                .goals
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.covered_goals.contains(i))
                .map(|(_, g)| g.clone())
                .collect(),
        }
    }

    fn emit_events(&self, index: usize, response: &ThoughtResponse, created_branch: Option<Branch>) {
        let analysis = &response.thought_analysis;

        self.sink.emit(&SessionEvent::ThoughtAppended {
            thought_number: response.thought_number,
            phase: response.current_phase,
            classification: analysis.classification,
            alignment_score: analysis.alignment_score,
            quality_score: analysis.quality_score,
            is_revision: self.thoughts[index].is_revision,
            warnings: response.warnings.clone(),
        });

        if let Some(branch) = created_branch {
            self.sink.emit(&SessionEvent::BranchCreated {
                branch_id: branch.id,
                from_thought: branch.from_thought,
            });
        }

        if !analysis.contradictions.is_empty() || !analysis.prompt_contradictions.is_empty() {
            self.sink.emit(&SessionEvent::ContradictionsDetected {
                thought_number: response.thought_number,
                with_thoughts: analysis.contradictions.iter().map(|c| c.thought_number).collect(),
                with_prompt: analysis.prompt_contradictions.len(),
            });
        }

        if let Some(reason) = &analysis.drift_warning {
            self.sink.emit(&SessionEvent::DriftDetected {
                thought_number: response.thought_number,
                score: analysis.drift_score,
                reason: reason.clone(),
            });
        }
    }

    /// Recompute stored thought vectors after the vectorizer's backend changed.
    ///
    /// Scores already reported are left as they were. Returns the number of
    /// thoughts updated.
    pub fn revectorize(&mut self) -> usize {
        for thought in &mut self.thoughts {
            thought.vector = self.vectorizer.vectorize(&thought.text);
        }
        self.thoughts.len()
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    /// Session identifier
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// All thoughts in append order
    pub fn thoughts(&self) -> &[Thought] {
        &self.thoughts
    }

    /// One thought by number
    pub fn thought(&self, thought_number: u32) -> Option<&Thought> {
        self.index
            .get(&thought_number)
            .and_then(|&i| self.thoughts.get(i))
    }

    /// Branches in creation order
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// One branch by id
    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// Prompt profile, once initialized
    pub fn profile(&self) -> Option<&PromptProfile> {
        self.profile.as_ref()
    }

    /// Thoughts that depend on `thought_number`, ascending
    pub fn dependents_of(&self, thought_number: u32) -> Vec<u32> {
        self.adjacency
            .get(&thought_number)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Dependency to dependents view
    pub fn adjacency(&self) -> &BTreeMap<u32, BTreeSet<u32>> {
        &self.adjacency
    }

    /// Accumulated tool usage
    pub fn tool_stats(&self) -> &ToolUsageStats {
        &self.tool_stats
    }

    /// Current session length estimate. Never decreases.
    pub fn total_thoughts(&self) -> u32 {
        self.total_thoughts
    }

    /// Phase of the latest thought, Planning before any
    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// Topic clusters over all thoughts
    pub fn clusters(&self) -> &[TopicCluster] {
        &self.clusters
    }

    /// Serializable view of the whole graph
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot {
            session_id: self.session_id.to_string(),
            profile: self.profile.as_ref(),
            thoughts: &self.thoughts,
            branches: &self.branches,
            adjacency: &self.adjacency,
            topic_clusters: &self.clusters,
            tool_usage_stats: &self.tool_stats,
            total_thoughts: self.total_thoughts,
            current_phase: self.current_phase,
        }
    }
}

/// Heuristic quality of a thought (0-10).
fn quality_score(thought: &Thought) -> f64 {
    let length = (words(&thought.text).len() as f64 / 25.0).min(1.0) * 2.0;
    let concepts = (thought.concepts_extracted.len() as f64 / CONCEPT_LIMIT as f64).min(1.0) * 2.0;
    let dependencies = if thought.dependencies.is_empty() { 0.0 } else { 1.0 };
    let alignment = (thought.alignment_score - 5.0) / 5.0;
    let conflicts = thought.contradictions.len() + thought.prompt_contradictions.len();
    let penalty = (1.5 * conflicts as f64).min(3.0);

    (3.0 + length + concepts + dependencies + alignment - penalty).clamp(0.0, 10.0)
}
