//! Prompt alignment, drift and missing-aspect detection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::profile::PromptProfile;
use crate::text::{best_sentence_relevance, contains_phrase, stem, tokenize, words};

/// Neutral alignment score used when nothing can be compared.
pub const NEUTRAL_ALIGNMENT: f64 = 5.0;

/// Relevance reported for an aspect with no items.
pub const NEUTRAL_RELEVANCE: f64 = 0.5;

/// Relevance above which an aspect counts as present even without a literal match.
const PRESENCE_RELEVANCE: f64 = 0.65;

/// Keywords considered for keyword relevance and importance.
const TOP_KEYWORDS: usize = 10;

/// Goals that are always important.
const TOP_GOALS: usize = 3;

const MAX_MISSING_SUGGESTIONS: usize = 3;

/// Aspect names used in `relevance_by_aspect`.
pub const ASPECT_GOALS: &str = "goals";
/// Aspect name for constraints.
pub const ASPECT_CONSTRAINTS: &str = "constraints";
/// Aspect name for domains.
pub const ASPECT_DOMAINS: &str = "domains";

/// Why a thought was judged to drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftReason {
    /// Goals are barely addressed
    Goal,
    /// Top keywords are missing
    Keyword,
    /// Little keyword overlap with the prompt
    Overlap,
    /// Outside the prompt's domains
    Domain,
    /// No single dominant cause
    Generic,
}

impl DriftReason {
    /// Human-readable warning for this reason.
    pub fn message(&self) -> &'static str {
        match self {
            DriftReason::Goal => "Thought has drifted away from the stated goals",
            DriftReason::Keyword => "Thought has low relevance to the key concepts of the prompt",
            DriftReason::Overlap => "Thought shares few keywords with the prompt",
            DriftReason::Domain => "Thought has moved outside the prompt's domain",
            DriftReason::Generic => "Thought is diverging from the original prompt",
        }
    }

    fn refocus(&self) -> &'static str {
        match self {
            DriftReason::Goal => "Refocus on the primary goal before continuing",
            DriftReason::Keyword => "Bring the key concepts of the prompt back into the reasoning",
            DriftReason::Overlap => "Use the prompt's own terms to anchor the next thought",
            DriftReason::Domain => "Return to the domain the prompt is about",
            DriftReason::Generic => "Re-read the original prompt and realign the approach",
        }
    }
}

/// Drift components and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftAssessment {
    /// Drift score, 0-1
    pub score: f64,
    /// Whether the score is above the drift threshold
    pub flagged: bool,
    /// Dominant cause of the drift
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DriftReason>,
    /// Mean goal relevance, 0-1
    pub goal_relevance: f64,
    /// Mean relevance of the top profile keywords, 0-1
    pub keyword_relevance: f64,
    /// Mean domain relevance, 0-1
    pub domain_relevance: f64,
    /// Share of profile keywords present in the thought
    pub overlap_ratio: f64,
}

impl DriftAssessment {
    /// Warning text when flagged.
    pub fn warning(&self) -> Option<String> {
        self.reason
            .filter(|_| self.flagged)
            .map(|r| r.message().to_string())
    }
}

/// Full alignment result for one thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    /// Alignment with the profile, 0-10
    pub alignment_score: f64,
    /// Relevance per goal, keyword and domain aspect
    pub relevance_by_aspect: BTreeMap<String, f64>,
    /// Drift verdict
    pub drift: DriftAssessment,
    /// Important aspects the thought does not touch
    pub missing_aspects: Vec<String>,
    /// Suggestions to steer back on topic
    pub corrective_suggestions: Vec<String>,
    /// Relevance of each goal, in profile order.
    pub goal_relevance: Vec<f64>,
    /// Number of profile keywords present
    pub keyword_overlap: usize,
}

impl AlignmentReport {
    /// Report used when there is no profile to align against.
    pub fn neutral() -> Self {
        let relevance_by_aspect = [ASPECT_GOALS, ASPECT_CONSTRAINTS, ASPECT_DOMAINS]
            .into_iter()
            .map(|a| (a.to_string(), NEUTRAL_RELEVANCE))
            .collect();

        Self {
            alignment_score: NEUTRAL_ALIGNMENT,
            relevance_by_aspect,
            drift: DriftAssessment {
                score: drift_score(
                    NEUTRAL_RELEVANCE,
                    NEUTRAL_RELEVANCE,
                    NEUTRAL_RELEVANCE,
                    NEUTRAL_RELEVANCE,
                ),
                flagged: false,
                reason: None,
                goal_relevance: NEUTRAL_RELEVANCE,
                keyword_relevance: NEUTRAL_RELEVANCE,
                domain_relevance: NEUTRAL_RELEVANCE,
                overlap_ratio: NEUTRAL_RELEVANCE,
            },
            missing_aspects: Vec::new(),
            corrective_suggestions: Vec::new(),
            goal_relevance: Vec::new(),
            keyword_overlap: 0,
        }
    }
}

/// Token and stem views of a thought, computed once per analysis.
struct ThoughtText<'a> {
    raw: &'a str,
    words: Vec<String>,
    stems: BTreeSet<String>,
}

impl<'a> ThoughtText<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            words: words(raw),
            stems: tokenize(raw).iter().map(|t| stem(t)).collect(),
        }
    }

    /// Fraction of the item's distinct token stems found in the thought.
    fn coverage(&self, item: &str) -> f64 {
        let item_stems: BTreeSet<String> = tokenize(item).iter().map(|t| stem(t)).collect();
        if item_stems.is_empty() {
            return 0.0;
        }
        item_stems.intersection(&self.stems).count() as f64 / item_stems.len() as f64
    }

    fn matches_keyword(&self, keyword: &str) -> bool {
        self.coverage(keyword) >= 1.0
    }

    fn item_relevance(&self, item: &str) -> f64 {
        (0.6 * self.coverage(item) + 0.4 * best_sentence_relevance(item, self.raw)).clamp(0.0, 1.0)
    }

    fn contains(&self, item: &str) -> bool {
        contains_phrase(&self.words, &words(item))
    }
}

/// Scores thoughts against the session's prompt profile.
#[derive(Debug, Clone)]
pub struct AlignmentEngine {
    drift_threshold: f64,
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self::new(0.55)
    }
}

impl AlignmentEngine {
    /// Create an engine that flags drift strictly above `drift_threshold`.
    pub fn new(drift_threshold: f64) -> Self {
        Self { drift_threshold }
    }

    /// Drift threshold in use
    pub fn drift_threshold(&self) -> f64 {
        self.drift_threshold
    }

    /// Analyze a thought against an optional profile.
    pub fn analyze_optional(&self, text: &str, profile: Option<&PromptProfile>) -> AlignmentReport {
        match profile {
            Some(p) => self.analyze(text, p),
            None => AlignmentReport::neutral(),
        }
    }

    /// Analyze a thought against a profile. Never fails.
    pub fn analyze(&self, text: &str, profile: &PromptProfile) -> AlignmentReport {
        let thought = ThoughtText::new(text);

        let keyword_overlap = profile
            .keywords
            .iter()
            .filter(|k| thought.matches_keyword(k))
            .count();
        let keyword_score = if profile.keywords.is_empty() {
            NEUTRAL_ALIGNMENT
        } else {
            (2.0 * keyword_overlap as f64).min(10.0)
        };

        let goal_score = if profile.goals.is_empty() {
            NEUTRAL_ALIGNMENT
        } else {
            10.0 * profile
                .goals
                .iter()
                .map(|g| thought.coverage(g))
                .fold(0.0, f64::max)
        };

        let alignment_score =
            ((keyword_score + goal_score + NEUTRAL_ALIGNMENT) / 3.0).clamp(0.0, 10.0);

        let goal_relevance: Vec<f64> = profile
            .goals
            .iter()
            .map(|g| thought.item_relevance(g))
            .collect();
        let constraint_relevance: Vec<f64> = profile
            .constraints
            .iter()
            .map(|c| thought.item_relevance(c))
            .collect();
        let domain_relevance: Vec<f64> = profile
            .domains
            .iter()
            .map(|d| domain_relevance(&thought, d))
            .collect();

        let mut relevance_by_aspect = BTreeMap::new();
        relevance_by_aspect.insert(ASPECT_GOALS.to_string(), mean_or_neutral(&goal_relevance));
        relevance_by_aspect.insert(
            ASPECT_CONSTRAINTS.to_string(),
            mean_or_neutral(&constraint_relevance),
        );
        relevance_by_aspect.insert(ASPECT_DOMAINS.to_string(), mean_or_neutral(&domain_relevance));

        let drift = self.assess_drift(&thought, profile, &relevance_by_aspect, keyword_overlap);
        let missing_aspects = missing_aspects(&thought, profile);
        let corrective_suggestions =
            corrective_suggestions(&drift, &missing_aspects, profile, &constraint_relevance);

        AlignmentReport {
            alignment_score,
            relevance_by_aspect,
            drift,
            missing_aspects,
            corrective_suggestions,
            goal_relevance,
            keyword_overlap,
        }
    }

    fn assess_drift(
        &self,
        thought: &ThoughtText<'_>,
        profile: &PromptProfile,
        relevance_by_aspect: &BTreeMap<String, f64>,
        keyword_overlap: usize,
    ) -> DriftAssessment {
        let aspect = |name: &str| {
            relevance_by_aspect
                .get(name)
                .copied()
                .unwrap_or(NEUTRAL_RELEVANCE)
        };
        let goal = aspect(ASPECT_GOALS);
        let domain = aspect(ASPECT_DOMAINS);

        let top: Vec<f64> = profile
            .keywords
            .iter()
            .take(TOP_KEYWORDS)
            .map(|k| thought.item_relevance(k))
            .collect();
        let keyword = mean_or_neutral(&top);

        let overlap = if profile.keywords.is_empty() {
            NEUTRAL_RELEVANCE
        } else {
            keyword_overlap as f64 / profile.keywords.len() as f64
        };

        let score = drift_score(goal, keyword, domain, overlap);
        let flagged = score > self.drift_threshold;
        let reason = flagged.then(|| {
            if goal < 0.4 {
                DriftReason::Goal
            } else if keyword < 0.3 {
                DriftReason::Keyword
            } else if overlap < 0.3 {
                DriftReason::Overlap
            } else if domain < 0.3 {
                DriftReason::Domain
            } else {
                DriftReason::Generic
            }
        });

        DriftAssessment {
            score,
            flagged,
            reason,
            goal_relevance: goal,
            keyword_relevance: keyword,
            domain_relevance: domain,
            overlap_ratio: overlap,
        }
    }
}

fn drift_score(goal: f64, keyword: f64, domain: f64, overlap: f64) -> f64 {
    (1.0 - (0.4 * goal + 0.3 * keyword + 0.1 * domain + 0.2 * overlap)).clamp(0.0, 1.0)
}

fn mean_or_neutral(values: &[f64]) -> f64 {
    if values.is_empty() {
        NEUTRAL_RELEVANCE
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Relevance of a thought to one domain of the profile.
fn domain_relevance(thought: &ThoughtText<'_>, domain: &str) -> f64 {
    let keywords = PromptProfile::domain_keywords(domain);
    if keywords.is_empty() {
        return 0.0;
    }
    let matched: BTreeSet<&str> = thought
        .words
        .iter()
        .map(String::as_str)
        .filter(|w| keywords.contains(w))
        .collect();
    let coverage = (matched.len() as f64 / keywords.len().min(3) as f64).min(1.0);

    (0.6 * coverage + 0.4 * best_sentence_relevance(domain, thought.raw)).clamp(0.0, 1.0)
}

fn shares_entity(item: &str, entity_words: &BTreeSet<String>) -> bool {
    words(item).iter().any(|w| entity_words.contains(w))
}

/// Important aspects of the prompt that the thought neither mentions nor relates to.
fn missing_aspects(thought: &ThoughtText<'_>, profile: &PromptProfile) -> Vec<String> {
    let entity_words: BTreeSet<String> = profile.entities.iter().flat_map(|e| words(e)).collect();
    let absent =
        |item: &str| !thought.contains(item) && thought.item_relevance(item) <= PRESENCE_RELEVANCE;

    let mut missing = Vec::new();

    for (i, keyword) in profile.keywords.iter().enumerate() {
        let important = i < TOP_KEYWORDS || shares_entity(keyword, &entity_words);
        if important && absent(keyword) {
            missing.push(format!("keyword: {}", keyword));
        }
    }
    for (i, goal) in profile.goals.iter().enumerate() {
        let important = i < TOP_GOALS || shares_entity(goal, &entity_words);
        if important && absent(goal) {
            missing.push(format!("goal: {}", goal));
        }
    }
    for constraint in &profile.constraints {
        if shares_entity(constraint, &entity_words) && absent(constraint) {
            missing.push(format!("constraint: {}", constraint));
        }
    }

    missing
}

fn corrective_suggestions(
    drift: &DriftAssessment,
    missing: &[String],
    profile: &PromptProfile,
    constraint_relevance: &[f64],
) -> Vec<String> {
    let mut suggestions = Vec::new();

    if let Some(reason) = drift.reason.filter(|_| drift.flagged) {
        suggestions.push(reason.refocus().to_string());
    }

    for aspect in missing.iter().take(MAX_MISSING_SUGGESTIONS) {
        suggestions.push(format!("Address missing aspect: {}", aspect));
    }

    let weakest = profile
        .constraints
        .iter()
        .zip(constraint_relevance)
        .min_by(|a, b| a.1.total_cmp(b.1));
    if let Some((constraint, _)) = weakest.filter(|_| mean_or_neutral(constraint_relevance) < 0.3) {
        suggestions.push(format!("Check the approach against the constraint: {}", constraint));
    }

    suggestions
}
