//! Contradiction detection between thoughts and against the prompt.
//!
//! Pairwise checks only run against earlier thoughts that are similar enough
//! to be about the same thing. Revisions never take part, neither as the
//! subject nor as the target.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::SimilarityEngine;
use crate::graph::{Classification, Phase, Thought};
use crate::profile::PromptProfile;
use crate::text::{is_negation, is_stopword, sentences, stem, words};

/// Classification pairs that contradict each other, in either order.
pub const OPPOSING_CLASSIFICATIONS: &[(Classification, Classification)] = &[
    (Classification::Hypothesis, Classification::Conclusion),
    (Classification::Question, Classification::Solution),
    (Classification::Observation, Classification::Conclusion),
];

/// Antonym pairs checked against prompt clauses.
pub const ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("increase", "decrease"),
    ("more", "less"),
    ("add", "remove"),
    ("enable", "disable"),
    ("include", "exclude"),
    ("allow", "deny"),
    ("maximize", "minimize"),
    ("accept", "reject"),
    ("open", "close"),
    ("start", "stop"),
    ("fast", "slow"),
    ("simple", "complex"),
    ("always", "never"),
    ("true", "false"),
    ("higher", "lower"),
    ("before", "after"),
    ("success", "failure"),
];

const ASSUMPTION_MARKERS: &[&str] = &[
    "taking for granted",
    "given that",
    "assuming",
    "assumes",
    "assume",
    "presumably",
    "supposing",
    "suppose",
    "presuming",
];

const CLAUSE_SEPARATORS: &[&str] = &["and", "but", "or"];

/// Lead-in words of goal and constraint phrasing, not part of what a clause asks for.
const INTENT_WORDS: &[&str] = &[
    "need", "needs", "want", "wants", "goal", "trying", "objective", "looking", "help",
    "would", "like", "order", "purpose", "required", "always", "avoid", "within", "limited",
    "least",
];

/// Words of lookbehind for a negation to apply to a term.
const NEGATION_WINDOW: usize = 3;

/// Kind of contradiction signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    /// Classifications form an opposing pair
    OpposingClassification,
    /// Two conclusions, exactly one negated
    ConflictingConclusions,
    /// One assumption is the negation of another
    ConflictingAssumptions,
    /// A goal or constraint clause restated with a negation
    PromptNegation,
    /// Opposite direction to a goal or constraint
    PromptAntonym,
}

/// A conflict between the current thought and an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    /// The earlier thought
    pub thought_number: u32,
    /// Human-readable reason
    pub explanation: String,
    /// Signal that fired
    pub kind: ContradictionKind,
}

/// Which part of the prompt a thought conflicts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// A goal phrase
    Goal,
    /// A constraint phrase
    Constraint,
}

/// A conflict between the current thought and a goal or constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContradiction {
    /// Goal or constraint
    pub source: PromptSource,
    /// Full goal or constraint phrase
    pub phrase: String,
    /// Clause of the phrase that conflicts
    pub clause: String,
    /// Human-readable reason
    pub explanation: String,
    /// Signal that fired
    pub kind: ContradictionKind,
}

/// Contradiction detector.
#[derive(Debug, Clone)]
pub struct ContradictionEngine {
    similarity_threshold: f64,
}

impl Default for ContradictionEngine {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ContradictionEngine {
    /// Create a detector that only compares pairs above `similarity_threshold`.
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Contradictions between `thought` and the earlier thoughts in `prior`.
    pub fn detect(
        &self,
        thought: &Thought,
        prior: &[Thought],
        similarity: &SimilarityEngine,
    ) -> Vec<Contradiction> {
        if thought.is_revision {
            return Vec::new();
        }

        prior
            .iter()
            .filter(|other| !other.is_revision && other.thought_number != thought.thought_number)
            .filter(|other| similarity.similarity(thought, other) > self.similarity_threshold)
            .filter_map(|other| {
                pair_conflict(thought, other).map(|(kind, explanation)| Contradiction {
                    thought_number: other.thought_number,
                    explanation,
                    kind,
                })
            })
            .collect()
    }

    /// Contradictions between `thought` and the prompt's goals and constraints.
    pub fn detect_prompt(&self, thought: &Thought, profile: &PromptProfile) -> Vec<PromptContradiction> {
        if thought.is_revision {
            return Vec::new();
        }

        let thought_words = words(&thought.text);
        let sources = profile
            .goals
            .iter()
            .map(|g| (PromptSource::Goal, g))
            .chain(profile.constraints.iter().map(|c| (PromptSource::Constraint, c)));

        let mut found = Vec::new();
        for (source, phrase) in sources {
            for clause in split_clauses(phrase) {
                if let Some((kind, explanation)) = clause_conflict(&clause, &thought_words, source) {
                    found.push(PromptContradiction {
                        source,
                        phrase: phrase.clone(),
                        clause: clause.join(" "),
                        explanation,
                        kind,
                    });
                }
            }
        }
        found
    }

    /// Suggested ways to resolve the given contradiction kinds in `phase`.
    pub fn resolution_strategies(
        &self,
        kinds: impl IntoIterator<Item = ContradictionKind>,
        phase: Phase,
    ) -> Vec<String> {
        let mut strategies: Vec<String> = Vec::new();
        for kind in kinds {
            let base = base_strategy(kind).to_string();
            if !strategies.contains(&base) {
                strategies.push(base);
            }
        }
        if !strategies.is_empty() {
            strategies.push(phase_strategy(phase).to_string());
        }
        strategies
    }
}

fn is_opposing(a: Classification, b: Classification) -> bool {
    OPPOSING_CLASSIFICATIONS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

fn has_negation(text: &str) -> bool {
    words(text).iter().any(|w| is_negation(w))
}

fn pair_conflict(a: &Thought, b: &Thought) -> Option<(ContradictionKind, String)> {
    if is_opposing(a.classification, b.classification) {
        return Some((
            ContradictionKind::OpposingClassification,
            format!(
                "Opposing classifications: {} vs {}",
                b.classification, a.classification
            ),
        ));
    }

    if a.classification == Classification::Conclusion
        && b.classification == Classification::Conclusion
        && has_negation(&a.text) != has_negation(&b.text)
    {
        return Some((
            ContradictionKind::ConflictingConclusions,
            "Conflicting conclusions detected".to_string(),
        ));
    }

    conflicting_assumptions(&a.assumptions, &b.assumptions).map(|(x, y)| {
        (
            ContradictionKind::ConflictingAssumptions,
            format!("Conflicting assumptions: '{}' vs '{}'", x, y),
        )
    })
}

/// First pair where one assumption is the literal `"not "` negation of the other.
pub fn conflicting_assumptions(a: &[String], b: &[String]) -> Option<(String, String)> {
    let negates = |x: &str, y: &str| {
        let x = x.trim().to_lowercase();
        let y = y.trim().to_lowercase();
        x.strip_prefix("not ").is_some_and(|rest| rest.trim() == y)
    };

    for x in a {
        for y in b {
            if negates(x, y) || negates(y, x) {
                return Some((x.clone(), y.clone()));
            }
        }
    }
    None
}

/// Assumptions stated in a text: what follows an assumption marker.
pub fn extract_assumptions(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for sentence in sentences(text) {
        let lower = sentence.to_lowercase();
        let Some((start, marker)) = ASSUMPTION_MARKERS
            .iter()
            .filter_map(|m| find_word(&lower, m).map(|i| (i, *m)))
            .min_by_key(|(i, _)| *i)
        else {
            continue;
        };

        let rest = lower[start + marker.len()..]
            .trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let rest = rest.strip_prefix("that ").unwrap_or(rest).trim();
        if !rest.is_empty() && !out.iter().any(|a| a == rest) {
            out.push(rest.to_string());
        }
    }

    out
}

/// Byte index of `needle` in `haystack` at word boundaries.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = end;
    }
    None
}

/// Split a goal or constraint into word clauses on punctuation and conjunctions.
fn split_clauses(phrase: &str) -> Vec<Vec<String>> {
    let mut clauses = Vec::new();
    for part in phrase.split([',', ';']) {
        let mut current = Vec::new();
        for word in words(part) {
            if CLAUSE_SEPARATORS.contains(&word.as_str()) {
                if !current.is_empty() {
                    clauses.push(std::mem::take(&mut current));
                }
            } else {
                current.push(word);
            }
        }
        if !current.is_empty() {
            clauses.push(current);
        }
    }
    clauses
}

fn is_content_word(word: &str) -> bool {
    word.chars().count() > 3 && !is_stopword(word) && !is_negation(word)
}

fn negated_at(sequence: &[String], position: usize) -> bool {
    sequence[position.saturating_sub(NEGATION_WINDOW)..position]
        .iter()
        .any(|w| is_negation(w))
}

/// Position in `thought_words` where the clause's requested terms start, when
/// the thought holds them as one run of significant words in clause order.
///
/// Clauses that are themselves negated never match.
fn clause_run_start(clause: &[String], thought_words: &[String]) -> Option<usize> {
    let terms: Vec<(usize, String)> = clause
        .iter()
        .enumerate()
        .filter(|(_, w)| is_content_word(w) && !INTENT_WORDS.contains(&w.as_str()))
        .map(|(i, w)| (i, stem(w)))
        .collect();
    let &(first, _) = terms.first()?;
    if negated_at(clause, first) {
        return None;
    }

    let significant: Vec<(usize, String)> = thought_words
        .iter()
        .enumerate()
        .filter(|(_, w)| is_content_word(w))
        .map(|(i, w)| (i, stem(w)))
        .collect();
    significant
        .windows(terms.len())
        .find(|window| window.iter().zip(&terms).all(|((_, a), (_, b))| a == b))
        .map(|window| window[0].0)
}

fn source_label(source: PromptSource) -> &'static str {
    match source {
        PromptSource::Goal => "goal",
        PromptSource::Constraint => "constraint",
    }
}

fn clause_conflict(
    clause: &[String],
    thought_words: &[String],
    source: PromptSource,
) -> Option<(ContradictionKind, String)> {
    // The thought restates the clause with a negation just before it.
    if let Some(start) = clause_run_start(clause, thought_words) {
        if negated_at(thought_words, start) {
            return Some((
                ContradictionKind::PromptNegation,
                format!(
                    "Thought negates '{}' from the {}",
                    clause.join(" "),
                    source_label(source)
                ),
            ));
        }
    }

    // Opposite direction on a shared subject.
    let clause_subjects: BTreeSet<String> = clause
        .iter()
        .filter(|w| is_content_word(w))
        .map(|w| stem(w))
        .collect();
    let thought_subjects: BTreeSet<String> = thought_words
        .iter()
        .filter(|w| is_content_word(w))
        .map(|w| stem(w))
        .collect();

    for &(x, y) in ANTONYM_PAIRS {
        for (said, opposite) in [(x, y), (y, x)] {
            if !clause.iter().any(|w| w == said) || !thought_words.iter().any(|w| w == opposite) {
                continue;
            }
            let excluded = [stem(said), stem(opposite)];
            let shared = clause_subjects
                .intersection(&thought_subjects)
                .any(|s| !excluded.contains(s));
            if shared {
                return Some((
                    ContradictionKind::PromptAntonym,
                    format!(
                        "Thought says '{}' where the {} says '{}'",
                        opposite,
                        source_label(source),
                        said
                    ),
                ));
            }
        }
    }

    None
}

fn base_strategy(kind: ContradictionKind) -> &'static str {
    match kind {
        ContradictionKind::OpposingClassification => {
            "Decide whether the newer thought confirms or overturns the earlier one, and submit a revision if it overturns it"
        }
        ContradictionKind::ConflictingConclusions => {
            "Compare the evidence behind both conclusions and keep the better-supported one"
        }
        ContradictionKind::ConflictingAssumptions => {
            "State the disputed assumption explicitly and test which version holds"
        }
        ContradictionKind::PromptNegation => {
            "Re-read the original request and confirm the negated requirement is really out of scope"
        }
        ContradictionKind::PromptAntonym => {
            "Check the direction of the proposed change against the original request"
        }
    }
}

fn phase_strategy(phase: Phase) -> &'static str {
    match phase {
        Phase::Planning => "Adjust the plan so the conflicting points are addressed explicitly",
        Phase::Analysis => "Gather more evidence before choosing between the conflicting positions",
        Phase::Execution => "Pause execution and resolve the conflict before building on it",
        Phase::Verification => {
            "Verify both positions against the original requirements and drop the weaker one"
        }
    }
}
