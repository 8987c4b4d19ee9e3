//! Prompt profiling.
//!
//! Derives a [`PromptProfile`] once from the text that opens a session:
//! goals, constraints, domains, keywords, entities, task type, complexity,
//! priority and the expected output format. The profile is immutable for
//! the rest of the session.

use serde::{Deserialize, Serialize};

use crate::text::{contains_phrase, extract_keywords, sentences, words};

/// Number of keywords kept on a profile.
pub const PROFILE_KEYWORD_LIMIT: usize = 15;

const GOAL_INDICATORS: &[&str] = &[
    "goal is",
    "need to",
    "needs to",
    "want to",
    "trying to",
    "aim to",
    "objective",
    "looking for",
    "help me",
    "would like",
    "in order to",
    "so that",
    "purpose",
];

const CONSTRAINT_INDICATORS: &[&str] = &[
    "must",
    "cannot",
    "can't",
    "should not",
    "shouldn't",
    "must not",
    "only",
    "without",
    "limited to",
    "at most",
    "at least",
    "no more than",
    "required",
    "never",
    "always",
    "within",
    "avoid",
];

/// Domain name to keyword table, in reporting order.
pub const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "programming",
        &[
            "code", "python", "javascript", "typescript", "rust", "java", "function", "script",
            "algorithm", "api", "bug", "debug", "software", "program", "programming", "compile",
            "compiler", "class", "variable", "parser", "library", "refactor",
        ],
    ),
    (
        "math",
        &[
            "equation", "proof", "theorem", "calculate", "integral", "derivative", "algebra",
            "geometry", "probability", "matrix", "formula", "prime", "arithmetic",
        ],
    ),
    (
        "science",
        &[
            "experiment", "hypothesis", "physics", "chemistry", "biology", "molecule", "energy",
            "research", "scientific", "theory", "climate",
        ],
    ),
    (
        "business",
        &[
            "market", "revenue", "profit", "customer", "customers", "sales", "business", "cost",
            "budget", "stakeholder", "stakeholders", "growth", "pricing", "startup",
        ],
    ),
    (
        "writing",
        &[
            "essay", "story", "article", "write", "writing", "blog", "narrative", "draft", "poem",
            "novel", "paragraph", "chapter",
        ],
    ),
    (
        "design",
        &[
            "design", "layout", "interface", "ui", "ux", "color", "typography", "prototype",
            "wireframe", "visual", "mockup",
        ],
    ),
    (
        "data",
        &[
            "data", "dataset", "csv", "statistics", "visualization", "chart", "metrics", "sql",
            "query", "database", "analytics", "json",
        ],
    ),
];

const CREATIVE_INDICATORS: &[&str] = &[
    "create", "design", "imagine", "story", "creative", "invent", "brainstorm", "novel", "art",
    "compose", "poem",
];
const ANALYTICAL_INDICATORS: &[&str] = &[
    "analyze", "analyse", "compare", "evaluate", "assess", "why", "reason", "examine",
    "investigate", "critique", "pros", "cons", "tradeoffs",
];
const INFORMATIONAL_INDICATORS: &[&str] = &[
    "what", "explain", "describe", "define", "who", "when", "list", "summarize", "tell",
    "overview",
];
const TECHNICAL_INDICATORS: &[&str] = &[
    "code", "implement", "script", "program", "debug", "build", "deploy", "configure", "python",
    "function", "algorithm", "parse", "parses", "api", "install", "compile",
];

const COMPLEX_WORDS: &[&str] = &[
    "complex",
    "complicated",
    "sophisticated",
    "intricate",
    "comprehensive",
    "advanced",
];
const SIMPLE_WORDS: &[&str] = &["simple", "basic", "quick", "easy", "straightforward", "trivial"];
const MEDIUM_WORDS: &[&str] = &["moderate", "intermediate"];

const LOW_PRIORITY: &[&str] = &["no rush", "low priority", "whenever", "eventually", "someday"];
const HIGH_PRIORITY: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "critical",
    "important",
    "deadline",
    "priority",
];

const OUTPUT_FORMATS: &[(OutputFormat, &[&str])] = &[
    (
        OutputFormat::Code,
        &["code", "script", "function", "program", "implementation", "snippet"],
    ),
    (OutputFormat::Table, &["table", "tabular", "spreadsheet"]),
    (OutputFormat::Structured, &["json", "yaml", "schema", "structured"]),
    (OutputFormat::List, &["list", "steps", "bullet", "checklist"]),
    (
        OutputFormat::Prose,
        &["essay", "report", "article", "story", "explanation", "summary"],
    ),
];

/// Coarse category of the requested task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Writing and ideation
    Creative,
    /// Comparison and evaluation
    Analytical,
    /// Explanations and facts
    Informational,
    /// Code and systems work
    Technical,
    /// No single category dominates.
    Mixed,
}

impl TaskType {
    /// Get the task type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Creative => "creative",
            TaskType::Analytical => "analytical",
            TaskType::Informational => "informational",
            TaskType::Technical => "technical",
            TaskType::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated difficulty of the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Few steps
    Simple,
    /// Several steps
    Medium,
    /// Many interacting parts
    Complex,
}

impl Complexity {
    /// Get the complexity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Urgency signalled by the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// No urgency
    Low,
    /// Default
    Medium,
    /// Urgent
    High,
}

/// Shape of the answer the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Source code
    Code,
    /// A list
    List,
    /// A table
    Table,
    /// JSON or another structured format
    Structured,
    /// Running text
    Prose,
    /// No format requested
    Unspecified,
}

/// Structured summary of the session's initiating prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptProfile {
    /// Goal phrases
    pub goals: Vec<String>,
    /// Constraint phrases
    pub constraints: Vec<String>,
    /// Matched domains
    pub domains: Vec<String>,
    /// Top keywords
    pub keywords: Vec<String>,
    /// Acronyms and capitalized words past the sentence start
    pub entities: Vec<String>,
    /// Task category
    pub task_type: TaskType,
    /// Estimated complexity
    pub complexity: Complexity,
    /// Urgency
    pub priority: Priority,
    /// Output format the prompt asks for
    pub expected_output_format: OutputFormat,
}

impl PromptProfile {
    /// Keywords of a domain in [`DOMAIN_KEYWORDS`], empty for unknown names.
    pub fn domain_keywords(domain: &str) -> &'static [&'static str] {
        DOMAIN_KEYWORDS
            .iter()
            .find(|(name, _)| *name == domain)
            .map(|(_, kws)| *kws)
            .unwrap_or(&[])
    }
}

/// Builds [`PromptProfile`]s. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptProfiler;

impl PromptProfiler {
    /// Create a profiler
    pub fn new() -> Self {
        Self
    }

    /// Profile a prompt. Deterministic; never fails.
    pub fn profile(&self, prompt: &str) -> PromptProfile {
        let sentence_list = sentences(prompt);
        let all_words = words(prompt);

        PromptProfile {
            goals: extract_goals(&sentence_list),
            constraints: extract_constraints(&sentence_list),
            domains: detect_domains(&all_words),
            keywords: extract_keywords(prompt, PROFILE_KEYWORD_LIMIT),
            entities: extract_entities(prompt),
            task_type: classify_task(&all_words),
            complexity: estimate_complexity(&all_words),
            priority: detect_priority(&all_words),
            expected_output_format: detect_output_format(&all_words),
        }
    }
}

fn has_indicator(sentence_words: &[String], indicators: &[&str]) -> bool {
    indicators
        .iter()
        .any(|indicator| contains_phrase(sentence_words, &words(indicator)))
}

fn extract_goals(sentence_list: &[String]) -> Vec<String> {
    let goals: Vec<String> = sentence_list
        .iter()
        .filter(|s| has_indicator(&words(s), GOAL_INDICATORS))
        .cloned()
        .collect();

    if goals.is_empty() {
        sentence_list.first().cloned().into_iter().collect()
    } else {
        goals
    }
}

fn extract_constraints(sentence_list: &[String]) -> Vec<String> {
    sentence_list
        .iter()
        .filter(|s| has_indicator(&words(s), CONSTRAINT_INDICATORS))
        .cloned()
        .collect()
}

fn detect_domains(all_words: &[String]) -> Vec<String> {
    DOMAIN_KEYWORDS
        .iter()
        .filter(|(_, keywords)| all_words.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Capitalised words not opening a sentence, acronyms, and quoted strings.
fn extract_entities(prompt: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !entities.contains(&candidate) {
            entities.push(candidate);
        }
    };

    for sentence in sentences(prompt) {
        for (i, raw) in sentence.split_whitespace().enumerate() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let len = word.chars().count();
            if len < 2 {
                continue;
            }
            let is_acronym = word.chars().all(|c| c.is_uppercase() || c.is_ascii_digit())
                && word.chars().any(char::is_alphabetic);
            let is_capitalised = word.chars().next().is_some_and(char::is_uppercase);
            if is_acronym || (i > 0 && is_capitalised) {
                push(word.to_string());
            }
        }
    }

    for (i, quoted) in prompt.split('"').enumerate() {
        let quoted = quoted.trim();
        if i % 2 == 1 && !quoted.is_empty() {
            push(quoted.to_string());
        }
    }

    entities
}

fn count_indicators(all_words: &[String], indicators: &[&str]) -> usize {
    all_words
        .iter()
        .filter(|w| indicators.contains(&w.as_str()))
        .count()
}

fn classify_task(all_words: &[String]) -> TaskType {
    let counts = [
        (TaskType::Creative, count_indicators(all_words, CREATIVE_INDICATORS)),
        (TaskType::Analytical, count_indicators(all_words, ANALYTICAL_INDICATORS)),
        (
            TaskType::Informational,
            count_indicators(all_words, INFORMATIONAL_INDICATORS),
        ),
        (TaskType::Technical, count_indicators(all_words, TECHNICAL_INDICATORS)),
    ];

    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let leaders: Vec<TaskType> = counts
        .iter()
        .filter(|(_, c)| *c == max)
        .map(|(t, _)| *t)
        .collect();

    match leaders.as_slice() {
        [winner] if max > 0 => *winner,
        _ => TaskType::Mixed,
    }
}

fn mentions_any(all_words: &[String], list: &[&str]) -> bool {
    list.iter()
        .any(|phrase| contains_phrase(all_words, &words(phrase)))
}

fn estimate_complexity(all_words: &[String]) -> Complexity {
    if mentions_any(all_words, COMPLEX_WORDS) {
        Complexity::Complex
    } else if mentions_any(all_words, SIMPLE_WORDS) {
        Complexity::Simple
    } else if mentions_any(all_words, MEDIUM_WORDS) {
        Complexity::Medium
    } else if all_words.len() > 100 {
        Complexity::Complex
    } else if all_words.len() > 30 {
        Complexity::Medium
    } else {
        Complexity::Simple
    }
}

fn detect_priority(all_words: &[String]) -> Priority {
    if mentions_any(all_words, LOW_PRIORITY) {
        Priority::Low
    } else if mentions_any(all_words, HIGH_PRIORITY) {
        Priority::High
    } else {
        Priority::Medium
    }
}

fn detect_output_format(all_words: &[String]) -> OutputFormat {
    OUTPUT_FORMATS
        .iter()
        .find(|(_, keywords)| mentions_any(all_words, keywords))
        .map(|(format, _)| *format)
        .unwrap_or(OutputFormat::Unspecified)
}
