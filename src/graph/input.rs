//! Strict parse-and-validate of thought submissions.
//!
//! Required fields are checked by hand so a missing or mistyped field is
//! reported by name. Optional fields degrade: a mistyped optional value is
//! dropped and reported as a warning instead of failing the request.
//! Unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Classification, Phase};
use crate::error::{ValidationError, ValidationResult};

/// One thought as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitThought {
    /// Thought text
    pub thought: String,
    /// Submitted thought number (>= 1)
    pub thought_number: u32,
    /// Caller's estimate of the session length (>= 1)
    pub total_thoughts: u32,
    /// Whether the caller intends to continue
    pub next_thought_needed: bool,
    /// Marks the thought as superseding an earlier one
    #[serde(default)]
    pub is_revision: bool,
    /// Thought being revised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<u32>,
    /// Thought a branch forks from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<u32>,
    /// Branch label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// Earlier thoughts this one builds on
    #[serde(default)]
    pub dependencies: Vec<u32>,
    /// Tools used while producing the thought
    #[serde(default)]
    pub tools_used: Vec<String>,
    /// Explicit phase; the session phase is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Explicit classification; inferred from the text when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// A parsed submission with the adjustments made while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedThought {
    /// The submission
    pub input: SubmitThought,
    /// Optional fields that were dropped, one message each
    pub warnings: Vec<String>,
}

impl SubmitThought {
    /// Create a submission with the required fields
    pub fn new(
        thought: impl Into<String>,
        thought_number: u32,
        total_thoughts: u32,
        next_thought_needed: bool,
    ) -> Self {
        Self {
            thought: thought.into(),
            thought_number,
            total_thoughts,
            next_thought_needed,
            is_revision: false,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            dependencies: Vec::new(),
            tools_used: Vec::new(),
            phase: None,
            classification: None,
        }
    }

    /// Mark as a revision of `thought_number`
    pub fn with_revision_of(mut self, thought_number: u32) -> Self {
        self.is_revision = true;
        self.revises_thought = Some(thought_number);
        self
    }

    /// Fork a branch
    pub fn with_branch(mut self, from_thought: u32, branch_id: impl Into<String>) -> Self {
        self.branch_from_thought = Some(from_thought);
        self.branch_id = Some(branch_id.into());
        self
    }

    /// Set dependencies
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = u32>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Set tools used
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools_used = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the phase
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Set the classification
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Check the invariants of the required fields.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.thought.trim().is_empty() {
            return Err(ValidationError::OutOfRange {
                field: "thought".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.thought_number < 1 {
            return Err(ValidationError::OutOfRange {
                field: "thoughtNumber".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.total_thoughts < 1 {
            return Err(ValidationError::OutOfRange {
                field: "totalThoughts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse an untyped payload.
    pub fn parse(value: &Value) -> ValidationResult<ParsedThought> {
        let object = value.as_object().ok_or_else(|| ValidationError::Malformed {
            message: "expected a JSON object".to_string(),
        })?;

        let mut input = SubmitThought::new(
            required_string(object, "thought")?,
            required_count(object, "thoughtNumber")?,
            required_count(object, "totalThoughts")?,
            required_bool(object, "nextThoughtNeeded")?,
        );
        input.validate()?;

        let mut warnings = Vec::new();
        let mut optional = OptionalFields {
            object,
            warnings: &mut warnings,
        };

        input.is_revision = optional.boolean("isRevision").unwrap_or(false);
        input.revises_thought = optional.count("revisesThought");
        input.branch_from_thought = optional.count("branchFromThought");
        input.branch_id = optional.label("branchId");
        input.dependencies = optional.count_list("dependencies");
        input.tools_used = optional.label_list("toolsUsed");
        input.phase = optional.parsed("phase");
        input.classification = optional.parsed("classification");

        Ok(ParsedThought { input, warnings })
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &str) -> ValidationResult<&'a Value> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField {
            field: field.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

fn invalid_type(field: &str, expected: &str) -> ValidationError {
    ValidationError::InvalidType {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

fn required_string(object: &Map<String, Value>, field: &str) -> ValidationResult<String> {
    required(object, field)?
        .as_str()
        .map(String::from)
        .ok_or_else(|| invalid_type(field, "string"))
}

fn required_bool(object: &Map<String, Value>, field: &str) -> ValidationResult<bool> {
    required(object, field)?
        .as_bool()
        .ok_or_else(|| invalid_type(field, "boolean"))
}

fn required_count(object: &Map<String, Value>, field: &str) -> ValidationResult<u32> {
    let value = required(object, field)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| ValidationError::OutOfRange {
            field: field.to_string(),
            reason: format!("{} is too large", n),
        });
    }
    if value.as_i64().is_some() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Err(invalid_type(field, "integer"))
}

/// Lenient readers for optional fields. Each mistyped value adds a warning.
struct OptionalFields<'a> {
    object: &'a Map<String, Value>,
    warnings: &'a mut Vec<String>,
}

impl<'a> OptionalFields<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn ignored(&mut self, field: &str, expected: &str) {
        self.warnings
            .push(format!("Ignored {}: expected {}", field, expected));
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        let value = self.get(field)?.as_bool();
        if value.is_none() {
            self.ignored(field, "a boolean");
        }
        value
    }

    fn count(&mut self, field: &str) -> Option<u32> {
        let value = self.get(field)?.as_u64();
        match value.and_then(|n| u32::try_from(n).ok()).filter(|n| *n >= 1) {
            Some(n) => Some(n),
            None => {
                self.ignored(field, "a positive integer");
                None
            }
        }
    }

    fn label(&mut self, field: &str) -> Option<String> {
        let value = self.get(field)?.as_str().map(str::trim);
        match value.filter(|s| !s.is_empty()) {
            Some(s) => Some(s.to_string()),
            None => {
                self.ignored(field, "a non-empty string");
                None
            }
        }
    }

    fn count_list(&mut self, field: &str) -> Vec<u32> {
        let Some(value) = self.get(field) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.ignored(field, "an array of positive integers");
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut dropped = false;
        for item in items {
            match item.as_u64().and_then(|n| u32::try_from(n).ok()).filter(|n| *n >= 1) {
                Some(n) if !out.contains(&n) => out.push(n),
                Some(_) => {}
                None => dropped = true,
            }
        }
        if dropped {
            self.ignored(&format!("entries of {}", field), "positive integers");
        }
        out
    }

    fn label_list(&mut self, field: &str) -> Vec<String> {
        let Some(value) = self.get(field) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.ignored(field, "an array of strings");
            return Vec::new();
        };

        let mut out: Vec<String> = Vec::new();
        let mut dropped = false;
        for item in items {
            match item.as_str().map(str::trim).filter(|s| !s.is_empty()) {
                Some(s) if !out.iter().any(|o| o == s) => out.push(s.to_string()),
                Some(_) => {}
                None => dropped = true,
            }
        }
        if dropped {
            self.ignored(&format!("entries of {}", field), "non-empty strings");
        }
        out
    }

    fn parsed<T: std::str::FromStr<Err = String>>(&mut self, field: &str) -> Option<T> {
        let raw = self.get(field)?;
        match raw.as_str().map(str::parse::<T>) {
            Some(Ok(value)) => Some(value),
            Some(Err(message)) => {
                self.warnings.push(format!("Ignored {}: {}", field, message));
                None
            }
            None => {
                self.ignored(field, "a string");
                None
            }
        }
    }
}
