use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Ingress validation errors.
///
/// These are the only hard failures of a thought submission. The store is
/// left untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid type for {field}: expected {expected}")]
    InvalidType { field: String, expected: String },

    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("Malformed thought payload: {message}")]
    Malformed { message: String },
}

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session already initialized: {session_id}")]
    AlreadyInitialized { session_id: String },

    #[error("Failed to load pretrained vectors from {path}: {message}")]
    VectorLoad { path: String, message: String },
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire shape of a rejected submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureResponse {
    /// Human-readable validation message.
    pub error: String,
    /// Always `"failed"`.
    pub status: &'static str,
}

impl ValidationError {
    /// Convert into the failure object returned to the caller.
    pub fn to_failure(&self) -> FailureResponse {
        FailureResponse {
            error: self.to_string(),
            status: "failed",
        }
    }

    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidType { field, .. }
            | ValidationError::OutOfRange { field, .. } => Some(field),
            ValidationError::Malformed { .. } => None,
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for ingress validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
