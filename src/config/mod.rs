use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Tools advertised to the caller when `AVAILABLE_TOOLS` is unset.
pub const DEFAULT_AVAILABLE_TOOLS: &[&str] = &[
    "web_search",
    "code_interpreter",
    "calculator",
    "file_reader",
    "knowledge_base",
];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Log filter and format
    pub logging: LoggingConfig,
    /// Vectorizer settings
    pub vectors: VectorConfig,
    /// Scoring thresholds
    pub analysis: AnalysisConfig,
    /// Per-session settings
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log filter (`LOG_LEVEL`)
    pub level: String,
    /// Output format (`LOG_FORMAT`)
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

/// Pseudo-embedding configuration
#[derive(Debug, Clone)]
pub struct VectorConfig {
    /// Vector length, at least 8
    pub dimension: usize,
    /// LRU token cache capacity
    pub cache_size: usize,
    /// Optional GloVe-style vector file
    pub pretrained_path: Option<PathBuf>,
}

/// Heuristic thresholds. Tunable.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Drift is flagged when the drift score is strictly above this.
    pub drift_threshold: f64,
    /// Only pairs strictly above this similarity are checked for contradictions.
    pub contradiction_similarity: f64,
    /// Single-link clustering joins pairs strictly above this similarity.
    pub cluster_similarity: f64,
}

/// Session-level settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Tools suggested to the client
    pub available_tools: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let vectors = VectorConfig {
            dimension: env_parse("VECTOR_DIMENSION")
                .unwrap_or(VectorConfig::DEFAULT_DIMENSION)
                .max(8),
            cache_size: env_parse("VECTOR_CACHE_SIZE")
                .unwrap_or(VectorConfig::DEFAULT_CACHE_SIZE)
                .max(1),
            pretrained_path: env::var("PRETRAINED_VECTORS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        let defaults = AnalysisConfig::default();
        let analysis = AnalysisConfig {
            drift_threshold: threshold("DRIFT_THRESHOLD", defaults.drift_threshold)?,
            contradiction_similarity: threshold(
                "CONTRADICTION_SIMILARITY",
                defaults.contradiction_similarity,
            )?,
            cluster_similarity: threshold("CLUSTER_SIMILARITY", defaults.cluster_similarity)?,
        };

        let session = SessionConfig {
            available_tools: env::var("AVAILABLE_TOOLS")
                .ok()
                .map(|raw| parse_tool_list(&raw))
                .filter(|tools| !tools.is_empty())
                .unwrap_or_else(default_tools),
        };

        Ok(Config {
            logging,
            vectors,
            analysis,
            session,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn threshold(key: &str, default: f64) -> Result<f64, AppError> {
    let Some(value) = env_parse::<f64>(key) else {
        return Ok(default);
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::Config {
            message: format!("{} must be within [0, 1], got {}", key, value),
        });
    }
    Ok(value)
}

fn parse_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_tools() -> Vec<String> {
    DEFAULT_AVAILABLE_TOOLS.iter().map(|s| s.to_string()).collect()
}

impl VectorConfig {
    /// Default pseudo-embedding dimension.
    pub const DEFAULT_DIMENSION: usize = 128;
    /// Default token-vector cache capacity.
    pub const DEFAULT_CACHE_SIZE: usize = 2048;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            vectors: VectorConfig::default(),
            analysis: AnalysisConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
            cache_size: Self::DEFAULT_CACHE_SIZE,
            pretrained_path: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 0.55,
            contradiction_similarity: 0.5,
            cluster_similarity: 0.6,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            available_tools: default_tools(),
        }
    }
}
