//! # MCP Thought Graph Server
//!
//! A Model Context Protocol (MCP) server that accumulates an agent's
//! sequential thoughts into a graph and scores each one as it arrives.
//!
//! ## Features
//!
//! - **Prompt Profiling**: Goals, constraints, domains, keywords, entities and task shape
//! - **Similarity**: Hashed pseudo-embeddings, keyword Jaccard and TF-IDF cosine
//! - **Contradictions**: Between thoughts and between a thought and the prompt
//! - **Alignment & Drift**: Weighted relevance to the prompt with corrective suggestions
//! - **Guidance**: Strategies, reasoning types, tools, biases and pattern diversity
//! - **Graph**: Dependencies, revisions, branches, topic clusters and tool usage
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (stdio) → ThoughtGraphStore → analysis engines
//!                                          ↓
//!                                   TelemetrySink (tracing)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_thought_graph::{AppState, Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = Arc::new(AppState::new(config));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Similarity, contradiction, alignment and recommendation engines.
pub mod analysis;
/// Configuration management for the MCP server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Thought graph data model, ingress validation and the session store.
pub mod graph;
/// Prompt profiling.
pub mod profile;
/// MCP server implementation and request handling.
pub mod server;
/// Structured session events.
pub mod telemetry;
/// Text features and vectorization.
pub mod text;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use graph::{SubmitThought, ThoughtGraphStore, ThoughtResponse};
pub use server::{AppState, McpServer, SharedState};
