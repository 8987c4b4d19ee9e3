//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state holding the session store

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::graph::ThoughtGraphStore;
use crate::telemetry::{SessionEvent, TelemetrySink, TracingSink};
use crate::text::{HashVectorizer, VectorSource};

/// Application state shared across handlers.
///
/// The store sits behind an async mutex so tool calls are processed one at
/// a time and each submission sees the effects of every earlier one.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The session's thought graph.
    pub store: Mutex<ThoughtGraphStore>,
    /// Vectorizer shared with the store.
    pub vectorizer: Arc<HashVectorizer>,
    /// Telemetry sink shared with the store.
    pub sink: Arc<dyn TelemetrySink>,
}

impl AppState {
    /// Create application state that logs events through `tracing`.
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create application state with a custom telemetry sink.
    pub fn with_sink(config: Config, sink: Arc<dyn TelemetrySink>) -> Self {
        let vectorizer = Arc::new(HashVectorizer::from_config(&config.vectors));
        let store = ThoughtGraphStore::new(&config, vectorizer.clone(), Arc::clone(&sink));

        info!(
            session_id = %store.session_id(),
            dimension = config.vectors.dimension,
            drift_threshold = config.analysis.drift_threshold,
            "AppState initialized"
        );

        Self {
            config,
            store: Mutex::new(store),
            vectorizer,
            sink,
        }
    }

    /// Load a pretrained table and install it in the shared vectorizer.
    ///
    /// Stored thoughts are re-vectorized so later comparisons stay in one
    /// vector space.
    pub async fn load_pretrained(&self, source: &dyn VectorSource) -> AppResult<usize> {
        let table = source.load().await?;
        let words = table.len();
        let dimension = table.dimension();

        let revectorized = {
            let mut store = self.store.lock().await;
            self.vectorizer.install_pretrained(table);
            store.revectorize()
        };
        info!(words, dimension, revectorized, "Installed pretrained vectors");
        self.sink.emit(&SessionEvent::PretrainedVectorsInstalled {
            source: source.describe(),
            words,
            dimension,
        });

        Ok(words)
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
