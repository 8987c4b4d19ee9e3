use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_thought_graph::{
    config::{Config, LogFormat},
    profile::PromptProfiler,
    server::{AppState, McpServer, SharedState},
    text::FileVectorSource,
};

/// Thought graph reasoning server for MCP clients
#[derive(Parser)]
#[command(name = "mcp-thought-graph")]
#[command(version)]
#[command(about = "MCP server that scores and connects sequential thoughts")]
struct Cli {
    /// GloVe-style pretrained vector file (overrides PRETRAINED_VECTORS_PATH)
    #[arg(long, value_name = "PATH")]
    vectors: Option<PathBuf>,

    /// Log filter (overrides LOG_LEVEL; RUST_LOG still wins)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Print the prompt profile of TEXT as JSON and exit
    Profile {
        /// Prompt text to profile
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.vectors {
        config.vectors.pretrained_path = Some(path);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    init_logging(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Profile { text } => {
            let profile = PromptProfiler::new().profile(&text);
            let json = serde_json::to_string_pretty(&profile).context("serializing profile")?;
            println!("{}", json);
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Thought Graph Server starting..."
    );

    let pretrained_path = config.vectors.pretrained_path.clone();
    let state: SharedState = Arc::new(AppState::new(config));

    // Pretrained vectors load in the background; hash vectors serve until then.
    if let Some(path) = pretrained_path {
        let loader_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = load_vectors(&loader_state, path).await {
                warn!(error = %e, "Continuing with hash vectors only");
            }
        });
    }

    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn load_vectors(state: &SharedState, path: PathBuf) -> anyhow::Result<()> {
    let source = FileVectorSource::new(path.clone());
    let words = state
        .load_pretrained(&source)
        .await
        .with_context(|| format!("loading pretrained vectors from {}", path.display()))?;
    info!(path = %path.display(), words = words, "Pretrained vectors ready");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
