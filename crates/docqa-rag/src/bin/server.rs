//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-server [config.toml]

use std::path::PathBuf;

use docqa_rag::{
    config::RagConfig,
    server::{AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Document Q&A Assistant                 ║
║           Grounded answers with source citations          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config_path = std::env::var_os("DOCQA_CONFIG")
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from));
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    if let Some(path) = &config.storage.snapshot_path {
        tracing::info!("  - Index snapshot: {}", path.display());
    }

    let state = AppState::from_config(config.clone())?;

    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    if state.orchestrator().llm().health_check().await.unwrap_or(false) {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!(
            "  2. Pull models: ollama pull {} && ollama pull {}",
            config.llm.embed_model,
            config.llm.generate_model
        );
    }

    let server = RagServer::new(config, state);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/upload    - Upload a document");
    println!("  POST /api/chat      - Ask a question");
    println!("  POST /api/summarize - Summarize a document");
    println!("  POST /api/clear     - Remove all documents");
    println!("  GET  /api/documents - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
