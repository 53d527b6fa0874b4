//! Evaluation binary: runs the guard-rail and sample questions and writes a report
//!
//! Run with: cargo run -p docqa-rag --features cli --bin docqa-eval -- --document handbook.pdf

use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use docqa_rag::{
    config::RagConfig,
    evaluation::{default_evaluation_set, EvaluationHarness},
    server::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Evaluate guard-rail accuracy, latency, citations and retrieval relevance
#[derive(Debug, Parser)]
#[command(name = "docqa-eval", version, about)]
struct Args {
    /// TOML configuration file (defaults to $DOCQA_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document to ingest before asking questions
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Where to write the Markdown report
    #[arg(short, long, default_value = "evaluation_report.md")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var_os("DOCQA_CONFIG").map(PathBuf::from));
    let config = RagConfig::load(config_path.as_deref())?;
    let state = AppState::from_config(config)?;

    if let Some(path) = &args.document {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let outcome = state.pipeline().ingest(&filename, None, Bytes::from(data)).await?;
        println!(
            "Ingested {} ({} chunks)",
            outcome.document().filename,
            outcome.document().total_chunks()
        );
    } else if state.index().is_empty() {
        println!("No documents indexed; answer and retrieval metrics will reflect an empty index.");
    }

    let (questions, blocked) = default_evaluation_set();
    println!("Running {} evaluation questions...", questions.len());

    let harness = EvaluationHarness::new(state.orchestrator().clone());
    let report = harness.run(&questions, &blocked).await;
    report.write_markdown(&args.output)?;

    println!("\nGuard-rail accuracy: {:.1}%", report.block_accuracy * 100.0);
    println!("Average latency:     {:.0} ms", report.avg_latency_ms);
    println!("Under 5s:            {:.1}%", report.under_5s_rate * 100.0);
    println!("Citation rate:       {:.1}%", report.citation_rate * 100.0);
    println!("Error rate:          {:.1}%", report.error_rate * 100.0);
    match report.avg_top_similarity {
        Some(similarity) => println!("Avg top similarity:  {:.3}", similarity),
        None => println!("Avg top similarity:  n/a"),
    }
    println!("\nReport written to {}", args.output.display());

    Ok(())
}
