//! docqa-rag: document Q&A with grounded, cited answers
//!
//! Uploaded PDF, DOCX and text files are split into overlapping character windows,
//! embedded, and held in an in-process vector index. Questions pass a regex
//! guard-rail, retrieve the most similar chunks, and are answered by an LLM that
//! must cite the chunks it used. Embeddings and generation are served by an
//! Ollama-compatible endpoint.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod guardrail;
pub mod ingestion;
pub mod providers;
pub mod rag;
pub mod retrieval;
pub mod server;
pub mod summarization;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use evaluation::{EvaluationHarness, EvaluationReport};
pub use guardrail::GuardRail;
pub use rag::RagOrchestrator;
pub use retrieval::VectorIndex;
pub use summarization::Summarizer;
pub use types::{
    Answer, AnswerStatus, ChatRequest, Chunk, Document, FileType, GuardRailVerdict, ReasonCode,
    ScoredChunk, SourceRef,
};
