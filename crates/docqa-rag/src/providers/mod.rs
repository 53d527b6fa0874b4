//! Provider abstractions for embeddings and LLM generation
//!
//! Trait-based so tests and alternative backends can stand in for Ollama.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod retry;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use retry::RetryPolicy;
