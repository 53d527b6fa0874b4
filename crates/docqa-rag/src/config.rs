//! Configuration for the document Q&A system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Guard-rail patterns and off-topic policy
    pub guardrail: GuardRailConfig,
    /// Summarization configuration
    pub summarization: SummarizationConfig,
    /// Index persistence
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply `DOCQA_*` overrides.
    ///
    /// The result is validated; invalid chunking or retrieval settings are fatal.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<RagConfig>(&content)?
            }
            None => RagConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DOCQA_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("DOCQA_GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Ok(model) = std::env::var("DOCQA_EMBED_MODEL") {
            self.llm.embed_model = model;
        }
        if let Ok(host) = std::env::var("DOCQA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("DOCQA_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Validate settings that would otherwise fail at first use
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.summarization.map_overlap >= self.summarization.map_chunk_size {
            return Err(Error::invalid_config(format!(
                "summarization.map_overlap ({}) must be smaller than map_chunk_size ({})",
                self.summarization.map_overlap, self.summarization.map_chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::invalid_config("retrieval.top_k must be at least 1"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::invalid_config("embeddings.dimensions must be at least 1"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::invalid_config("llm.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Concurrent embedding requests during ingestion
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
            concurrency: 4,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Reject windows that would never advance
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::invalid_config("chunk_size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub initial_backoff_ms: u64,
}

impl LlmConfig {
    /// Total attempts including the first call
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,  // Lower for more factual answers
            timeout_secs: 120,
            max_retries: 2,
            initial_backoff_ms: 1000,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks supplied to the model
    pub top_k: usize,
    /// Drop retrieved chunks scoring below this cosine similarity
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_similarity: 0.0,
        }
    }
}

/// Off-topic detection policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffTopicPolicy {
    /// Only the pattern list decides
    #[default]
    Disabled,
    /// Require the question to share content terms with the indexed documents
    LexicalOverlap {
        /// Minimum number of shared terms
        min_shared_terms: usize,
    },
}

/// Guard-rail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardRailConfig {
    /// Regex patterns (case-insensitive) flagged as prompt injection
    pub injection_patterns: Vec<String>,
    /// Regex patterns (case-insensitive) flagged as out of scope
    pub off_topic_patterns: Vec<String>,
    /// Vocabulary-based off-topic heuristic
    pub off_topic_policy: OffTopicPolicy,
}

impl Default for GuardRailConfig {
    fn default() -> Self {
        let injection = [
            "ignore previous",
            "ignore all instructions",
            "system prompt",
            "override instructions",
            "hack",
            "injection",
            "forget your instructions",
            "disregard",
            "pretend you are",
            "act as if",
            "reveal your prompt",
            "show me your instructions",
            "bypass",
            "jailbreak",
        ];
        let off_topic = [
            "write me code",
            "generate code",
            "create a program",
            "help me hack",
            "illegal",
        ];

        Self {
            injection_patterns: injection.iter().map(|p| regex_literal(p)).collect(),
            off_topic_patterns: off_topic.iter().map(|p| regex_literal(p)).collect(),
            off_topic_policy: OffTopicPolicy::Disabled,
        }
    }
}

/// Phrase to whitespace-tolerant regex ("ignore  previous" still matches)
fn regex_literal(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// Summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Documents up to this many characters are summarized in one call
    pub max_direct_chars: usize,
    /// Window size for the map step
    pub map_chunk_size: usize,
    /// Window overlap for the map step
    pub map_overlap: usize,
    /// How many times the reduce step may recurse before truncating
    pub max_reduce_depth: usize,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            max_direct_chars: 20_000,
            map_chunk_size: 8_000,
            map_overlap: 200,
            max_reduce_depth: 2,
        }
    }
}

/// Index persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot of the vector index; `None` keeps the index in memory only
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let snapshot_path = dirs::data_local_dir()
            .map(|dir| dir.join("docqa-rag").join("index.json"));
        Self { snapshot_path }
    }
}
