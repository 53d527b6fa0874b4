//! Application state for the HTTP server

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider, RetryPolicy};
use crate::rag::RagOrchestrator;
use crate::retrieval::VectorIndex;
use crate::summarization::Summarizer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    index: Arc<VectorIndex>,
    pipeline: IngestPipeline,
    orchestrator: Arc<RagOrchestrator>,
    summarizer: Summarizer,
}

impl AppState {
    /// Wire the components together over an existing index
    pub fn new(config: RagConfig, index: Arc<VectorIndex>, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        config.validate()?;

        let pipeline = IngestPipeline::new(TextChunker::from_config(&config.chunking)?, Arc::clone(&index));
        let orchestrator = Arc::new(RagOrchestrator::new(&config, Arc::clone(&index), Arc::clone(&llm))?);
        let summarizer = Summarizer::new(&config, llm)?;

        tracing::info!(
            documents = index.documents().len(),
            chunks = index.len(),
            "Application state initialized"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                index,
                pipeline,
                orchestrator,
                summarizer,
            }),
        })
    }

    /// Build Ollama-backed state, reloading the persisted index when one exists
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config.llm, config.embeddings.dimensions)?.split();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
        let retry = RetryPolicy::from_config(&config.llm);

        let index = match config.storage.snapshot_path.as_deref() {
            Some(path) if path.exists() => {
                match VectorIndex::load_snapshot(path, Arc::clone(&embedder), retry.clone()) {
                    Ok(index) => {
                        tracing::info!(path = %path.display(), chunks = index.len(), "Loaded index snapshot");
                        index
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "Ignoring unreadable index snapshot: {}", e);
                        VectorIndex::new(embedder, retry)
                    }
                }
            }
            _ => VectorIndex::new(embedder, retry),
        };
        let index = Arc::new(index.with_concurrency(config.embeddings.concurrency));

        Self::new(config, index, Arc::new(llm))
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the vector index
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.inner.index
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Get the question answering orchestrator
    pub fn orchestrator(&self) -> &Arc<RagOrchestrator> {
        &self.inner.orchestrator
    }

    /// Get the summarizer
    pub fn summarizer(&self) -> &Summarizer {
        &self.inner.summarizer
    }

    fn snapshot_path(&self) -> Option<&PathBuf> {
        self.inner.config.storage.snapshot_path.as_ref()
    }

    /// Persist the index after a change, if a snapshot path is configured.
    ///
    /// The write runs on the blocking pool and concurrent calls are serialized by
    /// the index. Failures are logged; the in-memory index stays authoritative.
    pub async fn persist(&self) {
        let Some(path) = self.snapshot_path().cloned() else {
            return;
        };

        let index = Arc::clone(&self.inner.index);
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || index.persist_to(&target))
            .await
            .map_err(|e| Error::internal(format!("Snapshot task failed: {}", e)))
            .and_then(|r| r);

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), "Failed to persist index snapshot: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_retry, HashEmbedder, ScriptedLlm};
    use bytes::Bytes;

    fn state_with_snapshot(path: Option<PathBuf>) -> AppState {
        let mut config = RagConfig::default();
        config.storage.snapshot_path = path;
        let index = Arc::new(VectorIndex::new(Arc::new(HashEmbedder::new(32)), fast_retry()));
        AppState::new(config, index, Arc::new(ScriptedLlm::replying("ok"))).unwrap()
    }

    #[tokio::test]
    async fn test_persist_writes_and_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("index.json");
        let state = state_with_snapshot(Some(path.clone()));

        state
            .pipeline()
            .ingest("a.txt", None, Bytes::from_static(b"Some searchable text."))
            .await
            .unwrap();
        state.persist().await;
        assert!(path.exists());

        state.index().clear();
        state.persist().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_persists_leave_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let state = state_with_snapshot(Some(path.clone()));
        state
            .pipeline()
            .ingest("a.txt", None, Bytes::from_static(b"Deposit is returned within thirty days."))
            .await
            .unwrap();

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { state.persist().await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let restored =
            VectorIndex::load_snapshot(&path, Arc::new(HashEmbedder::new(32)), fast_retry()).unwrap();
        assert_eq!(restored.len(), state.index().len());
    }

    #[tokio::test]
    async fn test_persist_without_path_is_noop() {
        let state = state_with_snapshot(None);
        state.persist().await;
        assert!(state.index().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let index = Arc::new(VectorIndex::new(Arc::new(HashEmbedder::new(32)), fast_retry()));
        assert!(AppState::new(config, index, Arc::new(ScriptedLlm::replying("ok"))).is_err());
    }
}
