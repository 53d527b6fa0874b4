//! In-memory vector index with exact cosine ranking
//!
//! Embedding happens outside the lock. A document's chunks are committed under a
//! single write lock once every embedding has succeeded, so a failed ingestion leaves
//! the index untouched.

use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::guardrail::{content_terms, VocabularySource};
use crate::providers::{EmbeddingProvider, RetryPolicy};
use crate::types::{Chunk, Document, ScoredChunk};

use super::similarity::{cosine_similarity, magnitude};

const SNAPSHOT_VERSION: u32 = 1;

/// A stored chunk with its cached norm and insertion sequence
struct IndexEntry {
    seq: u64,
    magnitude: f32,
    chunk: Chunk,
}

#[derive(Default)]
struct IndexState {
    entries: Vec<IndexEntry>,
    documents: Vec<Document>,
    vocabulary: HashSet<String>,
    next_seq: u64,
}

impl IndexState {
    fn find_by_hash(&self, content_hash: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.content_hash == content_hash)
    }

    /// Store a document unless one with the same content hash is already present
    fn commit(
        &mut self,
        document: Document,
        chunks: Vec<Chunk>,
        terms: HashSet<String>,
    ) -> Insertion {
        if let Some(existing) = self.find_by_hash(&document.content_hash) {
            return Insertion::Duplicate(existing.clone());
        }

        let count = chunks.len();
        for chunk in chunks {
            self.entries.push(IndexEntry {
                seq: self.next_seq,
                magnitude: magnitude(&chunk.embedding),
                chunk,
            });
            self.next_seq += 1;
        }
        self.vocabulary.extend(terms);
        self.documents.push(document.clone());
        Insertion::Added { document, chunks: count }
    }
}

/// Result of [`VectorIndex::insert`]
#[derive(Debug, Clone)]
pub enum Insertion {
    /// The document and its chunks are now searchable
    Added { document: Document, chunks: usize },
    /// A document with identical text was committed first; nothing changed
    Duplicate(Document),
}

/// On-disk form of the index
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    dimensions: usize,
    embedder: String,
    documents: Vec<Document>,
    /// All chunks in insertion order
    chunks: Vec<Chunk>,
}

/// Vector index over document chunks
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    /// Concurrent embedding requests during `add`
    concurrency: usize,
    state: RwLock<IndexState>,
    /// Serializes snapshot writes so a newer snapshot is never replaced by an older one
    snapshot_lock: Mutex<()>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, retry: RetryPolicy) -> Self {
        Self {
            embedder,
            retry,
            concurrency: 4,
            state: RwLock::new(IndexState::default()),
            snapshot_lock: Mutex::new(()),
        }
    }

    /// Set how many chunks are embedded concurrently
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Dimensionality every stored vector has
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = &self.embedder;
        let embedding = self.retry.run("embed", move || embedder.embed(text)).await?;

        let expected = self.dimensions();
        if embedding.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    /// Embed and store a document's chunks, returning how many became searchable.
    ///
    /// All or nothing: on any failure no chunk of `document` is stored. A document
    /// whose text is already indexed is skipped and reports 0.
    pub async fn add(&self, document: Document, chunks: Vec<Chunk>) -> Result<usize> {
        match self.insert(document, chunks).await? {
            Insertion::Added { chunks, .. } => Ok(chunks),
            Insertion::Duplicate(_) => Ok(0),
        }
    }

    /// Embed and store a document's chunks.
    ///
    /// The content-hash check is repeated under the write lock, so concurrent
    /// uploads of identical text commit exactly once.
    pub async fn insert(&self, mut document: Document, mut chunks: Vec<Chunk>) -> Result<Insertion> {
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(document.filename));
        }

        let pending: Vec<_> = chunks.iter().map(|c| self.embed(&c.content)).collect();
        let embeddings: Vec<Vec<f32>> = stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        document.chunk_ids = chunks.iter().map(|c| c.id).collect();
        let terms: HashSet<String> = chunks.iter().flat_map(|c| content_terms(&c.content)).collect();

        let filename = document.filename.clone();
        let insertion = self.state.write().commit(document, chunks, terms);

        match &insertion {
            Insertion::Added { chunks, .. } => {
                tracing::info!(filename = %filename, chunks = *chunks, "Indexed document")
            }
            Insertion::Duplicate(existing) => tracing::info!(
                filename = %filename,
                existing = %existing.filename,
                "Document committed concurrently; skipping duplicate"
            ),
        }
        Ok(insertion)
    }

    /// Top `k` chunks by cosine similarity to `query`, best first. Equal scores keep
    /// insertion order. An empty index returns nothing without calling the embedder.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed(query).await?;
        Ok(self.rank(&query_embedding, k))
    }

    fn rank(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let query_magnitude = magnitude(query);
        let state = self.state.read();

        let mut scored: Vec<(f32, &IndexEntry)> = state
            .entries
            .iter()
            .map(|entry| {
                let similarity = cosine_similarity(
                    &entry.chunk.embedding,
                    query,
                    Some(entry.magnitude),
                    Some(query_magnitude),
                );
                (similarity, entry)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.seq.cmp(&b.1.seq)));

        scored
            .into_iter()
            .take(k)
            .map(|(similarity, entry)| ScoredChunk {
                chunk: entry.chunk.clone(),
                similarity,
            })
            .collect()
    }

    /// Drop every chunk and document
    pub fn clear(&self) {
        let mut state = self.state.write();
        let removed = state.entries.len();
        state.entries.clear();
        state.documents.clear();
        state.vocabulary.clear();
        drop(state);

        tracing::info!(chunks = removed, "Cleared index");
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Indexed documents in ingestion order
    pub fn documents(&self) -> Vec<Document> {
        self.state.read().documents.clone()
    }

    /// Look up a document
    pub fn document(&self, id: Uuid) -> Option<Document> {
        self.state.read().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Document whose extracted text has this hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.state.read().find_by_hash(content_hash).cloned()
    }

    /// Whether text with this hash is already indexed
    pub fn contains_hash(&self, content_hash: &str) -> bool {
        self.find_by_hash(content_hash).is_some()
    }

    /// Write the index to `path` as JSON.
    ///
    /// Writers are serialized and each one reads the state after taking the lock,
    /// so the file on disk always reflects the latest completed change.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let _guard = self.snapshot_lock.lock();
        self.write_snapshot(path)
    }

    /// Save the index to `path`, or remove the file when the index is empty
    pub fn persist_to(&self, path: &Path) -> Result<()> {
        let _guard = self.snapshot_lock.lock();
        if self.is_empty() {
            return match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::Io(e)),
                _ => Ok(()),
            };
        }
        self.write_snapshot(path)
    }

    fn write_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = {
            let state = self.state.read();
            IndexSnapshot {
                version: SNAPSHOT_VERSION,
                dimensions: self.dimensions(),
                embedder: self.embedder.name().to_string(),
                documents: state.documents.clone(),
                chunks: state.entries.iter().map(|e| e.chunk.clone()).collect(),
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let written = std::fs::write(&tmp, serde_json::to_vec(&snapshot)?)
            .and_then(|()| std::fs::rename(&tmp, path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::Io(e));
        }

        tracing::debug!(path = %path.display(), chunks = snapshot.chunks.len(), "Saved index snapshot");
        Ok(())
    }

    /// Rebuild an index from a snapshot written by [`save_snapshot`](Self::save_snapshot)
    pub fn load_snapshot(
        path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let snapshot: IndexSnapshot = serde_json::from_slice(&std::fs::read(path)?)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::internal(format!(
                "unsupported index snapshot version {}",
                snapshot.version
            )));
        }

        let expected = embedder.dimensions();
        if let Some(chunk) = snapshot.chunks.iter().find(|c| c.embedding.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: chunk.embedding.len(),
            });
        }

        let index = Self::new(embedder, retry);
        {
            let mut state = index.state.write();
            for chunk in snapshot.chunks {
                state.vocabulary.extend(content_terms(&chunk.content));
                let seq = state.next_seq;
                state.entries.push(IndexEntry {
                    seq,
                    magnitude: magnitude(&chunk.embedding),
                    chunk,
                });
                state.next_seq += 1;
            }
            state.documents = snapshot.documents;
        }

        tracing::info!(
            path = %path.display(),
            documents = index.documents().len(),
            chunks = index.len(),
            "Loaded index snapshot"
        );
        Ok(index)
    }
}

impl VocabularySource for VectorIndex {
    fn shared_terms(&self, terms: &HashSet<String>) -> usize {
        self.state.read().vocabulary.shared_terms(terms)
    }

    fn vocabulary_is_empty(&self) -> bool {
        self.state.read().vocabulary.is_empty()
    }
}
