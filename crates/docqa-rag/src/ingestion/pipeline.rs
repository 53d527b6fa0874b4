//! Upload to searchable chunks: extract, chunk, embed, commit

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::retrieval::{Insertion, VectorIndex};
use crate::types::Document;

use super::chunker::TextChunker;
use super::parser::{FileParser, ParsedDocument};

/// What happened to an uploaded document
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Newly indexed
    Indexed(Document),
    /// Identical text was already indexed; nothing changed
    Duplicate(Document),
}

impl IngestOutcome {
    /// The indexed document (new or existing)
    pub fn document(&self) -> &Document {
        match self {
            Self::Indexed(doc) | Self::Duplicate(doc) => doc,
        }
    }
}

/// Ingestion pipeline over a shared index
pub struct IngestPipeline {
    chunker: TextChunker,
    index: Arc<VectorIndex>,
}

impl IngestPipeline {
    /// Create a pipeline writing into `index`
    pub fn new(chunker: TextChunker, index: Arc<VectorIndex>) -> Self {
        Self { chunker, index }
    }

    /// Extract text from an upload and index it
    pub async fn ingest(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<IngestOutcome> {
        let parsed = extract_blocking(filename, content_type, data).await?;
        self.ingest_parsed(filename, parsed).await
    }

    /// Index already-extracted text
    pub async fn ingest_parsed(&self, filename: &str, parsed: ParsedDocument) -> Result<IngestOutcome> {
        let start = Instant::now();

        let mut document = Document::new(filename, parsed.file_type, parsed.content);
        document.total_pages = parsed.total_pages;

        if let Some(existing) = self.index.find_by_hash(&document.content_hash) {
            tracing::info!(
                filename,
                existing = %existing.filename,
                "Skipping duplicate upload"
            );
            return Ok(IngestOutcome::Duplicate(existing));
        }

        let chunks = self.chunker.chunk_document(&document, &document.raw_text);
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        let document = match self.index.insert(document, chunks).await? {
            Insertion::Added { document, .. } => document,
            Insertion::Duplicate(existing) => {
                tracing::info!(
                    filename,
                    existing = %existing.filename,
                    "Concurrent upload of identical text; keeping the first"
                );
                return Ok(IngestOutcome::Duplicate(existing));
            }
        };

        tracing::info!(
            filename,
            chunks = document.total_chunks(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingested document"
        );
        Ok(IngestOutcome::Indexed(document))
    }
}

/// Text extraction is CPU bound; keep it off the async workers
pub async fn extract_blocking(
    filename: &str,
    content_type: Option<&str>,
    data: Bytes,
) -> Result<ParsedDocument> {
    let filename = filename.to_string();
    let content_type = content_type.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        FileParser::extract_text(&filename, content_type.as_deref(), &data)
    })
    .await
    .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))?
}
