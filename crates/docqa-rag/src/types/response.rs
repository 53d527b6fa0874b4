//! Answer and response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, Document, FileType};

/// Why the guard-rail refused a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Prompt-injection phrase matched
    InjectionDetected,
    /// Out-of-scope request or no overlap with indexed documents
    OffTopic,
    /// Nothing to answer
    EmptyQuestion,
}

/// Result of the guard-rail check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRailVerdict {
    /// Whether the question may proceed
    pub allowed: bool,
    /// Reason when blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    /// Pattern that triggered the block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

impl GuardRailVerdict {
    /// Question may proceed
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            matched_pattern: None,
        }
    }

    /// Question is refused
    pub fn block(reason: ReasonCode, matched_pattern: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            matched_pattern,
        }
    }
}

/// A chunk paired with its similarity to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Citation from a generated answer back to a supplied chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document ID
    pub document_id: Uuid,
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Sequence index of the chunk in its document
    pub chunk_index: u32,
    /// Source filename
    pub filename: String,
    /// Retrieval similarity of the cited chunk
    pub similarity: f32,
}

impl SourceRef {
    /// Create a reference to a retrieved chunk
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        Self {
            document_id: scored.chunk.document_id,
            chunk_id: scored.chunk.id,
            chunk_index: scored.chunk.chunk_index,
            filename: scored.chunk.filename.clone(),
            similarity: scored.similarity,
        }
    }
}

/// Terminal state of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Model produced an answer
    Answered,
    /// Guard-rail refused the question
    Blocked { reason: ReasonCode },
    /// Retrieval found nothing to ground an answer in
    NoContext,
    /// A provider failed; the text explains what happened
    Degraded,
}

/// Answer returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text (or refusal/explanation)
    pub text: String,
    /// Chunks the model cited, in first-mention order
    pub citations: Vec<SourceRef>,
    /// Terminal state
    pub status: AnswerStatus,
    /// Time spent waiting on the language model
    pub generation_latency_ms: u64,
    /// Number of chunks supplied to the model
    pub chunks_retrieved: usize,
    /// Best retrieval similarity, if anything was retrieved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_similarity: Option<f32>,
}

impl Answer {
    /// Refusal for a blocked question
    pub fn blocked(reason: ReasonCode) -> Self {
        let text = match reason {
            ReasonCode::InjectionDetected => {
                "Your message was blocked for safety reasons. Detected potentially unsafe pattern."
            }
            ReasonCode::OffTopic => {
                "I can only help with questions about your uploaded documents. \
                 This request appears to be outside my scope."
            }
            ReasonCode::EmptyQuestion => "Please enter a question about your documents.",
        };
        Self::terminal(text.to_string(), AnswerStatus::Blocked { reason })
    }

    /// Nothing relevant was retrieved
    pub fn no_context() -> Self {
        Self::terminal(
            "I couldn't find relevant information in the uploaded documents to answer this \
             question. Please upload a PDF or DOCX file first, or rephrase the question."
                .to_string(),
            AnswerStatus::NoContext,
        )
    }

    /// A provider failed after retries
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::terminal(message.into(), AnswerStatus::Degraded)
    }

    fn terminal(text: String, status: AnswerStatus) -> Self {
        Self {
            text,
            citations: Vec::new(),
            status,
            generation_latency_ms: 0,
            chunks_retrieved: 0,
            top_similarity: None,
        }
    }

    /// Whether the guard-rail refused this question
    pub fn is_blocked(&self) -> bool {
        matches!(self.status, AnswerStatus::Blocked { .. })
    }

    /// Whether a provider failure degraded this answer
    pub fn is_degraded(&self) -> bool {
        self.status == AnswerStatus::Degraded
    }
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether the document is now searchable
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Ingested (or already present) document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentSummary>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Number of chunks created
    pub total_chunks: usize,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            total_pages: doc.total_pages,
            total_chunks: doc.total_chunks(),
            ingested_at: doc.ingested_at,
        }
    }
}

/// Response from the summarize endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Uploaded filename
    pub filename: String,
    /// Generated summary (or explanation when summarization failed)
    pub summary: String,
}

/// Generic status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// "success" or "error"
    pub status: String,
    /// Human-readable message
    pub message: String,
}

impl StatusResponse {
    /// Successful status
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
