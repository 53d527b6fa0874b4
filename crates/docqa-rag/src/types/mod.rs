//! Core types for the document Q&A system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType};
pub use query::ChatRequest;
pub use response::{
    Answer, AnswerStatus, DocumentSummary, GuardRailVerdict, IngestResponse, ReasonCode,
    ScoredChunk, SourceRef, StatusResponse, SummaryResponse,
};
