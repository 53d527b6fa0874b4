//! API routes for the document Q&A server

pub mod chat;
pub mod clear;
pub mod documents;
pub mod summarize;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::{get, post},
    Router,
};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::guardrail::safety_disclaimer;
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        // Uploads get the larger body limit
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/summarize",
            post(summarize::summarize_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/clear", post(clear::clear_documents))
        .route("/documents", get(documents::list_documents))
        .route("/info", get(info))
}

/// A single file read from a multipart upload
pub(crate) struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Read the first field carrying a filename
pub(crate) async fn read_upload(multipart: &mut Multipart) -> Result<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read file '{}': {}", filename, e)))?;

        return Ok(UploadedFile {
            filename,
            content_type,
            data,
        });
    }

    Err(Error::InvalidRequest("No file in upload".to_string()))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with guard-rails and citation-aware answers",
        "endpoints": {
            "POST /api/chat": "Ask a question about the uploaded documents",
            "POST /api/upload": "Upload a PDF, DOCX, TXT or Markdown file for indexing",
            "POST /api/summarize": "Summarize an uploaded file without indexing it",
            "POST /api/clear": "Remove every indexed document",
            "GET /api/documents": "List indexed documents"
        },
        "disclaimer": safety_disclaimer()
    }))
}
