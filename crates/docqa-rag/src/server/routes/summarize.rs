//! Document summarization endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use super::read_upload;
use crate::error::Result;
use crate::ingestion::extract_blocking;
use crate::server::state::AppState;
use crate::types::SummaryResponse;

/// POST /api/summarize - Summarize an uploaded file; the index is not touched
pub async fn summarize_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>> {
    let upload = read_upload(&mut multipart).await?;
    let parsed = extract_blocking(&upload.filename, upload.content_type.as_deref(), upload.data).await?;

    let summary = state.summarizer().summarize(&parsed.content).await;

    Ok(Json(SummaryResponse {
        filename: upload.filename,
        summary,
    }))
}
