//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::Instant;

use super::read_upload;
use crate::error::Result;
use crate::ingestion::IngestOutcome;
use crate::server::state::AppState;
use crate::types::{DocumentSummary, IngestResponse};

/// POST /api/upload - Extract, chunk and index one file
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let upload = read_upload(&mut multipart).await?;

    tracing::info!("Processing file: {} ({} bytes)", upload.filename, upload.data.len());

    let outcome = state
        .pipeline()
        .ingest(&upload.filename, upload.content_type.as_deref(), upload.data)
        .await?;

    let message = match &outcome {
        IngestOutcome::Indexed(doc) => {
            state.persist().await;
            format!(
                "Indexed {} ({} chunks). You can now ask questions about it.",
                doc.filename,
                doc.total_chunks()
            )
        }
        IngestOutcome::Duplicate(doc) => {
            format!("{} is already indexed; nothing to do.", doc.filename)
        }
    };

    Ok(Json(IngestResponse {
        success: true,
        message,
        document: Some(DocumentSummary::from(outcome.document())),
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
