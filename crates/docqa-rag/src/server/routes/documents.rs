//! Document listing endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::DocumentSummary;

/// GET /api/documents - List indexed documents in upload order
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    let documents = state
        .index()
        .documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    Json(documents)
}
