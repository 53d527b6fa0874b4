//! Index reset endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::StatusResponse;

/// POST /api/clear - Drop every indexed document and the persisted snapshot
pub async fn clear_documents(State(state): State<AppState>) -> Json<StatusResponse> {
    let removed = state.index().documents().len();
    state.index().clear();
    state.persist().await;

    Json(StatusResponse::success(format!("Cleared {} document(s)", removed)))
}
