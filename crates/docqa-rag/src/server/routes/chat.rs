//! Question answering endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::{Answer, ChatRequest};

/// POST /api/chat - Answer a question from the indexed documents
///
/// Always responds with an [`Answer`]; refusals and provider failures are
/// reported through its status.
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<Answer> {
    let answer = state
        .orchestrator()
        .answer_with_history(&request.question, &request.chat_history)
        .await;
    Json(answer)
}
