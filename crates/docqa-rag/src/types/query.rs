//! Request types

use serde::{Deserialize, Serialize};

/// Chat request for the RAG orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,

    /// Previous turns of the conversation, passed to the model verbatim
    #[serde(default)]
    pub chat_history: String,
}

impl ChatRequest {
    /// Create a new request without history
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            chat_history: String::new(),
        }
    }

    /// Attach conversation history
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.chat_history = history.into();
        self
    }
}
