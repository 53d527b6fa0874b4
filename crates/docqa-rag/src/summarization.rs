//! Document summarization with map-reduce for long texts

use std::sync::Arc;

use crate::config::{RagConfig, SummarizationConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::TextChunker;
use crate::providers::{LlmProvider, RetryPolicy};

/// LLM-backed summarizer
pub struct Summarizer {
    llm: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    chunker: TextChunker,
    config: SummarizationConfig,
}

impl Summarizer {
    /// Create a summarizer; the map window settings are validated here
    pub fn new(config: &RagConfig, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        let summarization = config.summarization.clone();
        Ok(Self {
            llm,
            retry: RetryPolicy::from_config(&config.llm),
            chunker: TextChunker::new(summarization.map_chunk_size, summarization.map_overlap)?,
            config: summarization,
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Summarize text, returning an explanation instead of an error on failure
    pub async fn summarize(&self, text: &str) -> String {
        match self.try_summarize(text).await {
            Ok(summary) => summary,
            Err(Error::EmptyDocument(_)) => {
                "Document is empty or contains no extractable text.".to_string()
            }
            Err(e) => {
                tracing::warn!("Summarization failed: {}", e);
                let detail = e.to_string();
                if detail.contains("429") || detail.to_lowercase().contains("rate limit") {
                    "Rate limit reached. Please wait a few minutes and try again.".to_string()
                } else {
                    format!("Error during summarization: {}", detail)
                }
            }
        }
    }

    /// Summarize text.
    ///
    /// Text longer than `max_direct_chars` is split into windows, each window is
    /// summarized, and the joined section summaries are summarized again. After
    /// `max_reduce_depth` rounds the remaining input is truncated.
    pub async fn try_summarize(&self, text: &str) -> Result<String> {
        let mut current = text.trim().to_string();
        if current.is_empty() {
            return Err(Error::EmptyDocument("document".to_string()));
        }

        let mut depth = 0usize;
        loop {
            let chars = current.chars().count();
            if chars <= self.config.max_direct_chars || depth >= self.config.max_reduce_depth {
                if chars > self.config.max_direct_chars {
                    tracing::debug!(chars, limit = self.config.max_direct_chars, "Truncating summary input");
                }
                let input: String = current.chars().take(self.config.max_direct_chars).collect();
                return self.generate(&PromptBuilder::build_summary_prompt(&input)).await;
            }

            let windows = self.chunker.split(&current);
            let total = windows.len();
            tracing::info!(chars, sections = total, depth, "Summarizing long document in sections");

            let mut partials = Vec::with_capacity(total);
            for window in &windows {
                let prompt = PromptBuilder::build_section_summary_prompt(
                    &window.text,
                    window.index as usize + 1,
                    total,
                );
                partials.push(self.generate(&prompt).await?.trim().to_string());
            }

            current = partials.join("\n\n");
            depth += 1;
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let llm = &self.llm;
        self.retry.run("summarize", move || llm.generate(prompt)).await
    }
}
