//! In-process providers for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, RetryPolicy};

/// Retry policy with millisecond backoff
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        timeout: Duration::from_secs(5),
    }
}

/// Bag-of-words embedder: each lowercased word is hashed (FNV-1a) into a bucket
pub struct HashEmbedder {
    dimensions: usize,
    reported_dimensions: usize,
    fail_from: Option<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            reported_dimensions: dimensions,
            fail_from: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail (non-retryable) on the `n`th call (1-based) and every call after it
    pub fn failing_from(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    /// Claim a dimensionality different from the vectors produced
    pub fn reporting_dimensions(mut self, dimensions: usize) -> Self {
        self.reported_dimensions = dimensions;
        self
    }

    /// Sleep before every embedding
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_from.is_some_and(|n| call >= n) {
            return Err(Error::provider_fatal("hash", "embedding backend unavailable"));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut vector = vec![0.0; self.dimensions];
        for word in text.unicode_words() {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.reported_dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM returning queued replies, then repeating a default; records every prompt
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Always answers `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with a retryable error
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply used before the default
    pub fn then(self, reply: Result<String>) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        match &self.default_reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(Error::provider("scripted", "HTTP 503")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}
