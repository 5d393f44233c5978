//! External AI provider boundary — text generation and embeddings.
//!
//! The pipeline never talks to a provider SDK directly. Components receive
//! `Arc<dyn TextGenerator>` / `Arc<dyn Embedder>` handles constructed at the
//! process entry point, which keeps every component testable with the mock
//! implementations below.

pub mod cohere;

pub use cohere::CohereClient;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// One message in a streaming chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Errors from text-generation calls. Transport conditions (unreachable,
/// timed out) are kept distinct so callers can tell a dead provider from a
/// malformed answer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Cannot reach generation provider at {0}")]
    Connection(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    ResponseParsing(String),
}

/// Errors from embedding calls (quota, timeout, malformed input).
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Cannot reach embedding provider at {0}")]
    Connection(String),

    #[error("Embedding request timed out after {0}s")]
    Timeout(u64),

    #[error("Embedding provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    ResponseParsing(String),
}

// ═══════════════════════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════════════════════

/// Text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-shot completion.
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError>;

    /// Streaming chat. Implementations must concatenate all deltas and
    /// return the complete text — the rest of the pipeline never sees
    /// partial results.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;
}

/// Embedding capability. Embedding is a pure function of a single text:
/// the same input always yields the same fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

// ═══════════════════════════════════════════════════════════
// Mocks
// ═══════════════════════════════════════════════════════════

/// Mock generator for testing — replays scripted responses.
///
/// `generate` pops from a response queue (repeating the last entry once the
/// queue is exhausted); `chat_stream` returns a separately configured text.
pub struct MockGenerator {
    responses: Mutex<VecDeque<String>>,
    last_response: String,
    chat_response: String,
    fail: bool,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last_response: response.to_string(),
            chat_response: String::new(),
            fail: false,
        }
    }

    /// Script a sequence of `generate` responses, replayed in order.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let last = responses.last().cloned().unwrap_or_default();
        Self {
            responses: Mutex::new(responses.into()),
            last_response: last,
            chat_response: String::new(),
            fail: false,
        }
    }

    pub fn with_chat_response(mut self, response: &str) -> Self {
        self.chat_response = response.to_string();
        self
    }

    /// A generator whose every call fails with a transport error.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last_response: String::new(),
            chat_response: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, GenerationError> {
        if self.fail {
            return Err(GenerationError::Connection("mock://generator".into()));
        }
        let mut queue = self.responses.lock().unwrap();
        Ok(queue.pop_front().unwrap_or_else(|| self.last_response.clone()))
    }

    async fn chat_stream(&self, _messages: &[ChatMessage]) -> Result<String, GenerationError> {
        if self.fail {
            return Err(GenerationError::Connection("mock://generator".into()));
        }
        Ok(self.chat_response.clone())
    }
}

/// Mock embedder for testing — a deterministic byte-class histogram.
///
/// Identical texts map to identical vectors (cosine similarity 1.0), the
/// empty string maps to the all-zero vector (the defined degenerate case).
pub struct MockEmbedder {
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Connection("mock://embedder".into()));
        }
        let mut vector = vec![0.0f32; 8];
        for byte in text.bytes() {
            vector[(byte % 8) as usize] += 1.0;
        }
        Ok(vector)
    }
}
