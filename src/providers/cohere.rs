//! Cohere-style HTTP provider client.
//!
//! Implements `TextGenerator` (v1 generate + v2 streaming chat) and
//! `Embedder` (v2 embed). All requests carry the configured timeout;
//! connect, timeout, HTTP-status, and body-parse failures map to distinct
//! error variants so the pipeline can report what actually went wrong.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

use super::{ChatMessage, Embedder, EmbeddingError, GenerationError, TextGenerator};

pub struct CohereClient {
    base_url: String,
    api_key: String,
    generate_model: String,
    chat_model: String,
    embed_model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl CohereClient {
    pub fn new(config: &GenerationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            generate_model: config.generate_model.clone(),
            chat_model: config.chat_model.clone(),
            embed_model: config.embed_model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generation_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_connect() {
            GenerationError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::ResponseParsing(e.to_string())
        }
    }

    fn embedding_error(&self, e: reqwest::Error) -> EmbeddingError {
        if e.is_connect() {
            EmbeddingError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            EmbeddingError::Timeout(self.timeout_secs)
        } else {
            EmbeddingError::ResponseParsing(e.to_string())
        }
    }
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One server-sent event from the v2 chat stream. Only `content-delta`
/// events carry text; everything else (message-start, message-end, ...)
/// is ignored.
#[derive(Deserialize)]
struct ChatStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<ChatDelta>,
}

#[derive(Deserialize)]
struct ChatDelta {
    message: Option<ChatDeltaMessage>,
}

#[derive(Deserialize)]
struct ChatDeltaMessage {
    content: Option<ChatDeltaContent>,
}

#[derive(Deserialize)]
struct ChatDeltaContent {
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: Vec<&'a str>,
    input_type: &'a str,
    embedding_types: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: EmbedVectors,
}

#[derive(Deserialize)]
struct EmbedVectors {
    float: Vec<Vec<f32>>,
}

// ── Trait impls ─────────────────────────────────────────────

#[async_trait]
impl TextGenerator for CohereClient {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/v1/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.generate_model,
            prompt,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.generation_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

        parsed
            .generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .ok_or_else(|| GenerationError::ResponseParsing("empty generations array".into()))
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let url = format!("{}/v2/chat", self.base_url);
        let body = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.generation_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        // Concatenate every content delta before returning — the rest of
        // the pipeline never sees partial results.
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| self.generation_error(e))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                if let Some(delta) = parse_stream_line(line.trim()) {
                    text.push_str(&delta);
                }
            }
        }
        if let Some(delta) = parse_stream_line(buffer.trim()) {
            text.push_str(&delta);
        }

        Ok(text)
    }
}

/// Parse one stream line into its text delta, if any. Lines that are not
/// valid event JSON are skipped with a warning rather than failing the call.
fn parse_stream_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }
    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<ChatStreamEvent>(payload) {
        Ok(event) if event.event_type == "content-delta" => event
            .delta
            .and_then(|d| d.message)
            .and_then(|m| m.content)
            .and_then(|c| c.text),
        Ok(_) => None,
        Err(_) => {
            tracing::warn!("Skipping invalid chat stream chunk");
            None
        }
    }
}

#[async_trait]
impl Embedder for CohereClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/v2/embed", self.base_url);
        let body = EmbedRequest {
            model: &self.embed_model,
            texts: vec![text],
            input_type: "classification",
            embedding_types: vec!["float"],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.embedding_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ResponseParsing(e.to_string()))?;

        parsed
            .embeddings
            .float
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ResponseParsing("empty embeddings array".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    fn test_config() -> GenerationConfig {
        GenerationConfig {
            base_url: "https://api.cohere.com/".to_string(),
            api_key: "test-key".to_string(),
            generate_model: "command".to_string(),
            chat_model: "command-r-plus-08-2024".to_string(),
            embed_model: "embed-english-v3.0".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = CohereClient::new(&test_config());
        assert_eq!(client.base_url(), "https://api.cohere.com");
    }

    #[test]
    fn stream_line_content_delta() {
        let line = r#"data: {"type":"content-delta","delta":{"message":{"content":{"text":"Hello"}}}}"#;
        assert_eq!(parse_stream_line(line).as_deref(), Some("Hello"));
    }

    #[test]
    fn stream_line_without_sse_prefix() {
        let line = r#"{"type":"content-delta","delta":{"message":{"content":{"text":"x"}}}}"#;
        assert_eq!(parse_stream_line(line).as_deref(), Some("x"));
    }

    #[test]
    fn stream_line_ignores_other_events() {
        let line = r#"data: {"type":"message-end","delta":null}"#;
        assert_eq!(parse_stream_line(line), None);
    }

    #[test]
    fn stream_line_skips_invalid_json() {
        assert_eq!(parse_stream_line("data: not json at all"), None);
    }

    #[test]
    fn stream_line_skips_done_marker_and_blanks() {
        assert_eq!(parse_stream_line("data: [DONE]"), None);
        assert_eq!(parse_stream_line(""), None);
    }

    #[test]
    fn generate_request_serializes() {
        let body = GenerateRequest {
            model: "command",
            prompt: "Analyze this",
            temperature: 0.0,
            max_tokens: 300,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "command");
        assert_eq!(json["max_tokens"], 300);
    }

    #[test]
    fn embed_response_deserializes() {
        let json = r#"{"embeddings":{"float":[[0.1,0.2,0.3]]}}"#;
        let parsed: EmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.embeddings.float[0].len(), 3);
    }
}
