//! Document-AI-style processor client.
//!
//! The processor accepts base64 document content and returns recognized
//! entities (with confidences), form fields, and full text in one response.
//! Classification takes the highest-confidence entity label; field
//! extraction returns trimmed key/value pairs from the form parser.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;

use super::{DocClass, DocumentExtractor, ExtractionError};

pub struct DocAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl DocAiClient {
    pub fn new(config: &ExtractorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
        }
    }

    async fn process(&self, file_bytes: &[u8]) -> Result<ProcessResponse, ExtractionError> {
        let url = format!("{}/v1/process", self.base_url);
        let body = ProcessRequest {
            content: base64::engine::general_purpose::STANDARD.encode(file_bytes),
            mime_type: "application/pdf",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ExtractionError::Timeout(self.timeout_secs)
                } else {
                    ExtractionError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Processor {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))
    }
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct ProcessRequest<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    form_fields: Vec<FormField>,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Entity {
    #[serde(rename = "type")]
    entity_type: String,
    confidence: f32,
}

#[derive(Deserialize)]
struct FormField {
    name: String,
    value: String,
}

#[async_trait]
impl DocumentExtractor for DocAiClient {
    async fn classify(&self, file_bytes: &[u8]) -> Result<DocClass, ExtractionError> {
        let response = self.process(file_bytes).await?;
        Ok(best_entity_label(&response.entities)
            .map(DocClass::from_label)
            .unwrap_or(DocClass::Unknown))
    }

    async fn extract_fields(
        &self,
        file_bytes: &[u8],
    ) -> Result<HashMap<String, String>, ExtractionError> {
        let response = self.process(file_bytes).await?;
        Ok(response
            .form_fields
            .into_iter()
            .map(|f| (f.name.trim().to_string(), f.value.trim().to_string()))
            .collect())
    }

    async fn extract_text(&self, file_bytes: &[u8]) -> Result<String, ExtractionError> {
        let response = self.process(file_bytes).await?;
        Ok(response.text)
    }
}

/// The entity label with the highest confidence, if any.
fn best_entity_label(entities: &[Entity]) -> Option<&str> {
    entities
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|e| e.entity_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_type: &str, confidence: f32) -> Entity {
        Entity {
            entity_type: entity_type.to_string(),
            confidence,
        }
    }

    #[test]
    fn best_entity_takes_highest_confidence() {
        let entities = vec![entity("eob", 0.4), entity("claim_form", 0.9), entity("notes", 0.2)];
        assert_eq!(best_entity_label(&entities), Some("claim_form"));
    }

    #[test]
    fn best_entity_empty_is_none() {
        assert_eq!(best_entity_label(&[]), None);
    }

    #[test]
    fn process_response_defaults_missing_sections() {
        let parsed: ProcessResponse = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert!(parsed.entities.is_empty());
        assert!(parsed.form_fields.is_empty());
        assert_eq!(parsed.text, "hello");
    }

    #[test]
    fn process_request_encodes_base64() {
        let body = ProcessRequest {
            content: base64::engine::general_purpose::STANDARD.encode(b"pdf bytes"),
            mime_type: "application/pdf",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["mime_type"], "application/pdf");
        assert_eq!(json["content"], "cGRmIGJ5dGVz");
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = DocAiClient::new(&ExtractorConfig {
            base_url: "http://localhost:5090/".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        });
        assert_eq!(client.base_url, "http://localhost:5090");
    }
}
