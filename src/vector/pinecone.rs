//! Pinecone-style managed vector database client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::VectorStoreConfig;

use super::{PolicyChunk, ScoredMatch, VectorStore, VectorStoreError};

pub struct PineconeStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl PineconeStore {
    pub fn new(config: &VectorStoreConfig) -> Self {
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

    fn transport_error(&self, e: reqwest::Error) -> VectorStoreError {
        if e.is_connect() {
            VectorStoreError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            VectorStoreError::Timeout(self.timeout_secs)
        } else {
            VectorStoreError::ResponseParsing(e.to_string())
        }
    }
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    score: f32,
    metadata: Option<ChunkMetadata>,
}

#[derive(Serialize, Deserialize)]
struct ChunkMetadata {
    source_file: String,
    content: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    namespace: &'a str,
    vectors: Vec<UpsertRecord<'a>>,
}

#[derive(Serialize)]
struct UpsertRecord<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: ChunkMetadata,
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<ScoredMatch>, VectorStoreError> {
        let url = format!("{}/query", self.base_url);
        let body = QueryRequest {
            namespace,
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::Store {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::ResponseParsing(e.to_string()))?;

        Ok(parsed
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata.map(|meta| ScoredMatch {
                    content: meta.content,
                    score: m.score,
                })
            })
            .collect())
    }

    async fn upsert(
        &self,
        records: &[PolicyChunk],
        namespace: &str,
    ) -> Result<(), VectorStoreError> {
        let url = format!("{}/vectors/upsert", self.base_url);
        let body = UpsertRequest {
            namespace,
            vectors: records
                .iter()
                .map(|chunk| UpsertRecord {
                    id: &chunk.id,
                    values: &chunk.vector,
                    metadata: ChunkMetadata {
                        source_file: chunk.source_file.clone(),
                        content: chunk.content.clone(),
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::Store {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
