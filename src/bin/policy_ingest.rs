//! One-shot policy ingestion tool.
//!
//! Usage: `policy_ingest <file> [<file> ...]`
//!
//! Chunks each policy document, embeds the chunks, and upserts them into
//! the policy namespace of the configured vector store. Re-running over the
//! same file replaces its chunks in place.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use claimgate::config::AppConfig;
use claimgate::providers::CohereClient;
use claimgate::retrieval::PolicyIngestor;
use claimgate::vector::PineconeStore;

#[tokio::main]
async fn main() -> ExitCode {
    claimgate::init_tracing();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: policy_ingest <file> [<file> ...]");
        return ExitCode::FAILURE;
    }

    let config = AppConfig::from_env();
    let ingestor = PolicyIngestor::new(
        Arc::new(CohereClient::new(&config.generation)),
        Arc::new(PineconeStore::new(&config.vector_store)),
    );

    let mut failed = false;
    for path in &paths {
        match ingestor.ingest_file(Path::new(path)).await {
            Ok(chunks) => {
                tracing::info!(file = %path, chunks, "Ingested");
            }
            Err(e) => {
                tracing::error!(file = %path, error = %e, "Ingestion failed");
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
