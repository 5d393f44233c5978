pub mod api;
pub mod claim;
pub mod config;
pub mod extraction;
pub mod fraud;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod summarize;
pub mod validation;
pub mod vector;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::api::{api_router, ApiContext};
use crate::config::AppConfig;
use crate::extraction::DocAiClient;
use crate::pipeline::BatchProcessor;
use crate::providers::CohereClient;
use crate::vector::PineconeStore;

/// Initialize tracing from `RUST_LOG`, falling back to the built-in
/// filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire the production providers into a `BatchProcessor`.
pub fn build_processor(config: &AppConfig) -> BatchProcessor {
    let generation = Arc::new(CohereClient::new(&config.generation));
    BatchProcessor::new(
        Arc::new(DocAiClient::new(&config.extractor)),
        generation.clone(),
        generation,
        Arc::new(PineconeStore::new(&config.vector_store)),
    )
}

/// Run the claim intake server until ctrl-c.
///
/// Ctrl-c cancels the shutdown token first, so in-flight batches stop
/// dispatching new per-file work, then the listener drains and exits.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let shutdown = CancellationToken::new();
    let ctx = ApiContext::new(Arc::new(build_processor(&config)), shutdown.clone());
    let app = api_router(ctx, &config.cors_origin);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await
}
