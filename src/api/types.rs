//! Shared types for the API layer.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::pipeline::BatchProcessor;

/// Shared context for all API routes: the batch processor plus the
/// server-wide shutdown token. Cancelling the token stops new per-file
/// work inside in-flight batches.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<BatchProcessor>,
    pub shutdown: CancellationToken,
}

impl ApiContext {
    pub fn new(processor: Arc<BatchProcessor>, shutdown: CancellationToken) -> Self {
        Self {
            processor,
            shutdown,
        }
    }
}
