use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "Claimgate";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("{}=info,tower_http=info", env!("CARGO_PKG_NAME"))
}

/// Full service configuration, read from the environment once at startup
/// and passed into the components that need it. No ambient globals.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Origin allowed by the CORS layer (the reviewer frontend).
    pub cors_origin: String,
    pub generation: GenerationConfig,
    pub vector_store: VectorStoreConfig,
    pub extractor: ExtractorConfig,
}

/// Text-generation + embedding provider settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    /// Model for single-shot completions (risk analysis, validation).
    pub generate_model: String,
    /// Model for streaming chat (summarization).
    pub chat_model: String,
    pub embed_model: String,
    pub timeout_secs: u64,
}

/// Managed vector database settings.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Document classification/extraction processor settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Read configuration from the environment, falling back to local
    /// defaults for everything except API keys (empty key = unauthenticated
    /// local stub, useful for development).
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("CLAIMGATE_BIND", "127.0.0.1:8000")
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000))),
            cors_origin: env_or("CLAIMGATE_CORS_ORIGIN", "http://localhost:3000"),
            generation: GenerationConfig {
                base_url: env_or("COHERE_BASE_URL", "https://api.cohere.com"),
                api_key: env_or("COHERE_API_KEY", ""),
                generate_model: env_or("CLAIMGATE_GENERATE_MODEL", "command"),
                chat_model: env_or("CLAIMGATE_CHAT_MODEL", "command-r-plus-08-2024"),
                embed_model: env_or("CLAIMGATE_EMBED_MODEL", "embed-english-v3.0"),
                timeout_secs: env_u64("CLAIMGATE_GENERATION_TIMEOUT_SECS", 120),
            },
            vector_store: VectorStoreConfig {
                base_url: env_or("PINECONE_BASE_URL", "http://localhost:5080"),
                api_key: env_or("PINECONE_API_KEY", ""),
                timeout_secs: env_u64("CLAIMGATE_VECTOR_TIMEOUT_SECS", 30),
            },
            extractor: ExtractorConfig {
                base_url: env_or("DOCAI_BASE_URL", "http://localhost:5090"),
                api_key: env_or("DOCAI_API_KEY", ""),
                timeout_secs: env_u64("CLAIMGATE_EXTRACTION_TIMEOUT_SECS", 60),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
