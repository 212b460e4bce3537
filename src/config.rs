use std::env;
use std::path::PathBuf;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Directory holding one cache file per spec URL.
    pub cache_dir: PathBuf,
    /// Number of endpoints retrieved before the selection stage.
    pub top_k_endpoints: usize,
    /// Embedding model identifier sent to the provider.
    pub embedding_model: String,
    pub voyage_api_url: String,
    pub voyage_api_key: String,
    /// Chat model driving endpoint selection and request construction.
    pub chat_model: String,
    pub anthropic_api_url: String,
    pub anthropic_api_key: String,
    pub find_endpoints_max_tokens: usize,
    pub construct_request_max_tokens: usize,
    /// Timeout for fetching a spec document.
    pub fetch_timeout_secs: u64,
    /// Timeout for embedding and chat model calls.
    pub upstream_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `VOYAGE_API_KEY` and `ANTHROPIC_API_KEY` have no defaults; they may be
    /// empty for test setups that inject mock providers, but the real
    /// upstream clients will reject requests without them.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            cache_dir: PathBuf::from(
                env::var("CACHE_DIR").unwrap_or_else(|_| ".apiglot/cache".to_string()),
            ),
            top_k_endpoints: env::var("TOP_K_ENDPOINTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "voyage-3.5".to_string()),
            voyage_api_url: env::var("VOYAGE_API_URL")
                .unwrap_or_else(|_| "https://api.voyageai.com/v1/embeddings".to_string()),
            voyage_api_key: env::var("VOYAGE_API_KEY").unwrap_or_default(),
            chat_model: env::var("CHAT_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            anthropic_api_url: env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            find_endpoints_max_tokens: env::var("FIND_ENDPOINTS_MAX_TOKENS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            construct_request_max_tokens: env::var("CONSTRUCT_REQUEST_MAX_TOKENS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            fetch_timeout_secs: env::var("FETCH_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
        })
    }
}
