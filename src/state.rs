use crate::config::Config;
use crate::embedding::{EmbeddingProvider, VoyageEmbedder};
use crate::error::{AppError, Result};
use crate::persistence::SpecStore;
use crate::reasoning::{ChatModel, ClaudeModel};
use crate::spec::{HttpSpecFetcher, SpecFetcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
///
/// The spec store is an explicitly owned object opened at startup; there
/// is no process-global cache. The three external capabilities (fetcher,
/// embedder, chat model) are trait objects so tests can inject mocks
/// without touching the network.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SpecStore>,
    pub fetcher: Arc<dyn SpecFetcher>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatModel>,
    /// Flag indicating the service is ready (store opened)
    pub ready: AtomicBool,
}

impl AppState {
    /// Initialize application state with the real upstream clients.
    pub fn new(config: Config) -> Result<Self> {
        let store = SpecStore::open(&config.cache_dir)?;

        let fetcher = HttpSpecFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;

        let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);
        let embedder = VoyageEmbedder::new(
            &config.voyage_api_key,
            config.voyage_api_url.clone(),
            config.embedding_model.clone(),
            upstream_timeout,
        )?;
        let chat = ClaudeModel::new(
            config.anthropic_api_key.clone(),
            config.anthropic_api_url.clone(),
            config.chat_model.clone(),
            upstream_timeout,
        )
        .map_err(AppError::Selection)?;

        let state = Self {
            config: Arc::new(config),
            store: Arc::new(store),
            fetcher: Arc::new(fetcher),
            embedder: Arc::new(embedder),
            chat: Arc::new(chat),
            ready: AtomicBool::new(false),
        };

        state.ready.store(true, Ordering::SeqCst);

        Ok(state)
    }

    /// Assemble state from pre-built components. Used by tests to wire in
    /// mock capabilities.
    pub fn with_components(
        config: Config,
        store: Arc<SpecStore>,
        fetcher: Arc<dyn SpecFetcher>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            fetcher,
            embedder,
            chat,
            ready: AtomicBool::new(true),
        }
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
