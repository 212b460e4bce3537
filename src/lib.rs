//! apiglot - Natural-language to HTTP request translation
//!
//! This library exposes the spec cache, retrieval, and pipeline components
//! behind the translation service, enabling integration tests and embedding
//! in other applications.

pub mod config;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod persistence;
pub mod pipeline;
pub mod reasoning;
pub mod retrieval;
pub mod spec;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::{health_handler, prewarm_handler, ready_handler, translate_handler};
pub use persistence::{CacheEntry, SpecStore};
pub use pipeline::{translate, PipelineState, TranslationOutcome};
pub use retrieval::{RankedEndpoint, RetrievalIndex};
pub use spec::{extract_endpoints, EndpointDescriptor, HttpSpecFetcher, SpecFetcher};
pub use state::AppState;
