//! Embedding provider capability.
//!
//! The core never computes vectors itself; it consumes this interface.
//! Endpoint documents and user queries go through the same provider so
//! their vectors live in the same space, but providers distinguish the
//! two roles via [`InputType`].

pub mod voyage;

use crate::error::Result;
use async_trait::async_trait;

pub use voyage::VoyageEmbedder;

/// Role of the text being embedded. Asymmetric embedding models encode
/// queries and documents differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Query,
    Document,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Query => "query",
            InputType::Document => "document",
        }
    }
}

/// External capability: text in, fixed-length vectors out.
///
/// Implementations must return exactly one vector per input text, in input
/// order. The store depends on that alignment for its descriptor/vector
/// invariant.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>>;
}
