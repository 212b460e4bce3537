use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PrewarmRequest {
    pub spec_url: String,
}

#[derive(Debug, Serialize)]
pub struct PrewarmResponse {
    pub spec_url: String,
    /// Number of endpoints in the (now cached) entry
    pub endpoints: usize,
    /// Whether the entry already existed before this call
    pub already_cached: bool,
}

/// POST /prewarm - Populate the spec cache for a URL ahead of its first
/// real query, eliminating first-request latency. Same population contract
/// as the translate path, invoked without a query.
pub async fn prewarm_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PrewarmRequest>,
) -> Result<Json<PrewarmResponse>> {
    if request.spec_url.trim().is_empty() {
        return Err(AppError::Validation("spec_url cannot be empty".to_string()));
    }
    if !request.spec_url.starts_with("http://") && !request.spec_url.starts_with("https://") {
        return Err(AppError::Validation(
            "spec_url must be an http(s) URL".to_string(),
        ));
    }

    let already_cached = state.store.load(&request.spec_url).await?.is_some();

    let entry = state
        .store
        .get_or_populate(
            &request.spec_url,
            state.fetcher.as_ref(),
            state.embedder.as_ref(),
            &state.config.embedding_model,
        )
        .await?;

    metrics::counter!("prewarm_requests_total").increment(1);

    Ok(Json(PrewarmResponse {
        spec_url: request.spec_url,
        endpoints: entry.endpoints.len(),
        already_cached,
    }))
}
