use crate::error::{AppError, Result};
use crate::pipeline::{translate, TranslationOutcome};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    /// Natural-language description of the desired API call
    pub query: String,
    /// URL of the OpenAPI document describing the target API
    pub spec_url: String,
    /// Optional override for the number of retrieved candidates
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// POST /translate - Translate a natural-language query into an HTTP
/// request against the API described at `spec_url`.
///
/// # Flow
/// 1. Validate input
/// 2. Run the pipeline (cache-or-populate, retrieve, select, construct)
/// 3. Return the constructed request with the intermediate stages
pub async fn translate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslationOutcome>> {
    let start = std::time::Instant::now();

    if request.query.trim().is_empty() {
        return Err(AppError::Validation("Query cannot be empty".to_string()));
    }
    if request.spec_url.trim().is_empty() {
        return Err(AppError::Validation("spec_url cannot be empty".to_string()));
    }
    if !request.spec_url.starts_with("http://") && !request.spec_url.starts_with("https://") {
        return Err(AppError::Validation(
            "spec_url must be an http(s) URL".to_string(),
        ));
    }

    let top_k = request.top_k.unwrap_or(state.config.top_k_endpoints);
    if top_k == 0 {
        return Err(AppError::Validation("top_k must be at least 1".to_string()));
    }

    let outcome = translate(&state, &request.query, &request.spec_url, top_k).await?;

    let total_time = start.elapsed();
    metrics::counter!("translate_requests_total").increment(1);
    metrics::histogram!("translate_latency_ms").record(total_time.as_millis() as f64);

    Ok(Json(outcome))
}
