//! The translation pipeline: fetch-or-cache → retrieve → select → construct.
//!
//! Stages run strictly in sequence. Each stage reads only state written by
//! earlier stages and writes exactly the fields it owns; a stage failure
//! short-circuits the rest and surfaces as the typed error of that stage.
//! The pipeline holds no state between invocations except through the
//! shared spec store.

use crate::embedding::InputType;
use crate::error::{AppError, Result};
use crate::persistence::CacheEntry;
use crate::reasoning::{
    construct_request, select_endpoints, HttpRequestSpec, SelectedEndpoint,
};
use crate::retrieval::{RankedEndpoint, RetrievalIndex};
use crate::state::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Per-request accumulator. Every field is write-once: a stage that sets a
/// field already set is a bug, caught in debug builds.
pub struct PipelineState {
    query: String,
    source_url: String,
    entry: Option<Arc<CacheEntry>>,
    query_vector: Option<Vec<f32>>,
    retrieved: Option<Vec<RankedEndpoint>>,
    selected: Option<Vec<SelectedEndpoint>>,
    request: Option<HttpRequestSpec>,
}

impl PipelineState {
    pub fn new(query: &str, source_url: &str) -> Self {
        Self {
            query: query.to_string(),
            source_url: source_url.to_string(),
            entry: None,
            query_vector: None,
            retrieved: None,
            selected: None,
            request: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    fn set_entry(&mut self, entry: Arc<CacheEntry>) {
        debug_assert!(self.entry.is_none());
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        self.entry.as_ref()
    }

    fn set_query_vector(&mut self, vector: Vec<f32>) {
        debug_assert!(self.query_vector.is_none());
        self.query_vector = Some(vector);
    }

    fn query_vector(&self) -> &[f32] {
        self.query_vector.as_deref().unwrap_or_default()
    }

    fn set_retrieved(&mut self, retrieved: Vec<RankedEndpoint>) {
        debug_assert!(self.retrieved.is_none());
        self.retrieved = Some(retrieved);
    }

    fn retrieved(&self) -> &[RankedEndpoint] {
        self.retrieved.as_deref().unwrap_or_default()
    }

    fn set_selected(&mut self, selected: Vec<SelectedEndpoint>) {
        debug_assert!(self.selected.is_none());
        self.selected = Some(selected);
    }

    fn selected(&self) -> &[SelectedEndpoint] {
        self.selected.as_deref().unwrap_or_default()
    }

    fn set_request(&mut self, request: HttpRequestSpec) {
        debug_assert!(self.request.is_none());
        self.request = Some(request);
    }

    /// Consume the state into the final outcome once every stage has run.
    fn into_outcome(self) -> Result<TranslationOutcome> {
        match (self.request, self.selected, self.retrieved) {
            (Some(request), Some(selected), Some(retrieved)) => Ok(TranslationOutcome {
                request,
                selected,
                retrieved,
            }),
            _ => Err(AppError::Construction(
                "pipeline finished without a constructed request".into(),
            )),
        }
    }
}

/// Everything the pipeline produced for one query: the translated request
/// plus the intermediate stages for caller introspection.
#[derive(Debug, Serialize)]
pub struct TranslationOutcome {
    pub request: HttpRequestSpec,
    pub selected: Vec<SelectedEndpoint>,
    pub retrieved: Vec<RankedEndpoint>,
}

/// Translate a natural-language query into an HTTP request against the API
/// described at `source_url`.
pub async fn translate(
    state: &AppState,
    query: &str,
    source_url: &str,
    top_k: usize,
) -> Result<TranslationOutcome> {
    let start = Instant::now();
    let mut pipeline = PipelineState::new(query, source_url);

    // Stage 1: fetch-or-cache. Warm URLs touch neither the network nor the
    // embedding provider.
    let entry = state
        .store
        .get_or_populate(
            pipeline.source_url(),
            state.fetcher.as_ref(),
            state.embedder.as_ref(),
            &state.config.embedding_model,
        )
        .await?;
    pipeline.set_entry(Arc::clone(&entry));

    let cache_time = start.elapsed();
    tracing::debug!(
        url = %source_url,
        endpoints = entry.endpoints.len(),
        stage_ms = cache_time.as_millis() as u64,
        "Stage 1 (fetch-or-cache) completed"
    );

    // Stage 2: retrieval. The index is rebuilt from the entry; an empty
    // spec fails here rather than handing the selection stage nothing.
    let index = RetrievalIndex::build(Arc::clone(&entry))?;
    if index.is_empty() {
        return Err(AppError::EmptyRetrieval(format!(
            "specification at {source_url} contains no endpoints"
        )));
    }

    let query_vector = state
        .embedder
        .embed(&[pipeline.query().to_string()], InputType::Query)
        .await?
        .pop()
        .ok_or_else(|| AppError::Embedding("provider returned no vector for the query".into()))?;
    pipeline.set_query_vector(query_vector);

    let retrieved = index.rank(pipeline.query_vector(), top_k)?;
    pipeline.set_retrieved(retrieved);

    let retrieve_time = start.elapsed();
    tracing::debug!(
        candidates = pipeline.retrieved().len(),
        stage_ms = (retrieve_time - cache_time).as_millis() as u64,
        "Stage 2 (retrieval) completed"
    );

    // Stage 3: minimal endpoint subset via the reasoning capability.
    let selected = select_endpoints(
        state.chat.as_ref(),
        pipeline.query(),
        pipeline.retrieved(),
        state.config.find_endpoints_max_tokens,
    )
    .await?;
    pipeline.set_selected(selected);

    // Stage 4: final request construction.
    let request = construct_request(
        state.chat.as_ref(),
        pipeline.query(),
        pipeline.selected(),
        &entry,
        state.config.construct_request_max_tokens,
    )
    .await?;
    pipeline.set_request(request);

    let total_time = start.elapsed();
    tracing::info!(
        query = %pipeline.query(),
        url = %pipeline.source_url(),
        top_k,
        selected = pipeline.selected().len(),
        total_ms = total_time.as_millis() as u64,
        "Translation completed"
    );

    pipeline.into_outcome()
}
