//! Shared mock capabilities for integration tests.
//!
//! The mocks count their upstream calls so tests can assert exactly how
//! much network work a code path performed; the cache guarantees are all
//! phrased in terms of those counts.

// Each test binary includes this module and uses a different subset of it.
#![allow(dead_code)]

use apiglot::embedding::{EmbeddingProvider, InputType};
use apiglot::reasoning::ChatModel;
use apiglot::spec::SpecFetcher;
use apiglot::{AppError, Config, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A small OpenAPI document with three endpoints, used across tests.
pub fn sample_spec() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": { "title": "Pet Store", "version": "1.0.0" },
        "paths": {
            "/pets": {
                "get": {
                    "summary": "List all pets",
                    "description": "Returns every pet in the store."
                },
                "post": {
                    "summary": "Create a pet",
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/Pet" }
                            }
                        }
                    }
                }
            },
            "/pets/{id}": {
                "delete": { "summary": "Delete a pet" }
            }
        },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                }
            }
        }
    })
}

/// Fetcher that serves a fixed document and counts fetches.
pub struct MockFetcher {
    spec: Value,
    pub fetch_count: AtomicUsize,
}

impl MockFetcher {
    pub fn new(spec: Value) -> Self {
        Self {
            spec,
            fetch_count: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpecFetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<Value> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.spec.clone())
    }
}

/// Fetcher that always fails, for fetch-stage error tests.
pub struct FailingFetcher;

#[async_trait]
impl SpecFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<Value> {
        Err(AppError::Fetch(format!("{url} unreachable")))
    }
}

/// Deterministic embedder: hashes each text into a fixed 4-dim vector and
/// counts embed calls. Same text always maps to the same vector, so cache
/// equivalence tests can compare entry contents across populations.
pub struct MockEmbedder {
    pub embed_calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    fn vector_for(text: &str) -> Vec<f32> {
        let mut acc: [u32; 4] = [1, 2, 3, 4];
        for (i, byte) in text.bytes().enumerate() {
            acc[i % 4] = acc[i % 4].wrapping_mul(31).wrapping_add(byte as u32);
        }
        acc.iter().map(|&x| (x % 1000) as f32 / 1000.0 + 0.001).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Vec<f32>>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Chat model that replays canned responses in order.
pub struct ScriptedChat {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedChat {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(
        &self,
        _prompt: &str,
        _max_tokens: usize,
    ) -> std::result::Result<String, String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "no scripted response left".to_string())
    }
}

/// Config pointing the cache at a test directory; upstream settings are
/// irrelevant because tests always inject mock capabilities.
pub fn test_config(cache_dir: &std::path::Path) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        shutdown_timeout_secs: 1,
        cache_dir: cache_dir.to_path_buf(),
        top_k_endpoints: 10,
        embedding_model: "test-model".into(),
        voyage_api_url: "http://localhost:1/embeddings".into(),
        voyage_api_key: String::new(),
        chat_model: "test-chat".into(),
        anthropic_api_url: "http://localhost:1/messages".into(),
        anthropic_api_key: String::new(),
        find_endpoints_max_tokens: 1000,
        construct_request_max_tokens: 2000,
        fetch_timeout_secs: 5,
        upstream_timeout_secs: 5,
    }
}
