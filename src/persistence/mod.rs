//! Persistence layer for cached spec embeddings.
//!
//! One file per spec URL under the cache directory, named by the SHA-256
//! of the URL. A file round-trips the raw spec document, the ordered
//! endpoint list, and the index-aligned embedding vectors. Publication is
//! atomic: entries are written to a `.tmp` sibling and renamed into place,
//! so a crash mid-write leaves either the previous entry or nothing,
//! never a torn file a reader could observe.

use crate::embedding::{EmbeddingProvider, InputType};
use crate::error::{AppError, Result};
use crate::spec::{extract_endpoints, EndpointDescriptor, SpecFetcher};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Cache file format version. Increment when format changes; entries with
/// a different version are treated as absent, never migrated in place.
const CACHE_VERSION: u32 = 1;

/// Durable bundle for one spec URL: the raw document, its endpoints, and
/// one embedding vector per endpoint (vector *i* belongs to endpoint *i*).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    pub source_url: String,
    /// Embedding model that produced the vectors
    pub model: String,
    /// The fetched OpenAPI document, unmodified
    pub spec: Value,
    pub endpoints: Vec<EndpointDescriptor>,
    pub embeddings: Vec<Vec<f32>>,
}

impl CacheEntry {
    /// The completeness invariant: one vector per endpoint, all vectors the
    /// same non-zero dimension, known format version. An entry failing this
    /// check must not be partially used.
    pub fn is_complete(&self) -> bool {
        if self.version != CACHE_VERSION {
            return false;
        }
        if self.endpoints.len() != self.embeddings.len() {
            return false;
        }
        let mut dims = self.embeddings.iter().map(|v| v.len());
        match dims.next() {
            None => true,
            Some(first) => first > 0 && dims.all(|d| d == first),
        }
    }

    /// Vector dimension, 0 for an entry with no endpoints.
    pub fn embedding_dim(&self) -> usize {
        self.embeddings.first().map(|v| v.len()).unwrap_or(0)
    }
}

/// Durable, URL-keyed store of [`CacheEntry`] values.
///
/// Owns on-disk durability and in-process reuse: loaded entries are held
/// in memory behind `Arc` so repeat requests for a warm URL touch neither
/// disk nor network. Population is single-flight per URL (first writer
/// wins): concurrent cold requests serialize on a per-URL mutex and the
/// losers reuse the winner's published entry.
pub struct SpecStore {
    dir: PathBuf,
    memory: DashMap<String, Arc<CacheEntry>>,
    population_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SpecStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::Cache(format!("failed to create {}: {e}", dir.display())))?;

        tracing::info!(dir = %dir.display(), "Spec store opened");

        Ok(Self {
            dir,
            memory: DashMap::new(),
            population_locks: DashMap::new(),
        })
    }

    /// File path for a URL's entry: `<sha256(url)>.json`.
    fn entry_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(69);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    /// Look up a complete entry for `url`, memory first, then disk.
    ///
    /// A file that is unreadable as JSON or violates the completeness
    /// invariant is logged and reported as absent. Corruption is repaired
    /// by repopulation, never in place.
    pub async fn load(&self, url: &str) -> Result<Option<Arc<CacheEntry>>> {
        if let Some(entry) = self.memory.get(url) {
            return Ok(Some(Arc::clone(entry.value())));
        }

        let path = self.entry_path(url);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Cache(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    path = %path.display(),
                    error = %e,
                    "Unreadable cache entry, treating as absent"
                );
                return Ok(None);
            }
        };

        if !entry.is_complete() {
            tracing::warn!(
                url = %url,
                endpoints = entry.endpoints.len(),
                embeddings = entry.embeddings.len(),
                version = entry.version,
                "Cache entry violates completeness invariant, treating as absent"
            );
            return Ok(None);
        }

        let entry = Arc::new(entry);
        self.memory.insert(url.to_string(), Arc::clone(&entry));
        Ok(Some(entry))
    }

    /// Publish an entry durably: write `<path>.tmp`, fsync, rename.
    pub async fn store(&self, url: &str, entry: &Arc<CacheEntry>) -> Result<()> {
        debug_assert!(entry.is_complete());

        let path = self.entry_path(url);
        let tmp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec(entry.as_ref())
            .map_err(|e| AppError::Cache(format!("failed to serialize entry: {e}")))?;

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|e| {
            AppError::Cache(format!("failed to create {}: {e}", tmp_path.display()))
        })?;
        file.write_all(&bytes).await.map_err(|e| {
            AppError::Cache(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        file.sync_all().await.map_err(|e| {
            AppError::Cache(format!("failed to sync {}: {e}", tmp_path.display()))
        })?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            AppError::Cache(format!(
                "failed to publish {}: {e}",
                path.display()
            ))
        })?;

        self.memory.insert(url.to_string(), Arc::clone(entry));

        tracing::info!(
            url = %url,
            path = %path.display(),
            endpoints = entry.endpoints.len(),
            size_bytes = bytes.len(),
            "Cache entry published"
        );

        Ok(())
    }

    fn population_lock(&self, url: &str) -> Arc<Mutex<()>> {
        self.population_locks
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the cached entry for `url`, populating it on a miss.
    ///
    /// Population fetches the spec, extracts endpoints, embeds their
    /// document texts in one batch, and publishes atomically. Concurrent
    /// callers for the same uncached URL serialize on a per-URL mutex;
    /// exactly one fetch+embed sequence runs, the rest reuse its result.
    /// Any stage failure leaves the store untouched; no partial entry is
    /// ever written.
    pub async fn get_or_populate(
        &self,
        url: &str,
        fetcher: &dyn SpecFetcher,
        embedder: &dyn EmbeddingProvider,
        model: &str,
    ) -> Result<Arc<CacheEntry>> {
        if let Some(entry) = self.load(url).await? {
            metrics::counter!("spec_cache_hits_total").increment(1);
            tracing::debug!(url = %url, "Cache hit");
            return Ok(entry);
        }

        let lock = self.population_lock(url);
        let _guard = lock.lock().await;

        // A concurrent populator may have published while we waited.
        if let Some(entry) = self.load(url).await? {
            metrics::counter!("spec_cache_hits_total").increment(1);
            tracing::debug!(url = %url, "Cache hit after waiting for in-flight population");
            return Ok(entry);
        }

        metrics::counter!("spec_cache_misses_total").increment(1);
        tracing::info!(url = %url, "Cache miss, populating");

        let spec = fetcher.fetch(url).await?;
        let endpoints = extract_endpoints(&spec)?;

        let texts: Vec<String> = endpoints.iter().map(EndpointDescriptor::document_text).collect();
        let embeddings = embedder.embed(&texts, InputType::Document).await?;

        if embeddings.len() != endpoints.len() {
            return Err(AppError::Embedding(format!(
                "provider returned {} vectors for {} endpoints",
                embeddings.len(),
                endpoints.len()
            )));
        }

        let entry = Arc::new(CacheEntry {
            version: CACHE_VERSION,
            source_url: url.to_string(),
            model: model.to_string(),
            spec,
            endpoints,
            embeddings,
        });

        self.store(url, &entry).await?;
        Ok(entry)
    }

    /// Directory this store persists into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
