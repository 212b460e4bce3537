//! Type definitions for parsed API specifications.

use serde::{Deserialize, Serialize};

/// One operation extracted from an OpenAPI document.
///
/// Identified uniquely within a spec by (method, path). The struct is
/// immutable once extracted; `document_text` is the deterministic rendering
/// that gets embedded, so changing its format invalidates every cached
/// embedding built with the old format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Uppercase HTTP method (GET, POST, PUT, DELETE, PATCH)
    pub method: String,

    /// Path template as written in the spec (e.g., "/users/{id}")
    pub path: String,

    /// Operation summary, empty string when the spec omits it
    pub summary: String,

    /// Operation description, empty string when the spec omits it
    pub description: String,
}

impl EndpointDescriptor {
    pub fn new(method: String, path: String, summary: String, description: String) -> Self {
        Self {
            method,
            path,
            summary,
            description,
        }
    }

    /// Render the text representation used for embedding.
    pub fn document_text(&self) -> String {
        format!(
            "Path: {}\nMethod: {}\nSummary: {}\nDescription: {}",
            self.path, self.method, self.summary, self.description
        )
    }

    /// "METHOD /path" display form used in logs and prompts.
    pub fn name(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}
