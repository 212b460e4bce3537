//! Endpoint extraction from OpenAPI documents.
//!
//! Walks `paths` and flattens every (method, path) operation into an
//! [`EndpointDescriptor`] ready for embedding. Extraction order is the
//! document's own iteration order, and that order is what the cache's
//! descriptor/vector index alignment is built on.

use crate::error::{AppError, Result};
use crate::spec::types::EndpointDescriptor;
use serde_json::Value;

/// HTTP methods recognized as operations inside a path item. Path items
/// also carry non-operation keys (`parameters`, `servers`, `summary`,
/// `$ref`) which must be skipped, not treated as malformed.
const OPERATION_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Extract the ordered endpoint list from a fetched OpenAPI document.
///
/// # Errors
/// Returns `AppError::SpecParse` when the document has no object-valued
/// `paths` member: there is nothing to enumerate, so the document is not
/// a usable API description. An object-valued but empty `paths` yields an
/// empty list; that surfaces later as an empty retrieval, not a parse
/// failure.
pub fn extract_endpoints(spec: &Value) -> Result<Vec<EndpointDescriptor>> {
    let paths = spec
        .get("paths")
        .and_then(|p| p.as_object())
        .ok_or_else(|| {
            AppError::SpecParse("document has no object-valued 'paths' member".into())
        })?;

    let mut endpoints = Vec::new();

    for (path, item) in paths {
        let Some(methods) = item.as_object() else {
            tracing::warn!(path = %path, "Skipping non-object path item");
            continue;
        };

        for (method, operation) in methods {
            if !OPERATION_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                continue;
            }

            let summary = operation
                .get("summary")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let description = operation
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");

            endpoints.push(EndpointDescriptor::new(
                method.to_ascii_uppercase(),
                path.clone(),
                summary.to_string(),
                description.to_string(),
            ));
        }
    }

    tracing::debug!(total = endpoints.len(), "Endpoint extraction complete");

    Ok(endpoints)
}
