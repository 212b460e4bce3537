//! Endpoint selection and request construction.
//!
//! Both stages are external reasoning capabilities consumed as black
//! boxes: the core hands a prompt to a [`ChatModel`] and parses structured
//! JSON back out. The model sees only the pre-filtered top-K candidates,
//! never the whole spec. That is the entire point of the retrieval stage.

pub mod claude;

use crate::error::{AppError, Result};
use crate::persistence::CacheEntry;
use crate::retrieval::RankedEndpoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub use claude::ClaudeModel;

/// External chat-completion capability. Errors are plain messages; each
/// call site tags them with its own pipeline stage.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
    ) -> std::result::Result<String, String>;
}

/// One endpoint the model chose for fulfilling the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedEndpoint {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

/// The final translated HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequestSpec {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: serde_json::Map<String, Value>,
    #[serde(default)]
    pub query_params: serde_json::Map<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub description: String,
}

/// Ask the model for the minimal endpoint subset covering the query.
///
/// The model is constrained to the retrieved candidates; an empty
/// selection is a `Selection` failure; the pipeline never proceeds to
/// construct a request from nothing.
pub async fn select_endpoints(
    model: &dyn ChatModel,
    query: &str,
    candidates: &[RankedEndpoint],
    max_tokens: usize,
) -> Result<Vec<SelectedEndpoint>> {
    let candidates_json = serde_json::to_string_pretty(candidates)
        .map_err(|e| AppError::Selection(format!("failed to serialize candidates: {e}")))?;

    let prompt = format!(
        r#"Given this user query: "{query}"

And this list of pre-filtered API endpoints (top most relevant by retrieval):
{candidates_json}

Identify the MINIMAL set of API endpoints needed to fulfill the user's request. Prioritize:
1. Single endpoints that can accomplish the entire task
2. Batch operations over multiple single-item calls
3. The most efficient and direct approach

Important:
- Consider the descriptions and summaries of the endpoints to determine relevance.
- ONLY consider the pre-filtered endpoints provided above.
- Do NOT reference your own knowledge of APIs.

Return as few endpoints as possible - ideally just one if it can handle the request completely.

Return your response as a JSON list of objects with keys: path, method, summary, description.
Do NOT add your own summary or description, simply copy the relevant fields from the provided endpoints.
Only return the JSON, no other text."#
    );

    let response = model
        .complete(&prompt, max_tokens)
        .await
        .map_err(AppError::Selection)?;

    let selected: Vec<SelectedEndpoint> = parse_json_response(&response, '[', ']')
        .map_err(|e| AppError::Selection(format!("unparseable selection response: {e}")))?;

    if selected.is_empty() {
        return Err(AppError::Selection(
            "model selected no endpoints for the query".into(),
        ));
    }

    Ok(selected)
}

/// Ask the model to construct the final HTTP request from the selected
/// endpoints' full specs plus the component schemas they reference.
pub async fn construct_request(
    model: &dyn ChatModel,
    query: &str,
    selected: &[SelectedEndpoint],
    entry: &CacheEntry,
    max_tokens: usize,
) -> Result<HttpRequestSpec> {
    let empty = serde_json::Map::new();
    let paths = entry
        .spec
        .get("paths")
        .and_then(|p| p.as_object())
        .unwrap_or(&empty);
    let components = entry
        .spec
        .get("components")
        .and_then(|c| c.as_object())
        .unwrap_or(&empty);

    // Resolve each selection back to its full operation object. Selections
    // the model invented (not present in the spec) are dropped here.
    let mut full_specs = Vec::new();
    for endpoint in selected {
        let method = endpoint.method.to_ascii_lowercase();
        if let Some(op) = paths.get(&endpoint.path).and_then(|item| item.get(&method)) {
            full_specs.push(json!({
                "path": endpoint.path,
                "method": endpoint.method.to_ascii_uppercase(),
                "spec": op,
            }));
        } else {
            tracing::warn!(
                path = %endpoint.path,
                method = %endpoint.method,
                "Selected endpoint not present in specification, dropping"
            );
        }
    }

    if full_specs.is_empty() {
        return Err(AppError::Construction(
            "none of the selected endpoints exist in the specification".into(),
        ));
    }

    let limited_components = referenced_components(&full_specs, components);

    let full_specs_json = serde_json::to_string_pretty(&full_specs)
        .map_err(|e| AppError::Construction(format!("failed to serialize endpoint specs: {e}")))?;
    let components_json = serde_json::to_string_pretty(&limited_components)
        .map_err(|e| AppError::Construction(format!("failed to serialize components: {e}")))?;

    let prompt = format!(
        r#"Given this user query: "{query}"

And these API endpoint specifications:
{full_specs_json}

And these schema components for reference (limited):
{components_json}

Construct the most efficient HTTP request to fulfill the user's query. Choose batch endpoints over multiple single-item calls when possible.

Return your response as a JSON object with these keys:
- method: HTTP method (GET, POST, etc.)
- url: Full URL path
- headers: Required headers as object
- query_params: Query parameters as object (if any)
- body: Request body as object (if any)
- description: Brief explanation of what this request does

Only return the JSON, no other text."#
    );

    let response = model
        .complete(&prompt, max_tokens)
        .await
        .map_err(AppError::Construction)?;

    parse_json_response(&response, '{', '}')
        .map_err(|e| AppError::Construction(format!("unparseable construction response: {e}")))
}

/// Component schemas reachable from the endpoint specs, including
/// schema-to-schema references (transitive closure).
fn referenced_components(
    endpoint_specs: &[Value],
    components: &serde_json::Map<String, Value>,
) -> Value {
    let mut refs = BTreeSet::new();
    for spec in endpoint_specs {
        collect_schema_refs(spec, &mut refs);
    }

    if let Some(schemas) = components.get("schemas").and_then(|s| s.as_object()) {
        let mut to_check: Vec<String> = refs.iter().cloned().collect();
        while let Some(name) = to_check.pop() {
            if let Some(schema) = schemas.get(&name) {
                let mut nested = BTreeSet::new();
                collect_schema_refs(schema, &mut nested);
                for nested_ref in nested {
                    if refs.insert(nested_ref.clone()) {
                        to_check.push(nested_ref);
                    }
                }
            }
        }

        if !refs.is_empty() {
            let limited: serde_json::Map<String, Value> = refs
                .iter()
                .filter_map(|name| schemas.get(name).map(|s| (name.clone(), s.clone())))
                .collect();
            return json!({ "schemas": limited });
        }
    }

    json!({})
}

/// Recursively collect schema names from `$ref` values of the form
/// `#/components/schemas/<Name>`.
fn collect_schema_refs(value: &Value, refs: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if key == "$ref" {
                    if let Some(target) = val.as_str() {
                        if let Some(name) = target.strip_prefix("#/components/schemas/") {
                            refs.insert(name.to_string());
                        }
                    }
                } else {
                    collect_schema_refs(val, refs);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_schema_refs(item, refs);
            }
        }
        _ => {}
    }
}

/// Parse a JSON payload out of a model response. Tries the whole response
/// first, then falls back to the outermost `open`..`close` slice; models
/// occasionally wrap the JSON in prose despite instructions.
fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: &str,
    open: char,
    close: char,
) -> std::result::Result<T, String> {
    if let Ok(parsed) = serde_json::from_str(response.trim()) {
        return Ok(parsed);
    }

    let start = response.find(open).ok_or_else(|| {
        format!("no '{open}' found in response: {}", truncate(response, 200))
    })?;
    let end = response
        .rfind(close)
        .ok_or_else(|| format!("no '{close}' found in response"))?;
    if end < start {
        return Err("mismatched JSON delimiters in response".into());
    }

    serde_json::from_str(&response[start..=end]).map_err(|e| e.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_response_clean() {
        let parsed: Vec<SelectedEndpoint> =
            parse_json_response(r#"[{"path": "/users", "method": "GET"}]"#, '[', ']').unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, "/users");
        assert_eq!(parsed[0].summary, "");
    }

    #[test]
    fn test_parse_json_response_wrapped_in_prose() {
        let response = r#"Here is the selection you asked for:
[{"path": "/users", "method": "GET", "summary": "List users"}]
Let me know if you need anything else."#;

        let parsed: Vec<SelectedEndpoint> = parse_json_response(response, '[', ']').unwrap();
        assert_eq!(parsed[0].summary, "List users");
    }

    #[test]
    fn test_parse_json_response_object_fallback() {
        let response = "```json\n{\"method\": \"GET\", \"url\": \"/users\"}\n```";
        let parsed: HttpRequestSpec = parse_json_response(response, '{', '}').unwrap();

        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.url, "/users");
        assert!(parsed.headers.is_empty());
        assert!(parsed.body.is_none());
    }

    #[test]
    fn test_parse_json_response_no_json_is_error() {
        let result: std::result::Result<Vec<SelectedEndpoint>, String> =
            parse_json_response("I cannot help with that.", '[', ']');
        assert!(result.is_err());
    }

    #[test]
    fn test_collect_schema_refs_nested() {
        let spec = json!({
            "requestBody": {
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/User" }
                    }
                }
            },
            "responses": {
                "200": {
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/UserList" }
                            }
                        }
                    }
                }
            }
        });

        let mut refs = BTreeSet::new();
        collect_schema_refs(&spec, &mut refs);

        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec!["User".to_string(), "UserList".to_string()]
        );
    }

    #[test]
    fn test_collect_schema_refs_ignores_foreign_refs() {
        let spec = json!({ "schema": { "$ref": "#/components/parameters/PageSize" } });
        let mut refs = BTreeSet::new();
        collect_schema_refs(&spec, &mut refs);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_referenced_components_transitive_closure() {
        let endpoint_specs = vec![json!({
            "spec": { "schema": { "$ref": "#/components/schemas/Order" } }
        })];
        let components = json!({
            "schemas": {
                "Order": {
                    "properties": {
                        "items": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/LineItem" }
                        }
                    }
                },
                "LineItem": {
                    "properties": { "sku": { "type": "string" } }
                },
                "Unrelated": { "type": "object" }
            }
        });

        let limited = referenced_components(
            &endpoint_specs,
            components.as_object().unwrap(),
        );

        let schemas = limited["schemas"].as_object().unwrap();
        assert!(schemas.contains_key("Order"));
        assert!(schemas.contains_key("LineItem"));
        assert!(!schemas.contains_key("Unrelated"));
    }

    #[test]
    fn test_referenced_components_empty_when_no_refs() {
        let endpoint_specs = vec![json!({ "spec": { "summary": "plain" } })];
        let components = json!({ "schemas": { "A": {} } });

        let limited = referenced_components(&endpoint_specs, components.as_object().unwrap());
        assert_eq!(limited, json!({}));
    }
}
