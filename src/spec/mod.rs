//! Spec acquisition: fetching OpenAPI documents and extracting endpoints.

pub mod extract;
pub mod fetch;
pub mod types;

pub use extract::extract_endpoints;
pub use fetch::{HttpSpecFetcher, SpecFetcher};
pub use types::EndpointDescriptor;
