//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Split the request path into a selector segment and a remainder
//! - Look the selector up in the backend registry
//! - Fall back to the default backend with the path untouched
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) name lookup via the registry's HashMap
//! - Exact, case-sensitive match; no prefix matching
//! - A registry match always beats the default backend's own sub-routes

use std::sync::Arc;

use axum::http::uri::{InvalidUri, Uri};

use crate::routing::registry::{BackendInstance, BackendRegistry};

/// Result of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'a> {
    /// Backend chosen for the request.
    pub backend: &'a BackendInstance,
    /// Path forwarded upstream (selector stripped when matched).
    pub path: String,
    /// Query string, forwarded unmodified.
    pub query: Option<String>,
    /// True when the first segment selected the backend.
    pub selected_by_name: bool,
}

impl Route<'_> {
    /// Path plus query as sent on the upstream request line.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Absolute `http://host:port/path?query` URI.
    pub fn upstream_uri(&self) -> Result<Uri, InvalidUri> {
        format!("http://{}{}", self.backend.authority(), self.path_and_query()).parse()
    }
}

/// Table-driven path router over a [`BackendRegistry`].
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<BackendRegistry>,
}

impl Router {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve an inbound path (and optional query) to a backend and upstream path.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Route<'_> {
        let query = query.map(str::to_string);
        let (segment, remainder) = split_first_segment(path);

        if let Some(backend) = self.registry.get(segment) {
            let path = if remainder.is_empty() {
                "/".to_string()
            } else {
                remainder.to_string()
            };
            return Route {
                backend,
                path,
                query,
                selected_by_name: true,
            };
        }

        let path = if path.is_empty() { "/" } else { path };
        Route {
            backend: self.registry.default_backend(),
            path: path.to_string(),
            query,
            selected_by_name: false,
        }
    }

    /// Resolve using the path and query of a request URI.
    pub fn resolve_uri(&self, uri: &Uri) -> Route<'_> {
        self.resolve(uri.path(), uri.query())
    }
}

/// `/ollama2/api/generate` → (`ollama2`, `/api/generate`).
fn split_first_segment(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(index) => (&trimmed[..index], &trimmed[index..]),
        None => (trimmed, ""),
    }
}
