//! Response handling and error translation.
//!
//! # Responsibilities
//! - Map forwarding failures to gateway status codes
//! - Render the gateway's own JSON error bodies
//!
//! # Design Decisions
//! - Upstream statuses are never rewritten; only failures to reach the
//!   upstream produce gateway responses
//! - Connect failures map to 502, a missing response head to 504

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures of the forwarding pipeline for one request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Connection refused, DNS failure or connect timeout.
    #[error("cannot connect to backend '{backend}': {reason}")]
    Unreachable { backend: String, reason: String },

    /// Connected, but no response head arrived in time.
    #[error("backend '{backend}' timed out")]
    Timeout { backend: String },

    /// Connected, but the exchange failed before a response head.
    #[error("backend '{backend}' failed: {reason}")]
    Upstream { backend: String, reason: String },

    /// The upstream request could not be built.
    #[error("invalid upstream request: {0}")]
    Request(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unreachable { .. } | ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Unreachable { .. } => "unreachable",
            ProxyError::Timeout { .. } => "timeout",
            ProxyError::Upstream { .. } => "upstream",
            ProxyError::Request(_) => "request",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.kind(), &self.to_string())
    }
}

/// JSON error body: `{"error": {"type": .., "message": ..}}`.
pub fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "type": kind,
            "message": message,
        }
    });
    let mut response = (status, body.to_string()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
