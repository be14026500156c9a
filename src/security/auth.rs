//! Bearer-token authentication gate.
//!
//! # Responsibilities
//! - Validate `Authorization: Bearer <token>` on every request
//! - Reject before routing (401 + `WWW-Authenticate: Bearer`)
//!
//! # Design Decisions
//! - Stateless: re-validated per request, no sessions
//! - Token comparison is constant-time (`subtle`)
//! - Disabling auth requires an explicit opt-in at startup

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::http::forward::Phase;
use crate::http::response::error_response;
use crate::observability::metrics;

const BEARER_SCHEME: &str = "bearer";

/// Why a request was rejected by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,

    #[error("invalid credentials")]
    Invalid,
}

impl AuthError {
    fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid => "invalid",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = error_response(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            &self.to_string(),
        );
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

/// Rejected at startup: an enforced gate needs a secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("authentication token must not be empty")]
pub struct EmptyTokenError;

/// The configured secret, or an explicit opt-out.
#[derive(Clone)]
pub enum AuthConfig {
    Bearer(Arc<str>),
    Disabled,
}

impl AuthConfig {
    pub fn bearer(token: impl AsRef<str>) -> Result<Self, EmptyTokenError> {
        let token = token.as_ref();
        if token.trim().is_empty() {
            return Err(EmptyTokenError);
        }
        Ok(AuthConfig::Bearer(Arc::from(token)))
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, AuthConfig::Bearer(_))
    }

    /// Check the raw `Authorization` header value.
    pub fn verify(&self, authorization: Option<&HeaderValue>) -> Result<(), AuthError> {
        let expected = match self {
            AuthConfig::Bearer(token) => token,
            AuthConfig::Disabled => return Ok(()),
        };

        let value = authorization.ok_or(AuthError::Missing)?;
        let presented = bearer_token(value).ok_or(AuthError::Invalid)?;

        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }

    /// Masked form of the token for startup logs.
    pub fn masked(&self) -> String {
        match self {
            AuthConfig::Bearer(token) => mask_token(token),
            AuthConfig::Disabled => "<disabled>".to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Bearer(_) => f.debug_tuple("Bearer").field(&self.masked()).finish(),
            AuthConfig::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Extract `<token>` from `Bearer <token>`. Scheme is case-insensitive;
/// everything after the single separating space is the token.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    (!token.is_empty()).then_some(token)
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

/// Axum middleware enforcing the gate ahead of routing.
pub async fn require_bearer(
    State(auth): State<Arc<AuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        phase = ?Phase::Received,
        "Request received"
    );

    match auth.verify(request.headers().get(header::AUTHORIZATION)) {
        Ok(()) => {
            tracing::debug!(phase = ?Phase::Authenticated, "Credentials accepted");
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = err.reason(),
                "Rejected unauthenticated request"
            );
            metrics::record_auth_failure(err.reason());
            err.into_response()
        }
    }
}
