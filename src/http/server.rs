//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, bearer auth)
//! - Dispatch requests to the routing table
//! - Forward requests to upstream backends
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::forward::{Forwarder, Phase};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::resilience::TimeoutPolicy;
use crate::routing::{BackendRegistry, Router as PathRouter};
use crate::security::{require_bearer, AuthConfig};

/// Resolved, immutable inputs of the gateway core.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub auth: Arc<AuthConfig>,
    pub registry: Arc<BackendRegistry>,
    pub timeouts: TimeoutPolicy,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PathRouter>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Create a new gateway server from resolved settings.
    pub fn new(settings: GatewaySettings) -> Self {
        let state = AppState {
            router: Arc::new(PathRouter::new(settings.registry.clone())),
            forwarder: Arc::new(Forwarder::new(settings.timeouts)),
        };

        for backend in settings.registry.iter() {
            tracing::info!(backend = %backend, "Configured backend");
        }
        tracing::info!(
            default_backend = %settings.registry.default_backend().name(),
            auth = %settings.auth.masked(),
            connect_timeout = ?settings.timeouts.connect,
            response_timeout = ?settings.timeouts.response,
            idle_read_timeout = ?settings.timeouts.idle_read,
            "Gateway configured"
        );
        if !settings.auth.is_enforced() {
            tracing::warn!("Authentication is disabled; every request will be proxied");
        }

        let router = Self::build_router(&settings, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(settings: &GatewaySettings, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .layer(middleware::from_fn_with_state(settings.auth.clone(), require_bearer))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
            .with_state(state)
    }

    /// The finished handler, for embedding or tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
/// Resolves the backend from the path and streams the exchange.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();

    let route = state.router.resolve_uri(request.uri());
    let backend = route.backend.name().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        backend = %backend,
        target = %route.path_and_query(),
        selected_by_name = route.selected_by_name,
        phase = ?Phase::Routed,
        "Routed request"
    );

    match state.forwarder.forward(&route, request, &request_id).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), &backend, start_time);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                backend = %backend,
                status = status.as_u16(),
                "Proxying response"
            );
            response
        }
        Err(err) => {
            metrics::record_upstream_error(err.kind(), &backend);
            metrics::record_request(method.as_str(), err.status().as_u16(), &backend, start_time);
            tracing::error!(
                request_id = %request_id,
                method = %method,
                backend = %backend,
                error = %err,
                phase = ?Phase::Failed,
                "Upstream request failed"
            );
            err.into_response()
        }
    }
}
