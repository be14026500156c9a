//! Streaming forwarder.
//!
//! # Responsibilities
//! - Issue the upstream request with the client's method, headers and body
//! - Relay the upstream status, headers and body back to the client
//! - Translate connect and timeout failures into gateway errors
//!
//! # Design Decisions
//! - Two pumps over chunk streams: client → upstream for the request body,
//!   upstream → client for the response body; neither buffers more than
//!   one chunk
//! - The response head is returned as soon as the upstream sends it
//! - The response-head deadline starts once the request body is fully
//!   sent, so slow uploads are never cut short; connecting is bounded by
//!   the connector's own timeout
//! - Dropping the response pump (client went away) drops the upstream body,
//!   which closes the upstream connection instead of draining it
//! - Failures after the head has been sent end the body with an error; the
//!   client sees a truncated stream

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::task::Poll;
use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    http::Request,
    response::Response,
};
use futures_util::{stream, StreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client, ResponseFuture},
    rt::TokioExecutor,
};
use tokio::sync::oneshot;

use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::resilience::timeouts::{within, TimeoutPolicy};
use crate::routing::Route;
use crate::security::headers::{client_response_headers, upstream_request_headers};

/// HTTP/1.1 client used for every upstream call.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Per-request lifecycle, logged as the request moves through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Received,
    Authenticated,
    Routed,
    ConnectingUpstream,
    Streaming,
    Complete,
    Failed,
}

/// Build the pooled upstream client with the connect deadline applied.
pub fn build_client(timeouts: &TimeoutPolicy) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(timeouts.connect));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Executes upstream calls for routed requests.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    timeouts: TimeoutPolicy,
}

impl Forwarder {
    pub fn new(timeouts: TimeoutPolicy) -> Self {
        Self {
            client: build_client(&timeouts),
            timeouts,
        }
    }

    /// Forward `request` to the routed backend and return the streaming response.
    pub async fn forward(
        &self,
        route: &Route<'_>,
        request: Request<Body>,
        request_id: &str,
    ) -> Result<Response, ProxyError> {
        let backend = route.backend.name();
        let uri = route
            .upstream_uri()
            .map_err(|e| ProxyError::Request(e.to_string()))?;

        let (parts, body) = request.into_parts();
        let (body_sent, upload_done) = oneshot::channel();
        let mut upstream = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(request_pump(body, backend, request_id, body_sent))
            .map_err(|e| ProxyError::Request(e.to_string()))?;
        *upstream.headers_mut() = upstream_request_headers(&parts.headers);

        tracing::debug!(
            request_id = %request_id,
            backend = %backend,
            uri = %upstream.uri(),
            phase = ?Phase::ConnectingUpstream,
            "Sending upstream request"
        );

        let exchange = self.client.request(upstream);
        let response = match await_head(exchange, upload_done, self.timeouts.response).await {
            Some(Ok(response)) => response,
            Some(Err(e)) if e.is_connect() => {
                return Err(ProxyError::Unreachable {
                    backend: backend.to_string(),
                    reason: error_chain(&e),
                });
            }
            Some(Err(e)) => {
                return Err(ProxyError::Upstream {
                    backend: backend.to_string(),
                    reason: error_chain(&e),
                });
            }
            None => {
                return Err(ProxyError::Timeout {
                    backend: backend.to_string(),
                });
            }
        };

        let (mut parts, body) = response.into_parts();
        parts.headers = client_response_headers(&parts.headers);

        tracing::debug!(
            request_id = %request_id,
            backend = %backend,
            status = parts.status.as_u16(),
            phase = ?Phase::Streaming,
            "Upstream responded"
        );

        let tracker = StreamTracker::new(backend, request_id);
        let body = response_pump(Body::new(body), self.timeouts.idle_read, tracker);
        Ok(Response::from_parts(parts, body))
    }
}

/// Wait for the response head.
///
/// The deadline applies from the end of the upload (or from the moment the
/// body is dropped, if the upload aborted). A backend may answer before it
/// has read the whole body; that response is taken as is.
async fn await_head(
    mut exchange: ResponseFuture,
    upload_done: oneshot::Receiver<()>,
    limit: Option<Duration>,
) -> Option<<ResponseFuture as Future>::Output> {
    tokio::select! {
        result = &mut exchange => return Some(result),
        _ = upload_done => {}
    }
    within(limit, exchange).await
}

/// `outer: inner: innermost` for hyper's nested errors.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Client → upstream pump. Chunks are passed on as they are read.
///
/// `body_sent` fires once the last chunk has been handed to the upstream
/// connection.
fn request_pump(
    body: Body,
    backend: &str,
    request_id: &str,
    body_sent: oneshot::Sender<()>,
) -> Body {
    if body.is_end_stream() {
        let _ = body_sent.send(());
        return Body::empty();
    }

    let backend = backend.to_string();
    let request_id = request_id.to_string();
    let mut bytes: u64 = 0;
    let mut body_sent = Some(body_sent);

    let chunks = body.into_data_stream().map(move |chunk| match chunk {
        Ok(chunk) => {
            bytes += chunk.len() as u64;
            Ok(chunk)
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                backend = %backend,
                bytes_forwarded = bytes,
                error = %e,
                "Client request body aborted"
            );
            Err(io::Error::other(e))
        }
    });
    let end = stream::poll_fn(move |_| -> Poll<Option<Result<Bytes, io::Error>>> {
        if let Some(tx) = body_sent.take() {
            let _ = tx.send(());
        }
        Poll::Ready(None)
    });
    Body::from_stream(chunks.chain(end))
}

/// Outcome bookkeeping for one relayed response body.
///
/// Dropped without an outcome means the client went away mid-stream.
struct StreamTracker {
    backend: String,
    request_id: String,
    chunks: u64,
    bytes: u64,
    finished: bool,
}

impl StreamTracker {
    fn new(backend: &str, request_id: &str) -> Self {
        Self {
            backend: backend.to_string(),
            request_id: request_id.to_string(),
            chunks: 0,
            bytes: 0,
            finished: false,
        }
    }

    fn record(&mut self, chunk: &Bytes) {
        self.chunks += 1;
        self.bytes += chunk.len() as u64;
        if self.chunks % 10 == 0 {
            tracing::trace!(request_id = %self.request_id, chunks = self.chunks, "Streaming");
        }
    }

    fn complete(&mut self) {
        self.finished = true;
        tracing::debug!(
            request_id = %self.request_id,
            backend = %self.backend,
            chunks = self.chunks,
            bytes = self.bytes,
            phase = ?Phase::Complete,
            "Stream complete"
        );
        metrics::record_stream(&self.backend, "complete", self.bytes);
    }

    fn interrupted(&mut self, reason: &str) {
        self.finished = true;
        tracing::warn!(
            request_id = %self.request_id,
            backend = %self.backend,
            chunks = self.chunks,
            bytes = self.bytes,
            reason = %reason,
            phase = ?Phase::Failed,
            "Upstream stream interrupted"
        );
        metrics::record_stream(&self.backend, "interrupted", self.bytes);
    }
}

impl Drop for StreamTracker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::info!(
            request_id = %self.request_id,
            backend = %self.backend,
            chunks = self.chunks,
            bytes = self.bytes,
            phase = ?Phase::Failed,
            "Client disconnected mid-stream, closing upstream connection"
        );
        metrics::record_stream(&self.backend, "client_closed", self.bytes);
    }
}

struct ResponsePump {
    chunks: axum::body::BodyDataStream,
    idle_read: Option<Duration>,
    tracker: StreamTracker,
    done: bool,
}

/// Upstream → client pump. Each chunk is yielded as soon as it arrives.
fn response_pump(body: Body, idle_read: Option<Duration>, tracker: StreamTracker) -> Body {
    let pump = ResponsePump {
        chunks: body.into_data_stream(),
        idle_read,
        tracker,
        done: false,
    };

    Body::from_stream(stream::unfold(pump, |mut pump| async move {
        if pump.done {
            return None;
        }
        match within(pump.idle_read, pump.chunks.next()).await {
            Some(Some(Ok(chunk))) => {
                pump.tracker.record(&chunk);
                Some((Ok(chunk), pump))
            }
            Some(None) => {
                pump.tracker.complete();
                None
            }
            Some(Some(Err(e))) => {
                pump.tracker.interrupted(&e.to_string());
                pump.done = true;
                Some((Err(io::Error::other(e)), pump))
            }
            None => {
                pump.tracker.interrupted("idle read timeout");
                pump.done = true;
                let err = io::Error::new(io::ErrorKind::TimedOut, "upstream idle read timeout");
                Some((Err(err), pump))
            }
        }
    }))
}
