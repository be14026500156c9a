//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use llm_gateway::resilience::TimeoutPolicy;
use llm_gateway::routing::BackendRegistry;
use llm_gateway::security::AuthConfig;
use llm_gateway::{GatewayServer, GatewaySettings, Shutdown};

pub const TOKEN: &str = "test-token-0123456789";

/// A running gateway; shuts down when dropped.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn fast_timeouts() -> TimeoutPolicy {
    TimeoutPolicy {
        connect: Duration::from_secs(2),
        response: Some(Duration::from_secs(5)),
        idle_read: Some(Duration::from_secs(5)),
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(instances: &str, timeouts: TimeoutPolicy) -> TestGateway {
    let settings = GatewaySettings {
        auth: Arc::new(AuthConfig::bearer(TOKEN).unwrap()),
        registry: Arc::new(BackendRegistry::parse(instances).unwrap()),
        timeouts,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(settings);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Counts every request a mock backend saw.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Backend that echoes what it received as JSON.
///
/// `/missing...` answers 404 with an Ollama-style error body.
pub async fn start_echo_backend() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new().fallback(echo).with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, hits)
}

async fn echo(State(hits): State<Hits>, request: Request) -> Response {
    hits.0.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    if parts.uri.path().starts_with("/missing") {
        return (
            StatusCode::NOT_FOUND,
            [("content-type", "application/json")],
            r#"{"error":"model 'missing' not found"}"#,
        )
            .into_response();
    }

    let body = axum::body::to_bytes(body, 64 * 1024 * 1024).await.unwrap();
    let headers: Map<String, Value> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v.to_str().unwrap_or_default())))
        .collect();

    let echo = json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body_len": body.len(),
        "body": String::from_utf8_lossy(&body),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(Body::from(echo.to_string()))
        .unwrap()
}

/// Read and discard the request head.
async fn read_request_head(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn http_chunk(data: &str) -> String {
    format!("{:x}\r\n{}\r\n", data.len(), data)
}

const STREAM_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n";

/// Streams `first`, waits for `release`, then streams `last` and ends.
pub async fn start_gated_stream_backend(
    first: &'static str,
    last: &'static str,
    release: Arc<Notify>,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let release = release.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let _ = socket.write_all(STREAM_HEAD.as_bytes()).await;
                let _ = socket.write_all(http_chunk(first).as_bytes()).await;
                let _ = socket.flush().await;

                release.notified().await;

                let _ = socket.write_all(http_chunk(last).as_bytes()).await;
                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Streams a chunk every 50ms until a write fails, then sets `closed`.
pub async fn start_endless_stream_backend(closed: Arc<AtomicBool>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed = closed.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                if socket.write_all(STREAM_HEAD.as_bytes()).await.is_err() {
                    closed.store(true, Ordering::SeqCst);
                    return;
                }
                let line = http_chunk("{\"response\":\"token\",\"done\":false}\n");
                loop {
                    if socket.write_all(line.as_bytes()).await.is_err() {
                        closed.store(true, Ordering::SeqCst);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            });
        }
    });

    addr
}

/// Sends the head and one chunk, then goes silent without closing.
pub async fn start_stalling_stream_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let _ = socket.write_all(STREAM_HEAD.as_bytes()).await;
                let _ = socket.write_all(http_chunk("{\"response\":\"a\"}\n").as_bytes()).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    addr
}

/// Accepts connections and reads requests but never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
