//! Authentication and routing tests against live mock backends.

use std::time::Duration;

use serde_json::Value;

use llm_gateway::resilience::TimeoutPolicy;

mod common;

use common::{client, fast_timeouts, start_echo_backend, start_gateway, TOKEN};

#[tokio::test]
async fn test_missing_credentials_never_reach_backend() {
    let (backend, hits) = start_echo_backend().await;
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    for path in ["/", "/health", "/api/tags", "/default/api/tags"] {
        let res = client().get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), 401, "{path} should require auth");
        assert_eq!(res.headers()["www-authenticate"], "Bearer");
        assert!(res.headers().contains_key("x-request-id"));

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"]["message"], "missing credentials");
    }

    assert_eq!(hits.count(), 0, "backend must not be contacted");
}

#[tokio::test]
async fn test_invalid_credentials_rejected() {
    let (backend, hits) = start_echo_backend().await;
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    let attempts = [
        "Bearer wrong-token".to_string(),
        format!("Bearer {TOKEN}x"),
        format!("Basic {TOKEN}"),
        TOKEN.to_string(),
    ];
    for value in attempts {
        let res = client()
            .post(gateway.url("/api/generate"))
            .header("authorization", value.as_str())
            .body(r#"{"model":"llama3","prompt":"hi"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 401, "{value} should be rejected");

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"]["message"], "invalid credentials");
    }

    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn test_routes_by_first_segment() {
    let (default_backend, default_hits) = start_echo_backend().await;
    let (alt_backend, alt_hits) = start_echo_backend().await;
    let gateway = start_gateway(
        &format!(
            "default:127.0.0.1:{},alt:127.0.0.1:{}",
            default_backend.port(),
            alt_backend.port()
        ),
        fast_timeouts(),
    )
    .await;

    let fetch = |path: &'static str| {
        let url = gateway.url(path);
        async move {
            let res = client().get(url).bearer_auth(TOKEN).send().await.unwrap();
            assert_eq!(res.status(), 200, "{path}");
            res.json::<Value>().await.unwrap()
        }
    };

    let echo = fetch("/api/tags").await;
    assert_eq!(echo["path"], "/api/tags");
    assert_eq!(echo["headers"]["host"], format!("127.0.0.1:{}", default_backend.port()));

    let echo = fetch("/alt/api/tags").await;
    assert_eq!(echo["path"], "/api/tags");
    assert_eq!(echo["headers"]["host"], format!("127.0.0.1:{}", alt_backend.port()));

    let echo = fetch("/unknownname/api/tags").await;
    assert_eq!(echo["path"], "/unknownname/api/tags");
    assert_eq!(echo["headers"]["host"], format!("127.0.0.1:{}", default_backend.port()));

    let echo = fetch("/alt").await;
    assert_eq!(echo["path"], "/");

    assert_eq!(default_hits.count(), 2);
    assert_eq!(alt_hits.count(), 2);
}

#[tokio::test]
async fn test_forwards_method_query_body_and_filters_headers() {
    let (backend, _) = start_echo_backend().await;
    let gateway = start_gateway(&format!("ollama1:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    let body = r#"{"model":"llama3","prompt":"Why is the sky blue?","stream":false}"#;
    let res = client()
        .post(gateway.url("/ollama1/api/generate?keep_alive=5m"))
        .bearer_auth(TOKEN)
        .header("content-type", "application/json")
        .header("x-client-tag", "integration")
        .header("x-request-id", "req-42")
        .header("connection", "keep-alive, x-hop")
        .header("x-hop", "drop-me")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/api/generate");
    assert_eq!(echo["query"], "keep_alive=5m");
    assert_eq!(echo["body"], body);
    assert_eq!(echo["headers"]["content-type"], "application/json");
    assert_eq!(echo["headers"]["x-client-tag"], "integration");
    assert_eq!(echo["headers"]["x-request-id"], "req-42");
    assert!(echo["headers"].get("authorization").is_none());
    assert!(echo["headers"].get("x-hop").is_none());
}

#[tokio::test]
async fn test_all_methods_proxied() {
    let (backend, hits) = start_echo_backend().await;
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    for method in ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"] {
        let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
        let res = client()
            .request(method.clone(), gateway.url("/api/delete"))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let echo: Value = res.json().await.unwrap();
        assert_eq!(echo["method"], method.as_str());
    }

    assert_eq!(hits.count(), 6);
}

#[tokio::test]
async fn test_upstream_errors_pass_through() {
    let (backend, _) = start_echo_backend().await;
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    let res = client()
        .post(gateway.url("/missing/api/show"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"error":"model 'missing' not found"}"#);
}

#[tokio::test]
async fn test_streamed_request_body() {
    let (backend, _) = start_echo_backend().await;
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), fast_timeouts()).await;

    // 4 MiB uploaded in 64 KiB chunks without a Content-Length.
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        (0..64).map(|_| Ok(vec![b'x'; 64 * 1024])).collect();
    let body = reqwest::Body::wrap_stream(futures_util::stream::iter(chunks));

    let res = client()
        .post(gateway.url("/api/blobs/sha256-test"))
        .bearer_auth(TOKEN)
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["body_len"], 4 * 1024 * 1024);
}

#[tokio::test]
async fn test_slow_upload_is_not_a_timeout() {
    let (backend, hits) = start_echo_backend().await;
    let timeouts = TimeoutPolicy {
        response: Some(Duration::from_millis(500)),
        ..fast_timeouts()
    };
    let gateway = start_gateway(&format!("default:127.0.0.1:{}", backend.port()), timeouts).await;

    // 4 KiB trickled in over ~1.2s, well past the response-head deadline.
    let chunks = futures_util::stream::unfold(0, |sent| async move {
        if sent == 4 {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        Some((Ok::<_, std::io::Error>(vec![b'x'; 1024]), sent + 1))
    });

    let res = client()
        .post(gateway.url("/api/blobs/sha256-slow"))
        .bearer_auth(TOKEN)
        .body(reqwest::Body::wrap_stream(chunks))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["body_len"], 4 * 1024);
    assert_eq!(hits.count(), 1);
}
