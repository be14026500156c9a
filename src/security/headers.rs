//! Header filtering across the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop the gateway's own credentials and the inbound `Host`
//! - Honour extra hop-by-hop names listed in `Connection`

use axum::http::{header, HeaderMap, HeaderName};

/// Headers meaningful for a single connection leg only.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name == PROXY_CONNECTION
}

/// Names listed in the `Connection` header (e.g. `Connection: close, x-foo`).
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

fn copy_filtered(from: &HeaderMap, skip: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let listed = connection_listed(from);
    let mut out = HeaderMap::with_capacity(from.len());
    for (name, value) in from.iter() {
        if is_hop_by_hop(name) || listed.contains(name) || skip(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Client headers as they should reach the backend.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    copy_filtered(inbound, |name| {
        name == header::HOST || name == header::AUTHORIZATION
    })
}

/// Backend headers as they should reach the client.
pub fn client_response_headers(upstream: &HeaderMap) -> HeaderMap {
    copy_filtered(upstream, |_| false)
}
