//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the per-upstream-request deadlines
//! - Wrap futures with an optional deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Connect timeout is always set; response and idle-read are optional
//! - A missing response head results in 504 Gateway Timeout; an idle
//!   stream after the head is cut short instead

use std::future::Future;
use std::time::Duration;

/// Deadlines applied to every upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// TCP connect (including DNS) deadline.
    pub connect: Duration,
    /// Deadline from sending the request to receiving the response head.
    pub response: Option<Duration>,
    /// Longest allowed silence between two body chunks.
    pub idle_read: Option<Duration>,
}

impl TimeoutPolicy {
    /// Build from whole seconds; `0` disables response and idle-read deadlines.
    pub fn from_secs(connect: u64, response: u64, idle_read: u64) -> Self {
        let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            connect: Duration::from_secs(connect),
            response: optional(response),
            idle_read: optional(idle_read),
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_secs(10, 300, 300)
    }
}

/// Run `future`, giving up after `limit` if one is set.
///
/// Returns `None` when the deadline elapsed.
pub async fn within<F: Future>(limit: Option<Duration>, future: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}
