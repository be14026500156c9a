//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request
//!     → auth.rs (bearer token gate, 401 on failure)
//!     → [router + forwarder]
//!     → headers.rs (strip credentials and hop-by-hop headers)
//! ```
//!
//! # Design Decisions
//! - Every path is gated; there are no anonymous endpoints
//! - The gateway's own credentials never reach a backend

pub mod auth;
pub mod headers;

pub use auth::{require_bearer, AuthConfig, AuthError};
