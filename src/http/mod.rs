//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, auth layers)
//!     → [routing table picks backend and path]
//!     → forward.rs (request pump → upstream, upstream → response pump)
//!     → response.rs (gateway error bodies on failure)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forwarder, Phase};
pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::{GatewayServer, GatewaySettings};
