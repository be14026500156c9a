//! Authenticating streaming gateway for LLM backends.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::{GatewayServer, GatewaySettings};
pub use lifecycle::Shutdown;
