//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → loader.rs (environment / CLI overrides)
//!     → validation.rs (semantic checks, all errors at once)
//!     → GatewayConfig::resolve()
//!     → GatewaySettings (auth, registry, timeouts; immutable)
//!     → shared via Arc with the request handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any configuration error is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError, ConfigOverrides};
pub use schema::{
    AuthSettings, BackendsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
