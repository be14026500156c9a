//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the backend instance list parses into a registry
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Require a token unless auth is explicitly disabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::{BackendRegistry, RegistryError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("auth.token is empty; set API_TOKEN or disable auth explicitly")]
    MissingToken,

    #[error("backends.instances: {0}")]
    Backends(#[from] RegistryError),

    #[error("listener.port must be non-zero")]
    ZeroPort,

    #[error("timeouts.connect_secs must be greater than zero")]
    ZeroConnectTimeout,

    #[error("timeouts.response_secs ({response}) must not be shorter than timeouts.connect_secs ({connect})")]
    ResponseBeforeConnect { response: u64, connect: u64 },

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.auth.disabled && config.auth.token.trim().is_empty() {
        errors.push(ValidationError::MissingToken);
    }

    if let Err(e) = BackendRegistry::parse(&config.backends.instances) {
        errors.push(e.into());
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    let timeouts = &config.timeouts;
    if timeouts.response_secs != 0 && timeouts.response_secs < timeouts.connect_secs {
        errors.push(ValidationError::ResponseBeforeConnect {
            response: timeouts.response_secs,
            connect: timeouts.connect_secs,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
