//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::http::server::GatewaySettings;
use crate::resilience::TimeoutPolicy;
use crate::routing::BackendRegistry;
use crate::security::AuthConfig;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        ConfigError::Validation(vec![err])
    }
}

/// Values supplied on the command line or through the environment.
///
/// Every field left as `None` keeps the file (or default) value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub token: Option<String>,
    pub disable_auth: bool,
    pub instances: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub log_level: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub response_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub metrics_address: Option<String>,
}

impl GatewayConfig {
    /// Layer overrides on top of this configuration.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(token) = overrides.token {
            self.auth.token = token;
        }
        if overrides.disable_auth {
            self.auth.disabled = true;
        }
        if let Some(instances) = overrides.instances {
            self.backends.instances = instances;
        }
        if let Some(host) = overrides.host {
            self.listener.host = host;
        }
        if let Some(port) = overrides.port {
            self.listener.port = port;
        }
        if let Some(debug) = overrides.debug {
            self.observability.debug = debug;
        }
        if let Some(level) = overrides.log_level {
            self.observability.log_level = level;
        }
        if let Some(secs) = overrides.connect_timeout_secs {
            self.timeouts.connect_secs = secs;
        }
        if let Some(secs) = overrides.response_timeout_secs {
            self.timeouts.response_secs = secs;
        }
        if let Some(secs) = overrides.idle_timeout_secs {
            self.timeouts.idle_read_secs = secs;
        }
        if let Some(address) = overrides.metrics_address {
            self.observability.metrics_enabled = true;
            self.observability.metrics_address = address;
        }
    }

    /// Build the immutable settings the gateway core runs on.
    pub fn resolve(&self) -> Result<GatewaySettings, ConfigError> {
        validate_config(self).map_err(ConfigError::Validation)?;

        let auth = if self.auth.disabled {
            AuthConfig::Disabled
        } else {
            AuthConfig::bearer(&self.auth.token).map_err(|_| ValidationError::MissingToken)?
        };
        let registry = BackendRegistry::parse(&self.backends.instances)
            .map_err(ValidationError::from)?;
        let timeouts = TimeoutPolicy::from_secs(
            self.timeouts.connect_secs,
            self.timeouts.response_secs,
            self.timeouts.idle_read_secs,
        );

        Ok(GatewaySettings {
            auth: Arc::new(auth),
            registry: Arc::new(registry),
            timeouts,
        })
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Defaults, then the optional file, then overrides; validated.
pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_overrides(overrides);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
