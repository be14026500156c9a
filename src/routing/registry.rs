//! Backend registry.
//!
//! # Responsibilities
//! - Parse `name:host:port` instance lists into backends
//! - Keep backends in configuration order
//! - Designate exactly one default backend
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc, no locks)
//! - An instance literally named `default` wins the default slot,
//!   otherwise the first configured instance does
//! - Two-part `name:port` entries are shorthand for `name:localhost:port`

use std::collections::HashMap;
use std::fmt;

/// Name that always claims the default slot when present.
pub const DEFAULT_BACKEND_NAME: &str = "default";

/// Host assumed for `name:port` shorthand entries.
const SHORTHAND_HOST: &str = "localhost";

/// Errors raised while building the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no backend instances configured")]
    Empty,

    #[error("malformed backend entry '{entry}': {reason}")]
    Malformed { entry: String, reason: &'static str },

    #[error("duplicate backend name '{0}'")]
    Duplicate(String),
}

/// One addressable upstream LLM server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInstance {
    name: String,
    host: String,
    port: u16,
}

impl BackendInstance {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Parse a single `name:host:port` (or `name:port`) entry.
    pub fn parse(entry: &str) -> Result<Self, RegistryError> {
        let entry = entry.trim();
        let malformed = |reason| RegistryError::Malformed {
            entry: entry.to_string(),
            reason,
        };

        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let (name, host, port) = match parts.as_slice() {
            [name, host, port] => (*name, *host, *port),
            [name, port] => (*name, SHORTHAND_HOST, *port),
            _ => return Err(malformed("expected name:host:port")),
        };

        if name.is_empty() {
            return Err(malformed("empty name"));
        }
        if name.contains('/') {
            return Err(malformed("name must not contain '/'"));
        }
        if host.is_empty() {
            return Err(malformed("empty host"));
        }
        let port: u16 = port.parse().map_err(|_| malformed("invalid port"))?;
        if port == 0 {
            return Err(malformed("port must be non-zero"));
        }

        Ok(Self::new(name, host, port))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` authority used in upstream URIs.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BackendInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (http://{}:{})", self.name, self.host, self.port)
    }
}

/// Ordered, read-only set of backends with one default.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: Vec<BackendInstance>,
    by_name: HashMap<String, usize>,
    default_index: usize,
}

impl BackendRegistry {
    /// Build a registry from already-parsed instances.
    pub fn new(backends: Vec<BackendInstance>) -> Result<Self, RegistryError> {
        if backends.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_name = HashMap::with_capacity(backends.len());
        for (index, backend) in backends.iter().enumerate() {
            if by_name.insert(backend.name.clone(), index).is_some() {
                return Err(RegistryError::Duplicate(backend.name.clone()));
            }
        }

        let default_index = by_name.get(DEFAULT_BACKEND_NAME).copied().unwrap_or(0);

        Ok(Self {
            backends,
            by_name,
            default_index,
        })
    }

    /// Parse a comma-separated instance list.
    ///
    /// Blank entries (e.g. a trailing comma) are ignored.
    pub fn parse(list: &str) -> Result<Self, RegistryError> {
        let backends = list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(BackendInstance::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends)
    }

    /// Exact, case-sensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&BackendInstance> {
        self.by_name.get(name).map(|&index| &self.backends[index])
    }

    pub fn default_backend(&self) -> &BackendInstance {
        &self.backends[self.default_index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendInstance> {
        self.backends.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(BackendInstance::name).collect()
    }
}
