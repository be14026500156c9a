//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (split first segment, table lookup)
//!     → registry.rs (name → backend, default backend)
//!     → Return: Route { backend, forwarded path, query }
//!
//! Registry Construction (at startup):
//!     "name:host:port,..."
//!     → Parse entries
//!     → Reject empty / malformed / duplicate
//!     → Freeze as immutable BackendRegistry
//! ```
//!
//! # Design Decisions
//! - Registry built once at startup, immutable at runtime
//! - Deterministic: same path always resolves to the same backend
//! - Unmatched first segment falls back to the default backend

pub mod registry;
pub mod router;

pub use registry::{BackendInstance, BackendRegistry, RegistryError};
pub use router::{Route, Router};
