//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (connect deadline on the connector)
//!     → timeouts.rs (response-head deadline around the call)
//!     → timeouts.rs (idle-read deadline between body chunks)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every connect has a deadline
//! - No retries: requests may carry streamed, non-replayable bodies
//! - A failing backend affects only the request that used it

pub mod timeouts;

pub use timeouts::TimeoutPolicy;
