//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, subscription manager and dispatch produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Misuse (resolver on a fire-and-forget stage, resolver overwrite) is a
//!   warning event, never an error
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
