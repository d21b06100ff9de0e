//! Stage subscription management.
//!
//! # Data Flow
//! ```text
//! Registry mutation for a stage
//!     → manager.rs reconcile(stage, filter set)
//!         non-empty → host.subscribe(stage, filter + dispatch)   (replaces previous)
//!         empty     → host.subscribe(stage, None)
//! ```
//!
//! # Design Decisions
//! - Many logical listeners, one physical host subscription per stage
//! - The dispatch entry point holds a weak handle to the mux, so the host
//!   never keeps the mux alive

pub mod manager;

pub use manager::SubscriptionManager;
