//! Resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Matched listeners for a request
//!     → applier.rs (one deferred unit of work per listener)
//!     → engine.rs:
//!         response-producing stage + completion
//!             → resolver.rs (pick/combine appliers, await result)
//!             → completion(response) if one was produced
//!         otherwise
//!             → spawn every applier, return without waiting
//! ```
//!
//! # Design Decisions
//! - Appliers are lazy so the resolver decides what actually runs
//! - Default policy: most recently registered listener wins
//! - Applier failures are logged and counted in both paths; only the
//!   response path has someone to return them to

pub mod applier;
pub mod engine;
pub mod resolver;

pub use applier::Applier;
pub use engine::Outcome;
pub use resolver::{HighestPriority, LatestRegistered, Resolver, ResolverFuture, ResolverKind};
