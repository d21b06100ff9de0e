//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Observed request (url)
//!     → router.rs (iterate the stage's listeners)
//!     → pattern.rs (test each listener pattern against the url)
//!     → Return: matched listeners, or InvalidPattern
//! ```
//!
//! # Design Decisions
//! - The matcher sits behind a trait so hosts can plug in their own syntax
//! - Patterns compile once and are cached by the default matcher

pub mod pattern;
pub mod router;

pub use pattern::{ExtensionMatcher, MatchPattern, PatternMatcher};
pub use router::match_listeners;
