//! Listener registry subsystem.
//!
//! # Data Flow
//! ```text
//! add_listener(stage, filter, action, context)
//!     → registry.rs (assign id + order, store under stage)
//!     → filters.rs (recompute union of the stage's patterns)
//!     → SubscriptionManager reinstalls the host hook
//!
//! remove_listener / clear_listeners
//!     → registry.rs (drop listener(s))
//!     → filters.rs (recompute, or drop when the stage is empty)
//! ```
//!
//! # Design Decisions
//! - Listeners are immutable; re-registration creates a new id
//! - The filter set is derived state and never stored apart from the registry

pub mod filters;
pub mod model;
pub mod registry;

pub use filters::FilterSet;
pub use model::{
    Action, ActionError, ActionResult, ContextOptions, Listener, ListenerContext, ListenerId,
    SharedAction,
};
pub use registry::{ListenerRegistry, Removal};
