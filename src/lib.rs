//! Multiplexing web-request interception layer.
//!
//! A host network stack offers one subscriber per request stage. This crate
//! sits on that single hook and fans each observed request out to any number
//! of listeners, selected by URL pattern, with a pluggable resolver deciding
//! which listener produces the stage's response.

pub mod alias;
pub mod config;
pub mod error;
pub mod host;
pub mod listener;
pub mod mux;
pub mod observability;
pub mod resolution;
pub mod routing;
pub mod rules;
pub mod stage;
pub mod subscription;

pub use error::{MuxError, MuxResult};
pub use host::{LocalHost, RequestDetail, StageResponse, UrlFilter, WebRequestHost};
pub use listener::{ActionResult, ContextOptions, Listener, ListenerId};
pub use mux::WebRequestMux;
pub use resolution::{Applier, Resolver};
pub use stage::Stage;
