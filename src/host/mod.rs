//! Host network stack interface.
//!
//! # Data Flow
//! ```text
//! SubscriptionManager
//!     → WebRequestHost::subscribe(stage, Some(filter + dispatch))   (install/replace)
//!     → WebRequestHost::subscribe(stage, None)                      (clear)
//!
//! Host observes a request matching the installed filter:
//!     → dispatch(RequestDetail, Option<Completion>)
//!     → Completion(StageResponse) called at most once
//! ```
//!
//! # Design Decisions
//! - The host holds at most one subscription per stage; installing replaces
//! - Completion is only offered on response-producing stages
//! - Dispatch returns a future so failures surface at the host boundary

pub mod detail;
pub mod local;

use std::fmt;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::MuxResult;
use crate::stage::Stage;

pub use detail::{RequestDetail, StageResponse};
pub use local::{LocalHost, SubscriptionEvent};

/// URL patterns a subscription is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UrlFilter {
    pub urls: Vec<String>,
}

impl UrlFilter {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

/// One-shot completion handed to the dispatch entry point.
pub type Completion = Box<dyn FnOnce(StageResponse) + Send>;

/// Future returned by a dispatch entry point.
pub type DispatchFuture = BoxFuture<'static, MuxResult<()>>;

/// Entry point the host invokes once per observed request.
///
/// The returned future must be polled inside a Tokio runtime: actions of
/// fire-and-forget stages are spawned onto it.
pub type DispatchFn = Arc<dyn Fn(RequestDetail, Option<Completion>) -> DispatchFuture + Send + Sync>;

/// A filter plus the entry point bound to it.
#[derive(Clone)]
pub struct HostSubscription {
    pub filter: UrlFilter,
    pub dispatch: DispatchFn,
}

impl fmt::Debug for HostSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSubscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// The single-subscriber hook API of the host.
///
/// Implementors drive each [`DispatchFn`] future from within a Tokio
/// runtime, one request at a time per stage.
pub trait WebRequestHost: Send + Sync {
    /// Install `subscription` for `stage`, replacing any previous one.
    /// `None` tears the stage's subscription down.
    fn subscribe(&self, stage: Stage, subscription: Option<HostSubscription>);
}
