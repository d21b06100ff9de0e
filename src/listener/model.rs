//! Listener records and the action abstraction.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::{RequestDetail, StageResponse};

/// Error type returned by listener actions.
pub type ActionError = Box<dyn Error + Send + Sync>;

/// Result produced by a listener action.
pub type ActionResult = Result<Option<StageResponse>, ActionError>;

/// Work a listener performs for a matched request.
///
/// Returning `Ok(None)` means the listener has no opinion on the response.
pub trait Action: Send + Sync {
    fn call(&self, detail: RequestDetail) -> BoxFuture<'static, ActionResult>;
}

impl<F, Fut> Action for F
where
    F: Fn(RequestDetail) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    fn call(&self, detail: RequestDetail) -> BoxFuture<'static, ActionResult> {
        Box::pin(self(detail))
    }
}

/// Shared handle to an action.
pub type SharedAction = Arc<dyn Action>;

/// Unique listener identifier, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Caller-supplied context fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextOptions {
    pub priority: Option<f64>,
    pub origin: Option<String>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Ordering and priority metadata attached to a listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListenerContext {
    /// Global registration sequence number.
    pub order: u64,
    pub priority: Option<f64>,
    pub origin: Option<String>,
}

/// A registered listener. Immutable once created.
#[derive(Clone)]
pub struct Listener {
    pub id: ListenerId,
    pub urls: Vec<String>,
    pub action: SharedAction,
    pub context: ListenerContext,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("urls", &self.urls)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
