//! In-process host with one subscription slot per stage.
//!
//! # Responsibilities
//! - Store the current subscription of each stage (install replaces)
//! - Record every subscribe/clear call for inspection
//! - Deliver requests to the installed entry point if its filter admits them
//!
//! # Design Decisions
//! - Deliveries on the same stage are serialized, different stages run concurrently
//! - Unparseable or malformed filter patterns simply do not admit a request

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};

use crate::error::MuxResult;
use crate::host::{Completion, DispatchFn, HostSubscription, RequestDetail, StageResponse, UrlFilter, WebRequestHost};
use crate::routing::{ExtensionMatcher, PatternMatcher};
use crate::stage::Stage;

/// A recorded call to [`WebRequestHost::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEvent {
    pub stage: Stage,
    /// `None` for a clear.
    pub filter: Option<UrlFilter>,
}

/// Host implementation living in the same process as the mux.
pub struct LocalHost {
    slots: Mutex<HashMap<Stage, HostSubscription>>,
    log: Mutex<Vec<SubscriptionEvent>>,
    gates: HashMap<Stage, AsyncMutex<()>>,
    matcher: ExtensionMatcher,
}

impl LocalHost {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            gates: Stage::ALL.into_iter().map(|s| (s, AsyncMutex::new(()))).collect(),
            matcher: ExtensionMatcher::new(),
        }
    }

    /// Filter currently installed for `stage`.
    pub fn filter_for(&self, stage: Stage) -> Option<UrlFilter> {
        self.slots
            .lock()
            .expect("host slots mutex poisoned")
            .get(&stage)
            .map(|s| s.filter.clone())
    }

    /// Entry point currently installed for `stage`.
    pub fn dispatcher(&self, stage: Stage) -> Option<DispatchFn> {
        self.slots
            .lock()
            .expect("host slots mutex poisoned")
            .get(&stage)
            .map(|s| s.dispatch.clone())
    }

    pub fn is_subscribed(&self, stage: Stage) -> bool {
        self.slots.lock().expect("host slots mutex poisoned").contains_key(&stage)
    }

    /// Every subscribe/clear call received so far.
    pub fn subscription_log(&self) -> Vec<SubscriptionEvent> {
        self.log.lock().expect("host log mutex poisoned").clone()
    }

    fn admits(&self, filter: &UrlFilter, url: &str) -> bool {
        filter
            .urls
            .iter()
            .any(|pattern| self.matcher.matches(pattern, url).unwrap_or(false))
    }

    /// Deliver a request observed at `stage`.
    ///
    /// Returns the completion value, or `None` if the stage has no
    /// subscription admitting the URL, is fire-and-forget, or the mux did
    /// not complete.
    pub async fn emit(&self, stage: Stage, detail: RequestDetail) -> MuxResult<Option<StageResponse>> {
        let Some(gate) = self.gates.get(&stage) else {
            return Ok(None);
        };
        let _serial = gate.lock().await;

        let dispatch = {
            let slots = self.slots.lock().expect("host slots mutex poisoned");
            match slots.get(&stage) {
                Some(slot) if self.admits(&slot.filter, &detail.url) => slot.dispatch.clone(),
                _ => return Ok(None),
            }
        };

        if !stage.has_callback() {
            dispatch(detail, None).await?;
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        let completion: Completion = Box::new(move |response| {
            let _ = tx.send(response);
        });
        dispatch(detail, Some(completion)).await?;

        Ok(rx.await.ok())
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WebRequestHost for LocalHost {
    fn subscribe(&self, stage: Stage, subscription: Option<HostSubscription>) {
        let filter = subscription.as_ref().map(|s| s.filter.clone());

        let mut slots = self.slots.lock().expect("host slots mutex poisoned");
        match subscription {
            Some(subscription) => {
                slots.insert(stage, subscription);
            }
            None => {
                slots.remove(&stage);
            }
        }

        self.log
            .lock()
            .expect("host log mutex poisoned")
            .push(SubscriptionEvent { stage, filter });
    }
}
