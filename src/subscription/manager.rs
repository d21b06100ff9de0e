//! Owner of the host's per-stage hook.
//!
//! # Responsibilities
//! - Install (or replace) the single host subscription of a stage
//! - Tear the subscription down when the stage has no listeners
//!
//! # Design Decisions
//! - Sole writer of `WebRequestHost::subscribe`
//! - Callers reconcile while holding the registry write lock, so the
//!   installed filter never diverges from the registry

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::host::{DispatchFn, HostSubscription, WebRequestHost};
use crate::listener::FilterSet;
use crate::observability::metrics;
use crate::stage::Stage;

pub struct SubscriptionManager {
    host: Arc<dyn WebRequestHost>,
    active: Mutex<BTreeSet<Stage>>,
}

impl SubscriptionManager {
    pub fn new(host: Arc<dyn WebRequestHost>) -> Self {
        Self {
            host,
            active: Mutex::new(BTreeSet::new()),
        }
    }

    /// Bring the host hook for `stage` in line with its filter set.
    ///
    /// `dispatch` is only built when a subscription is installed.
    pub fn reconcile<F>(&self, stage: Stage, filters: Option<&FilterSet>, dispatch: F)
    where
        F: FnOnce() -> DispatchFn,
    {
        match filters {
            Some(filters) if !filters.is_empty() => self.install(stage, filters, dispatch()),
            _ => self.teardown(stage),
        }
    }

    /// Replace the host subscription of `stage`.
    pub fn install(&self, stage: Stage, filters: &FilterSet, dispatch: DispatchFn) {
        let filter = filters.to_filter();
        tracing::debug!(stage = %stage, patterns = ?filter.urls, "Installing host subscription");

        self.host.subscribe(stage, Some(HostSubscription { filter, dispatch }));
        self.active.lock().expect("subscription set mutex poisoned").insert(stage);
        metrics::record_resubscribe(stage);
    }

    /// Clear the host subscription of `stage`.
    pub fn teardown(&self, stage: Stage) {
        tracing::debug!(stage = %stage, "Clearing host subscription");

        self.host.subscribe(stage, None);
        self.active.lock().expect("subscription set mutex poisoned").remove(&stage);
    }

    pub fn is_active(&self, stage: Stage) -> bool {
        self.active.lock().expect("subscription set mutex poisoned").contains(&stage)
    }

    /// Stages with a live subscription.
    pub fn active(&self) -> Vec<Stage> {
        self.active
            .lock()
            .expect("subscription set mutex poisoned")
            .iter()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Completion, DispatchFuture, LocalHost, RequestDetail};
    use crate::listener::{ActionResult, ContextOptions, ListenerRegistry};

    fn noop_dispatch() -> DispatchFn {
        Arc::new(|_detail: RequestDetail, _completion: Option<Completion>| -> DispatchFuture {
            Box::pin(async { Ok(()) })
        })
    }

    #[test]
    fn test_reconcile_installs_and_clears() {
        let host = Arc::new(LocalHost::new());
        let manager = SubscriptionManager::new(host.clone());

        let mut registry = ListenerRegistry::new();
        registry
            .register(
                Stage::BeforeRequest,
                vec!["*://a.com/*".into(), "*://b.com/*".into()],
                Some(Arc::new(|_d: RequestDetail| async { ActionResult::Ok(None) })),
                ContextOptions::new(),
            )
            .unwrap();

        manager.reconcile(Stage::BeforeRequest, registry.filters_for(Stage::BeforeRequest), noop_dispatch);
        assert!(manager.is_active(Stage::BeforeRequest));
        assert_eq!(
            host.filter_for(Stage::BeforeRequest).unwrap().urls,
            vec!["*://a.com/*".to_string(), "*://b.com/*".to_string()]
        );

        registry.clear(Stage::BeforeRequest);
        manager.reconcile(Stage::BeforeRequest, registry.filters_for(Stage::BeforeRequest), || {
            panic!("dispatch must not be built when clearing")
        });
        assert!(!manager.is_active(Stage::BeforeRequest));
        assert!(host.filter_for(Stage::BeforeRequest).is_none());
        assert!(manager.active().is_empty());

        let log = host.subscription_log();
        assert_eq!(log.len(), 2);
        assert!(log[1].filter.is_none());
    }
}
