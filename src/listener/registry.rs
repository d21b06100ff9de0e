//! Per-stage listener storage.
//!
//! # Responsibilities
//! - Assign listener ids and registration order
//! - Store listeners keyed by stage and id
//! - Keep each stage's filter set equal to the union of its listeners' patterns
//!
//! # Design Decisions
//! - The order counter is owned here, starts at zero, first listener gets 1
//! - A stage with no listeners has neither a listener map nor a filter set
//! - Patterns are validated lazily by the matcher, not on registration

use std::collections::{BTreeMap, HashMap};

use crate::error::{MuxError, MuxResult};
use crate::listener::filters::FilterSet;
use crate::listener::model::{ContextOptions, Listener, ListenerContext, ListenerId, SharedAction};
use crate::stage::Stage;

/// Outcome of removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The stage or id was not registered.
    Unknown,
    /// The listener was removed and others remain on the stage.
    Removed,
    /// The listener was the stage's last one; the stage is now clear.
    Emptied,
}

/// Listener registry for every stage.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_order: u64,
    stages: HashMap<Stage, HashMap<ListenerId, Listener>>,
    filters: HashMap<Stage, FilterSet>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `stage`.
    pub fn register(
        &mut self,
        stage: Stage,
        urls: Vec<String>,
        action: Option<SharedAction>,
        options: ContextOptions,
    ) -> MuxResult<Listener> {
        let action = action.ok_or_else(|| {
            MuxError::InvalidArgument(format!("cannot bind with {}: a listener is missing", stage))
        })?;
        if urls.is_empty() {
            return Err(MuxError::InvalidArgument(format!(
                "cannot bind with {}: at least one url pattern is required",
                stage
            )));
        }

        self.next_order += 1;
        let listener = Listener {
            id: ListenerId::generate(),
            urls,
            action,
            context: ListenerContext {
                order: self.next_order,
                priority: options.priority,
                origin: options.origin,
            },
        };

        self.stages
            .entry(stage)
            .or_default()
            .insert(listener.id, listener.clone());
        self.recompute(stage);

        Ok(listener)
    }

    /// Remove a listener. Unknown stages or ids are ignored.
    pub fn unregister(&mut self, stage: Stage, id: &ListenerId) -> Removal {
        let Some(listeners) = self.stages.get_mut(&stage) else {
            return Removal::Unknown;
        };
        if !listeners.contains_key(id) {
            return Removal::Unknown;
        }

        if listeners.len() == 1 {
            self.clear(stage);
            return Removal::Emptied;
        }

        listeners.remove(id);
        self.recompute(stage);
        Removal::Removed
    }

    /// Drop every listener and the filter set of `stage`.
    /// Returns true if the stage had listeners.
    pub fn clear(&mut self, stage: Stage) -> bool {
        self.filters.remove(&stage);
        self.stages.remove(&stage).is_some()
    }

    /// Listeners of `stage`, in registration order.
    pub fn listeners(&self, stage: Stage) -> Vec<Listener> {
        let mut listeners: Vec<Listener> = self
            .stages
            .get(&stage)
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        listeners.sort_by_key(|l| l.context.order);
        listeners
    }

    /// Listeners of every non-empty stage.
    pub fn all(&self) -> BTreeMap<Stage, Vec<Listener>> {
        self.stages
            .keys()
            .map(|stage| (*stage, self.listeners(*stage)))
            .collect()
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.stages.get(&stage).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn filters_for(&self, stage: Stage) -> Option<&FilterSet> {
        self.filters.get(&stage)
    }

    pub fn filters(&self) -> BTreeMap<Stage, FilterSet> {
        self.filters
            .iter()
            .map(|(stage, set)| (*stage, set.clone()))
            .collect()
    }

    fn recompute(&mut self, stage: Stage) {
        let merged = self
            .stages
            .get(&stage)
            .filter(|listeners| !listeners.is_empty())
            .map(|listeners| FilterSet::merge(listeners.values()));

        match merged {
            Some(filters) => {
                self.filters.insert(stage, filters);
            }
            None => {
                self.stages.remove(&stage);
                self.filters.remove(&stage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use crate::host::RequestDetail;
    use crate::listener::model::ActionResult;

    fn noop() -> Option<SharedAction> {
        Some(Arc::new(|_detail: RequestDetail| async { ActionResult::Ok(None) }))
    }

    fn urls(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    fn union(registry: &ListenerRegistry, stage: Stage) -> BTreeSet<String> {
        registry
            .listeners(stage)
            .iter()
            .flat_map(|l| l.urls.iter().cloned())
            .collect()
    }

    #[test]
    fn test_register_requires_action() {
        let mut registry = ListenerRegistry::new();
        let err = registry
            .register(Stage::BeforeRequest, urls(&["<all_urls>"]), None, ContextOptions::new())
            .unwrap_err();
        assert!(matches!(err, MuxError::InvalidArgument(_)));
        assert!(registry.is_empty());

        let err = registry
            .register(Stage::BeforeRequest, Vec::new(), noop(), ContextOptions::new())
            .unwrap_err();
        assert!(matches!(err, MuxError::InvalidArgument(_)));
    }

    #[test]
    fn test_order_is_global_and_monotonic() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(Stage::BeforeRequest, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();
        let b = registry.register(Stage::Completed, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();
        let c = registry.register(Stage::BeforeRequest, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();

        assert_eq!(a.context.order, 1);
        assert_eq!(b.context.order, 2);
        assert_eq!(c.context.order, 3);
        assert_ne!(a.id, c.id);

        // Removal does not recycle order values
        registry.unregister(Stage::BeforeRequest, &c.id);
        let d = registry.register(Stage::BeforeRequest, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();
        assert_eq!(d.context.order, 4);
    }

    #[test]
    fn test_context_options_are_kept() {
        let mut registry = ListenerRegistry::new();
        let listener = registry
            .register(
                Stage::HeadersReceived,
                urls(&["<all_urls>"]),
                noop(),
                ContextOptions::new().with_priority(7.5).with_origin("metrics"),
            )
            .unwrap();
        assert_eq!(listener.context.priority, Some(7.5));
        assert_eq!(listener.context.origin.as_deref(), Some("metrics"));
    }

    #[test]
    fn test_filter_set_tracks_union() {
        let mut registry = ListenerRegistry::new();
        let stage = Stage::BeforeSendHeaders;

        let a = registry.register(stage, urls(&["*://a.com/*", "*://shared.com/*"]), noop(), ContextOptions::new()).unwrap();
        assert_eq!(registry.filters_for(stage).unwrap().patterns(), &union(&registry, stage));

        let b = registry.register(stage, urls(&["*://b.com/*", "*://shared.com/*"]), noop(), ContextOptions::new()).unwrap();
        let filters = registry.filters_for(stage).unwrap();
        assert_eq!(filters.patterns(), &union(&registry, stage));
        assert_eq!(filters.patterns().len(), 3);

        assert_eq!(registry.unregister(stage, &a.id), Removal::Removed);
        let filters = registry.filters_for(stage).unwrap();
        assert_eq!(filters.patterns(), &union(&registry, stage));
        assert!(!filters.patterns().contains("*://a.com/*"));
        assert!(filters.patterns().contains("*://shared.com/*"));

        assert_eq!(registry.unregister(stage, &b.id), Removal::Emptied);
        assert!(registry.filters_for(stage).is_none());
        assert_eq!(registry.len(stage), 0);
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ListenerRegistry::new();
        let a = registry.register(Stage::Completed, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();
        registry.register(Stage::Completed, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();

        assert_eq!(registry.unregister(Stage::Completed, &a.id), Removal::Removed);
        assert_eq!(registry.unregister(Stage::Completed, &a.id), Removal::Unknown);
        assert_eq!(registry.unregister(Stage::SendHeaders, &a.id), Removal::Unknown);
        assert_eq!(registry.len(Stage::Completed), 1);
    }

    #[test]
    fn test_clear() {
        let mut registry = ListenerRegistry::new();
        registry.register(Stage::ErrorOccurred, urls(&["<all_urls>"]), noop(), ContextOptions::new()).unwrap();

        assert!(registry.clear(Stage::ErrorOccurred));
        assert!(!registry.clear(Stage::ErrorOccurred));
        assert!(registry.filters().is_empty());
        assert!(registry.listeners(Stage::ErrorOccurred).is_empty());
    }
}
