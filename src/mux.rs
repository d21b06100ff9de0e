//! Public facade: many listeners per stage over a single-subscriber host.
//!
//! # Responsibilities
//! - Register, remove and clear listeners per stage
//! - Keep each stage's host subscription in line with its listeners
//! - Route observed requests to matching listeners and resolve their output
//!
//! # Design Decisions
//! - Registry mutations and host reconciliation happen under one write lock
//! - Dispatch reads a snapshot of the listeners, never runs actions under a lock
//! - Host subscriptions hold a weak handle; dropping the mux disarms them

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use dashmap::DashMap;

use crate::alias::{parse_arguments, AliasArg, AliasCall};
use crate::config::schema::DispatchConfig;
use crate::error::MuxResult;
use crate::host::{Completion, DispatchFn, DispatchFuture, RequestDetail, UrlFilter, WebRequestHost};
use crate::listener::{Action, ContextOptions, Listener, ListenerId, ListenerRegistry, Removal, SharedAction};
use crate::observability::metrics;
use crate::resolution::engine::{self, Outcome};
use crate::resolution::{LatestRegistered, Resolver};
use crate::routing::{match_listeners, ExtensionMatcher, PatternMatcher};
use crate::stage::Stage;
use crate::subscription::SubscriptionManager;

struct Core {
    registry: RwLock<ListenerRegistry>,
    resolvers: DashMap<Stage, Arc<dyn Resolver>>,
    default_resolver: Arc<dyn Resolver>,
    subscriptions: SubscriptionManager,
    matcher: Arc<dyn PatternMatcher>,
    default_urls: Vec<String>,
}

impl Core {
    fn read_registry(&self) -> RwLockReadGuard<'_, ListenerRegistry> {
        self.registry.read().expect("listener registry lock poisoned")
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, ListenerRegistry> {
        self.registry.write().expect("listener registry lock poisoned")
    }

    /// Reinstall or clear the host hook of `stage` after a registry change.
    fn reconcile(self: &Arc<Self>, stage: Stage, registry: &ListenerRegistry) {
        self.subscriptions
            .reconcile(stage, registry.filters_for(stage), || self.dispatcher(stage));
        metrics::record_listener_count(stage, registry.len(stage));
    }

    /// The single entry point handed to the host for `stage`.
    fn dispatcher(self: &Arc<Self>, stage: Stage) -> DispatchFn {
        let core = Arc::downgrade(self);
        Arc::new(move |detail: RequestDetail, completion: Option<Completion>| -> DispatchFuture {
            let core = core.upgrade();
            Box::pin(async move {
                match core {
                    Some(core) => core.dispatch(stage, detail, completion).await,
                    None => {
                        engine::pass_through(completion);
                        Ok(())
                    }
                }
            })
        })
    }

    async fn dispatch(
        self: Arc<Self>,
        stage: Stage,
        detail: RequestDetail,
        completion: Option<Completion>,
    ) -> MuxResult<()> {
        let listeners = {
            let registry = self.read_registry();
            let listeners = registry.listeners(stage);
            if listeners.is_empty() {
                // Only reachable through a subscription that should be gone.
                tracing::debug!(stage = %stage, "Dispatch on a stage without listeners");
                self.subscriptions.teardown(stage);
            }
            listeners
        };

        if listeners.is_empty() {
            engine::pass_through(completion);
            metrics::record_dispatch(stage, Outcome::NoListeners.label());
            return Ok(());
        }

        let matched = match match_listeners(self.matcher.as_ref(), &detail.url, &listeners) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(stage = %stage, url = %detail.url, error = %e, "Listener pattern rejected, request not dispatched");
                metrics::record_invalid_pattern(stage);
                return Err(e);
            }
        };

        if matched.is_empty() {
            engine::pass_through(completion);
            metrics::record_dispatch(stage, Outcome::NoMatch.label());
            return Ok(());
        }

        let resolver = self
            .resolvers
            .get(&stage)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| self.default_resolver.clone());

        tracing::debug!(stage = %stage, url = %detail.url, matched = matched.len(), "Dispatching request");

        match engine::execute(stage, detail, matched, resolver, completion).await {
            Ok(outcome) => {
                metrics::record_dispatch(stage, outcome.label());
                Ok(())
            }
            Err(e) => {
                metrics::record_dispatch(stage, "failed");
                Err(e)
            }
        }
    }
}

/// Builder for [`WebRequestMux`].
pub struct MuxBuilder {
    host: Arc<dyn WebRequestHost>,
    matcher: Arc<dyn PatternMatcher>,
    default_urls: Vec<String>,
}

impl MuxBuilder {
    /// Replace the default extension-style pattern matcher.
    pub fn matcher(mut self, matcher: Arc<dyn PatternMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Patterns used by [`WebRequestMux::on`] when no filter is given.
    pub fn default_urls(mut self, urls: Vec<String>) -> Self {
        self.default_urls = urls;
        self
    }

    pub fn build(self) -> WebRequestMux {
        WebRequestMux {
            core: Arc::new(Core {
                registry: RwLock::new(ListenerRegistry::new()),
                resolvers: DashMap::new(),
                default_resolver: Arc::new(LatestRegistered),
                subscriptions: SubscriptionManager::new(self.host),
                matcher: self.matcher,
                default_urls: self.default_urls,
            }),
        }
    }
}

/// Multiplexes any number of listeners per stage onto one host subscription.
#[derive(Clone)]
pub struct WebRequestMux {
    core: Arc<Core>,
}

impl WebRequestMux {
    pub fn new(host: Arc<dyn WebRequestHost>) -> Self {
        Self::builder(host).build()
    }

    pub fn builder(host: Arc<dyn WebRequestHost>) -> MuxBuilder {
        MuxBuilder {
            host,
            matcher: Arc::new(ExtensionMatcher::new()),
            default_urls: DispatchConfig::default().default_urls,
        }
    }

    /// Register `action` for requests of `stage` matching `filter`.
    pub fn add_listener<A>(
        &self,
        stage: Stage,
        filter: UrlFilter,
        action: A,
        context: ContextOptions,
    ) -> MuxResult<Listener>
    where
        A: Action + 'static,
    {
        self.add_shared_listener(stage, filter, Some(Arc::new(action)), context)
    }

    /// Register an already shared action. Fails with `InvalidArgument`
    /// when `action` is absent.
    pub fn add_shared_listener(
        &self,
        stage: Stage,
        filter: UrlFilter,
        action: Option<SharedAction>,
        context: ContextOptions,
    ) -> MuxResult<Listener> {
        let mut registry = self.core.write_registry();
        let listener = registry.register(stage, filter.urls, action, context)?;
        self.core.reconcile(stage, &registry);

        tracing::debug!(
            stage = %stage,
            listener = %listener.id,
            order = listener.context.order,
            origin = ?listener.context.origin,
            "Listener registered"
        );
        Ok(listener)
    }

    /// Remove a listener. Unknown stages or ids are a no-op.
    pub fn remove_listener(&self, stage: Stage, id: &ListenerId) {
        let mut registry = self.core.write_registry();
        match registry.unregister(stage, id) {
            Removal::Unknown => {}
            removal => {
                self.core.reconcile(stage, &registry);
                tracing::debug!(stage = %stage, listener = %id, ?removal, "Listener removed");
            }
        }
    }

    /// Remove every listener of `stage` and clear its host subscription.
    pub fn clear_listeners(&self, stage: Stage) {
        let mut registry = self.core.write_registry();
        let had_listeners = registry.clear(stage);
        if had_listeners || self.core.subscriptions.is_active(stage) {
            self.core.reconcile(stage, &registry);
            tracing::debug!(stage = %stage, "Listeners cleared");
        }
    }

    /// Set the resolver of a response-producing stage.
    pub fn set_resolver<R>(&self, stage: Stage, resolver: R)
    where
        R: Resolver + 'static,
    {
        self.set_shared_resolver(stage, Arc::new(resolver));
    }

    /// Like [`set_resolver`](Self::set_resolver) for an already shared resolver.
    ///
    /// Ignored with a warning on fire-and-forget stages; replacing an
    /// existing resolver also warns.
    pub fn set_shared_resolver(&self, stage: Stage, resolver: Arc<dyn Resolver>) {
        if !stage.has_callback() {
            tracing::warn!(stage = %stage, "Stage has no callback and does not use a resolver");
            return;
        }

        if self.core.resolvers.insert(stage, resolver).is_some() {
            tracing::warn!(stage = %stage, "Overriding resolver");
        }
    }

    /// Dispatch the convenience calling convention for `stage`.
    ///
    /// No arguments clears the stage; otherwise a listener is registered
    /// and returned.
    pub fn on(&self, stage: Stage, args: Vec<AliasArg>) -> MuxResult<Option<Listener>> {
        match parse_arguments(args, &self.core.default_urls)? {
            AliasCall::Clear => {
                self.clear_listeners(stage);
                Ok(None)
            }
            AliasCall::Add { filter, action, context } => self
                .add_shared_listener(stage, filter, Some(action), context)
                .map(Some),
        }
    }

    /// Listeners of every stage, each in registration order.
    pub fn listeners(&self) -> BTreeMap<Stage, Vec<Listener>> {
        self.core.read_registry().all()
    }

    pub fn listeners_for(&self, stage: Stage) -> Option<Vec<Listener>> {
        let listeners = self.core.read_registry().listeners(stage);
        (!listeners.is_empty()).then_some(listeners)
    }

    /// Filter sets of every stage with listeners.
    pub fn filters(&self) -> BTreeMap<Stage, BTreeSet<String>> {
        self.core
            .read_registry()
            .filters()
            .into_iter()
            .map(|(stage, set)| (stage, set.patterns().clone()))
            .collect()
    }

    pub fn filters_for(&self, stage: Stage) -> Option<BTreeSet<String>> {
        self.core
            .read_registry()
            .filters_for(stage)
            .map(|set| set.patterns().clone())
    }

    /// Whether `stage` expects a completion value from its listeners.
    pub fn has_callback(&self, stage: Stage) -> bool {
        stage.has_callback()
    }

    /// Stages currently holding a host subscription.
    pub fn subscribed_stages(&self) -> Vec<Stage> {
        self.core.subscriptions.active()
    }

    /// The subset of `listeners` whose patterns match `url`.
    pub fn match_listeners(&self, url: &str, listeners: &[Listener]) -> MuxResult<Vec<Listener>> {
        match_listeners(self.core.matcher.as_ref(), url, listeners)
    }
}
