//! Resolver policies combining matched appliers into one response.

use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::MuxResult;
use crate::host::StageResponse;
use crate::resolution::applier::Applier;

/// Future produced by a resolver.
pub type ResolverFuture = BoxFuture<'static, MuxResult<Option<StageResponse>>>;

/// Policy turning the matched appliers of one request into a response.
///
/// A resolver chooses which appliers actually run. `Ok(None)` means no
/// completion is sent to the host.
pub trait Resolver: Send + Sync {
    fn resolve(&self, appliers: Vec<Applier>) -> ResolverFuture;
}

impl<F, Fut> Resolver for F
where
    F: Fn(Vec<Applier>) -> Fut + Send + Sync,
    Fut: Future<Output = MuxResult<Option<StageResponse>>> + Send + 'static,
{
    fn resolve(&self, appliers: Vec<Applier>) -> ResolverFuture {
        Box::pin(self(appliers))
    }
}

/// Default policy: the most recently registered listener wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestRegistered;

impl Resolver for LatestRegistered {
    fn resolve(&self, appliers: Vec<Applier>) -> ResolverFuture {
        match appliers.into_iter().max_by_key(|a| a.context().order) {
            Some(latest) => latest.apply(),
            None => Box::pin(async { Ok(None) }),
        }
    }
}

/// Highest `priority` wins; missing or NaN priorities rank lowest and ties
/// fall back to registration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct HighestPriority;

fn rank(applier: &Applier) -> f64 {
    applier
        .context()
        .priority
        .filter(|p| !p.is_nan())
        .unwrap_or(f64::NEG_INFINITY)
}

impl Resolver for HighestPriority {
    fn resolve(&self, appliers: Vec<Applier>) -> ResolverFuture {
        let winner = appliers.into_iter().max_by(|a, b| {
            rank(a)
                .total_cmp(&rank(b))
                .then(a.context().order.cmp(&b.context().order))
        });

        match winner {
            Some(winner) => winner.apply(),
            None => Box::pin(async { Ok(None) }),
        }
    }
}

/// Built-in resolvers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    Latest,
    Priority,
}

impl ResolverKind {
    pub fn build(self) -> Arc<dyn Resolver> {
        match self {
            ResolverKind::Latest => Arc::new(LatestRegistered),
            ResolverKind::Priority => Arc::new(HighestPriority),
        }
    }
}
