//! Execution of matched listeners for one request.
//!
//! # Responsibilities
//! - Wrap matched listeners as appliers
//! - Response-producing stages: resolve, then hand the result to the completion
//! - Fire-and-forget stages: start every applier and return immediately

use std::sync::Arc;

use crate::error::MuxResult;
use crate::host::{Completion, RequestDetail, StageResponse};
use crate::listener::Listener;
use crate::resolution::applier::Applier;
use crate::resolution::resolver::Resolver;
use crate::stage::Stage;

/// What a dispatch did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stage had no listeners; the request passed through.
    NoListeners,
    /// No listener pattern matched; the request passed through.
    NoMatch,
    /// The resolver ran; `responded` is false when it produced nothing.
    Resolved { responded: bool },
    /// Appliers were started without awaiting them.
    Detached { started: usize },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NoListeners => "no_listeners",
            Outcome::NoMatch => "no_match",
            Outcome::Resolved { responded: true } => "resolved",
            Outcome::Resolved { responded: false } => "unresolved",
            Outcome::Detached { .. } => "detached",
        }
    }
}

/// Tell the host we have no interest in the request.
pub(crate) fn pass_through(completion: Option<Completion>) {
    if let Some(complete) = completion {
        complete(StageResponse::pass_through());
    }
}

/// Build one applier per matched listener.
pub fn appliers_for(stage: Stage, detail: &RequestDetail, matched: &[Listener]) -> Vec<Applier> {
    matched
        .iter()
        .map(|listener| Applier::new(stage, listener, detail.clone()))
        .collect()
}

/// Run the matched listeners of a request according to the stage's kind.
///
/// Detached appliers are spawned on the current Tokio runtime.
pub async fn execute(
    stage: Stage,
    detail: RequestDetail,
    matched: Vec<Listener>,
    resolver: Arc<dyn Resolver>,
    completion: Option<Completion>,
) -> MuxResult<Outcome> {
    let appliers = appliers_for(stage, &detail, &matched);

    match completion {
        Some(complete) if stage.has_callback() => {
            let response = resolver.resolve(appliers).await?;
            let responded = response.is_some();
            if let Some(response) = response {
                complete(response);
            }
            Ok(Outcome::Resolved { responded })
        }
        _ => {
            let started = appliers.len();
            for applier in appliers {
                // Failures are logged by the applier; nothing awaits the result.
                tokio::spawn(async move {
                    let _ = applier.apply().await;
                });
            }
            Ok(Outcome::Detached { started })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use crate::listener::{ActionResult, ContextOptions, ListenerRegistry};
    use crate::resolution::resolver::LatestRegistered;

    fn completion() -> (Completion, Arc<Mutex<Vec<StageResponse>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = sent.clone();
        (Box::new(move |r| sink.lock().unwrap().push(r)), sent)
    }

    #[tokio::test]
    async fn test_resolved_response_reaches_completion() {
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                Stage::BeforeRequest,
                vec!["<all_urls>".into()],
                Some(Arc::new(|_d: RequestDetail| async { ActionResult::Ok(Some(StageResponse::cancel())) })),
                ContextOptions::new(),
            )
            .unwrap();

        let (complete, sent) = completion();
        let outcome = execute(
            Stage::BeforeRequest,
            RequestDetail::new("http://a.com/"),
            registry.listeners(Stage::BeforeRequest),
            Arc::new(LatestRegistered),
            Some(complete),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Resolved { responded: true });
        assert_eq!(*sent.lock().unwrap(), vec![StageResponse::cancel()]);
    }

    #[tokio::test]
    async fn test_empty_resolution_skips_completion() {
        let mut registry = ListenerRegistry::new();
        registry
            .register(
                Stage::HeadersReceived,
                vec!["<all_urls>".into()],
                Some(Arc::new(|_d: RequestDetail| async { ActionResult::Ok(None) })),
                ContextOptions::new(),
            )
            .unwrap();

        let (complete, sent) = completion();
        let outcome = execute(
            Stage::HeadersReceived,
            RequestDetail::new("http://a.com/"),
            registry.listeners(Stage::HeadersReceived),
            Arc::new(LatestRegistered),
            Some(complete),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Resolved { responded: false });
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fire_and_forget_starts_every_applier() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut registry = ListenerRegistry::new();
        for _ in 0..3 {
            let tx = tx.clone();
            registry
                .register(
                    Stage::Completed,
                    vec!["<all_urls>".into()],
                    Some(Arc::new(move |d: RequestDetail| {
                        let tx = tx.clone();
                        async move {
                            let _ = tx.send(d.url);
                            ActionResult::Ok(None)
                        }
                    })),
                    ContextOptions::new(),
                )
                .unwrap();
        }

        let outcome = execute(
            Stage::Completed,
            RequestDetail::new("http://done.com/"),
            registry.listeners(Stage::Completed),
            Arc::new(LatestRegistered),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Detached { started: 3 });

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap(), "http://done.com/");
        }
    }
}
