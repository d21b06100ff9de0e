//! Deferred listener execution.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use futures_util::future::{BoxFuture, FutureExt};

use crate::error::{MuxError, MuxResult};
use crate::host::{RequestDetail, StageResponse};
use crate::listener::{Listener, ListenerContext, ListenerId, SharedAction};
use crate::observability::metrics;
use crate::stage::Stage;

/// A matched listener's action bound to one request, not yet started.
///
/// Nothing runs until [`Applier::apply`] is called. Failures (returned
/// errors and panics alike) come back as `ActionFailure` and are logged
/// once here, whoever triggered the applier.
pub struct Applier {
    stage: Stage,
    listener: ListenerId,
    context: ListenerContext,
    action: SharedAction,
    detail: RequestDetail,
}

impl Applier {
    pub(crate) fn new(stage: Stage, listener: &Listener, detail: RequestDetail) -> Self {
        Self {
            stage,
            listener: listener.id,
            context: listener.context.clone(),
            action: listener.action.clone(),
            detail,
        }
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    pub fn context(&self) -> &ListenerContext {
        &self.context
    }

    /// Start the action and return a future of its response.
    pub fn apply(self) -> BoxFuture<'static, MuxResult<Option<StageResponse>>> {
        let Applier { stage, listener, action, detail, .. } = self;
        let started = panic::catch_unwind(AssertUnwindSafe(|| action.call(detail)));

        Box::pin(async move {
            let outcome = match started {
                Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(response)) => return Ok(response),
                    Ok(Err(e)) => e.to_string(),
                    Err(payload) => panic_message(payload),
                },
                Err(payload) => panic_message(payload),
            };

            tracing::warn!(stage = %stage, listener = %listener, error = %outcome, "Listener action failed");
            metrics::record_action_failure(stage);
            Err(MuxError::ActionFailure { listener, message: outcome })
        })
    }
}

impl fmt::Debug for Applier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Applier")
            .field("stage", &self.stage)
            .field("listener", &self.listener)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("action panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("action panicked: {}", message)
    } else {
        "action panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::listener::{ActionError, ActionResult, ContextOptions, ListenerRegistry};

    fn listener_with(action: SharedAction) -> Listener {
        let mut registry = ListenerRegistry::new();
        registry
            .register(Stage::BeforeRequest, vec!["<all_urls>".into()], Some(action), ContextOptions::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_applier_is_deferred() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let listener = listener_with(Arc::new(move |detail: RequestDetail| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { ActionResult::Ok(Some(StageResponse::redirect(detail.url))) }
        }));

        let applier = Applier::new(Stage::BeforeRequest, &listener, RequestDetail::new("http://a.com/"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(applier.context().order, 1);

        let response = applier.apply().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response, Some(StageResponse::redirect("http://a.com/")));
    }

    #[tokio::test]
    async fn test_errors_become_action_failures() {
        let listener = listener_with(Arc::new(|_detail: RequestDetail| async {
            ActionResult::Err(ActionError::from("upstream unavailable"))
        }));

        let err = Applier::new(Stage::BeforeRequest, &listener, RequestDetail::new("http://a.com/"))
            .apply()
            .await
            .unwrap_err();
        match err {
            MuxError::ActionFailure { listener: id, message } => {
                assert_eq!(id, listener.id);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panics_become_action_failures() {
        let listener = listener_with(Arc::new(|_detail: RequestDetail| async {
            if true {
                panic!("boom");
            }
            ActionResult::Ok(None)
        }));

        let err = Applier::new(Stage::BeforeRequest, &listener, RequestDetail::new("http://a.com/"))
            .apply()
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::ActionFailure { ref message, .. } if message.contains("boom")));
    }
}
