//! Shared utilities for integration testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use request_mux::listener::{ActionResult, SharedAction};
use request_mux::{RequestDetail, StageResponse};

/// Ordered record of which actions ran, and for which URL.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the actions that ran so far.
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn urls(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|(_, url)| url.clone()).collect()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Poll until `count` entries exist or the timeout elapses.
    #[allow(dead_code)]
    pub async fn wait_for(&self, count: usize) -> bool {
        for _ in 0..100 {
            if self.entries.lock().unwrap().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn push(&self, name: &str, url: &str) {
        self.entries.lock().unwrap().push((name.to_string(), url.to_string()));
    }
}

/// Action that records its name and answers with a redirect to `name`.
pub fn responder(name: &'static str, journal: &Journal) -> SharedAction {
    let journal = journal.clone();
    Arc::new(move |detail: RequestDetail| {
        journal.push(name, &detail.url);
        async move { ActionResult::Ok(Some(StageResponse::redirect(name))) }
    })
}

/// Action that records its name and expresses no opinion.
#[allow(dead_code)]
pub fn observer(name: &'static str, journal: &Journal) -> SharedAction {
    let journal = journal.clone();
    Arc::new(move |detail: RequestDetail| {
        journal.push(name, &detail.url);
        async { ActionResult::Ok(None) }
    })
}

/// Action that always fails with `message`.
#[allow(dead_code)]
pub fn failing(message: &'static str) -> SharedAction {
    Arc::new(move |_detail: RequestDetail| async move { ActionResult::Err(message.into()) })
}
