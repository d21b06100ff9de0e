//! Filter aggregation: the union of a stage's listener patterns.

use std::collections::BTreeSet;

use crate::host::UrlFilter;
use crate::listener::model::Listener;

/// Deduplicated set of URL patterns for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    patterns: BTreeSet<String>,
}

impl FilterSet {
    /// Union of every listener's patterns.
    pub fn merge<'a, I>(listeners: I) -> Self
    where
        I: IntoIterator<Item = &'a Listener>,
    {
        let patterns = listeners
            .into_iter()
            .flat_map(|listener| listener.urls.iter().cloned())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &BTreeSet<String> {
        &self.patterns
    }

    /// Filter handed to the host.
    pub fn to_filter(&self) -> UrlFilter {
        UrlFilter::new(self.patterns.iter().cloned())
    }
}
