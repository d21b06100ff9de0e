//! Request-to-listener routing.
//!
//! # Responsibilities
//! - Select the listeners whose patterns match a request URL
//!
//! # Design Decisions
//! - A listener matches if any of its patterns match
//! - A malformed pattern aborts the whole match (configuration bug, not data)
//! - Result order follows the input; callers must not rely on it

use crate::error::MuxResult;
use crate::listener::Listener;
use crate::routing::pattern::PatternMatcher;

/// Find the subset of `listeners` matching `url`.
pub fn match_listeners(
    matcher: &dyn PatternMatcher,
    url: &str,
    listeners: &[Listener],
) -> MuxResult<Vec<Listener>> {
    let mut matched = Vec::new();

    for listener in listeners {
        if listener_matches(matcher, url, listener)? {
            matched.push(listener.clone());
        }
    }

    Ok(matched)
}

fn listener_matches(matcher: &dyn PatternMatcher, url: &str, listener: &Listener) -> MuxResult<bool> {
    for pattern in &listener.urls {
        if matcher.matches(pattern, url)? {
            return Ok(true);
        }
    }
    Ok(false)
}
