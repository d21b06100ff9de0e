//! Shorthand calling convention for registering listeners.
//!
//! # Accepted shapes
//! ```text
//! ()                          → clear the stage
//! (action)                    → default filter, empty context
//! (filter, action)
//! (action, context)
//! (filter, action, context)
//! ```
//! Anything else is `InvalidArgument`.

use std::fmt;
use std::sync::Arc;

use crate::error::{MuxError, MuxResult};
use crate::host::UrlFilter;
use crate::listener::{Action, ContextOptions, SharedAction};

/// One positional argument of the shorthand form.
#[derive(Clone)]
pub enum AliasArg {
    Filter(UrlFilter),
    Action(SharedAction),
    Context(ContextOptions),
}

impl AliasArg {
    pub fn action<A: Action + 'static>(action: A) -> Self {
        AliasArg::Action(Arc::new(action))
    }
}

impl From<UrlFilter> for AliasArg {
    fn from(filter: UrlFilter) -> Self {
        AliasArg::Filter(filter)
    }
}

impl From<ContextOptions> for AliasArg {
    fn from(context: ContextOptions) -> Self {
        AliasArg::Context(context)
    }
}

impl fmt::Debug for AliasArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasArg::Filter(filter) => f.debug_tuple("Filter").field(filter).finish(),
            AliasArg::Action(_) => f.write_str("Action(..)"),
            AliasArg::Context(context) => f.debug_tuple("Context").field(context).finish(),
        }
    }
}

/// Canonical call a shorthand invocation normalises to.
pub enum AliasCall {
    Clear,
    Add {
        filter: UrlFilter,
        action: SharedAction,
        context: ContextOptions,
    },
}

impl fmt::Debug for AliasCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasCall::Clear => f.write_str("Clear"),
            AliasCall::Add { filter, context, .. } => f
                .debug_struct("Add")
                .field("filter", filter)
                .field("context", context)
                .finish_non_exhaustive(),
        }
    }
}

fn signature_error(message: &str) -> MuxError {
    MuxError::InvalidArgument(format!("wrong function signature: {}", message))
}

/// Normalise positional arguments. `default_urls` fills in a missing filter.
pub fn parse_arguments(args: Vec<AliasArg>, default_urls: &[String]) -> MuxResult<AliasCall> {
    let default_filter = || UrlFilter::new(default_urls.iter().cloned());
    let add = |filter: UrlFilter, action: SharedAction, context: ContextOptions| -> MuxResult<AliasCall> {
        Ok(AliasCall::Add { filter, action, context })
    };

    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next(), args.next()) {
        (None, ..) => Ok(AliasCall::Clear),

        (Some(AliasArg::Action(action)), None, ..) => {
            add(default_filter(), action, ContextOptions::default())
        }
        (Some(_), None, ..) => Err(signature_error("no listener action given")),

        (Some(AliasArg::Filter(filter)), Some(AliasArg::Action(action)), None, _) => {
            add(filter, action, ContextOptions::default())
        }
        (Some(AliasArg::Action(action)), Some(AliasArg::Context(context)), None, _) => {
            add(default_filter(), action, context)
        }
        (Some(_), Some(_), None, _) => Err(signature_error(
            "argument 1 should be a filter or the listener action",
        )),

        (
            Some(AliasArg::Filter(filter)),
            Some(AliasArg::Action(action)),
            Some(AliasArg::Context(context)),
            None,
        ) => add(filter, action, context),
        (Some(_), Some(_), Some(_), None) => Err(signature_error(
            "expected filter, listener action, then context",
        )),

        _ => Err(signature_error("too many arguments")),
    }
}
