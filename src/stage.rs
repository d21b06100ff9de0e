//! Request lifecycle stages exposed by the host.
//!
//! # Design Decisions
//! - Closed set, known at compile time
//! - Whether a stage produces a response is a static property of the stage

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::MuxError;

/// A point in a request's lifecycle where the host invokes its subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    BeforeRequest,
    BeforeSendHeaders,
    HeadersReceived,
    SendHeaders,
    ResponseStarted,
    BeforeRedirect,
    Completed,
    ErrorOccurred,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::BeforeRequest,
        Stage::BeforeSendHeaders,
        Stage::HeadersReceived,
        Stage::SendHeaders,
        Stage::ResponseStarted,
        Stage::BeforeRedirect,
        Stage::Completed,
        Stage::ErrorOccurred,
    ];

    /// Returns true if the host expects a completion value for this stage.
    pub fn has_callback(self) -> bool {
        matches!(
            self,
            Stage::BeforeRequest | Stage::BeforeSendHeaders | Stage::HeadersReceived
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::BeforeRequest => "before_request",
            Stage::BeforeSendHeaders => "before_send_headers",
            Stage::HeadersReceived => "headers_received",
            Stage::SendHeaders => "send_headers",
            Stage::ResponseStarted => "response_started",
            Stage::BeforeRedirect => "before_redirect",
            Stage::Completed => "completed",
            Stage::ErrorOccurred => "error_occurred",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| MuxError::InvalidArgument(format!("unknown stage `{}`", s)))
    }
}

impl TryFrom<String> for Stage {
    type Error = MuxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_string()
    }
}
