//! Records exchanged with the host for each observed request.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Details of a request as observed by the host at a given stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestDetail {
    /// Host-assigned request identifier.
    pub id: u64,
    pub url: String,
    pub method: String,
    pub resource_type: String,
    pub referrer: String,
    /// Milliseconds since the epoch.
    pub timestamp: f64,
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, Vec<String>>,
    pub status_code: Option<u16>,
    pub redirect_url: Option<String>,
    pub error: Option<String>,
}

impl RequestDetail {
    /// A GET request for `url` with every other field empty.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Value handed back to the host on response-producing stages.
///
/// The default value (`cancel = false`, nothing overridden) lets the
/// request continue unmodified.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StageResponse {
    pub cancel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_line: Option<String>,
}

impl StageResponse {
    /// "No opinion": the request proceeds untouched.
    pub fn pass_through() -> Self {
        Self::default()
    }

    pub fn cancel() -> Self {
        Self {
            cancel: true,
            ..Default::default()
        }
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            redirect_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_pass_through(&self) -> bool {
        *self == Self::default()
    }
}
