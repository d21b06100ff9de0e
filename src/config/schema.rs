//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::resolution::ResolverKind;
use crate::rules::ListenerRule;
use crate::stage::Stage;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MuxConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Dispatch and registration defaults.
    pub dispatch: DispatchConfig,

    /// Built-in resolver per response-producing stage.
    pub resolvers: BTreeMap<Stage, ResolverKind>,

    /// Declarative listeners installed at startup.
    pub listeners: Vec<ListenerRule>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Patterns used when a listener is added through the shorthand
    /// calling convention without a filter.
    pub default_urls: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_urls: vec!["<all_urls>".to_string()],
        }
    }
}
