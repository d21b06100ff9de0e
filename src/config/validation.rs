//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges and required values
//! - Reject resolvers and responses on stages that cannot produce a response
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::MuxConfig;
use crate::rules::RuleAction;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level `{}`", config.observability.log_level),
        ));
    }

    if config.dispatch.default_urls.is_empty() {
        errors.push(ValidationError::new("dispatch.default_urls", "must not be empty"));
    }

    for stage in config.resolvers.keys() {
        if !stage.has_callback() {
            errors.push(ValidationError::new(
                format!("resolvers.{}", stage),
                "stage does not produce a response",
            ));
        }
    }

    for (i, rule) in config.listeners.iter().enumerate() {
        let field = |name: &str| format!("listeners[{}].{}", i, name);

        if rule.urls.is_empty() {
            errors.push(ValidationError::new(field("urls"), "at least one pattern is required"));
        }
        if rule.urls.iter().any(|u| u.trim().is_empty()) {
            errors.push(ValidationError::new(field("urls"), "patterns must not be blank"));
        }

        match &rule.action {
            RuleAction::Redirect { url } if url.trim().is_empty() => {
                errors.push(ValidationError::new(field("action.url"), "redirect target is empty"));
            }
            RuleAction::SetRequestHeader { name, .. } | RuleAction::SetResponseHeader { name, .. }
                if name.trim().is_empty() =>
            {
                errors.push(ValidationError::new(field("action.name"), "header name is empty"));
            }
            _ => {}
        }

        if rule.priority.is_some_and(f64::is_nan) {
            errors.push(ValidationError::new(field("priority"), "must be a number"));
        }

        if rule.action.produces_response() && !rule.stage.has_callback() {
            errors.push(ValidationError::new(
                field("action"),
                format!("stage `{}` does not produce a response", rule.stage),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
