//! Declarative listeners built from configuration.

use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::config::schema::MuxConfig;
use crate::error::MuxResult;
use crate::host::{RequestDetail, StageResponse, UrlFilter, WebRequestHost};
use crate::listener::{ActionResult, ContextOptions, Listener, SharedAction};
use crate::mux::WebRequestMux;
use crate::stage::Stage;

/// What a configured listener does with a matched request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    Cancel,
    Redirect { url: String },
    SetRequestHeader { name: String, value: String },
    SetResponseHeader { name: String, value: String },
    /// Emit an `info` event and express no opinion.
    Log,
}

impl RuleAction {
    /// Whether the action only makes sense on a response-producing stage.
    pub fn produces_response(&self) -> bool {
        !matches!(self, RuleAction::Log)
    }

    fn respond(&self, stage: Stage, detail: RequestDetail) -> Option<StageResponse> {
        match self {
            RuleAction::Cancel => Some(StageResponse::cancel()),
            RuleAction::Redirect { url } => Some(StageResponse::redirect(url.clone())),
            RuleAction::SetRequestHeader { name, value } => {
                let mut headers = detail.request_headers;
                headers.insert(name.clone(), value.clone());
                Some(StageResponse {
                    request_headers: Some(headers),
                    ..Default::default()
                })
            }
            RuleAction::SetResponseHeader { name, value } => {
                let mut headers = detail.response_headers;
                headers.insert(name.clone(), vec![value.clone()]);
                Some(StageResponse {
                    response_headers: Some(headers),
                    ..Default::default()
                })
            }
            RuleAction::Log => {
                tracing::info!(
                    stage = %stage,
                    request_id = detail.id,
                    method = %detail.method,
                    url = %detail.url,
                    status = ?detail.status_code,
                    "Request observed"
                );
                None
            }
        }
    }

    /// Turn the rule into a listener action for `stage`.
    pub fn into_action(self, stage: Stage) -> SharedAction {
        let rule = Arc::new(self);
        Arc::new(move |detail: RequestDetail| {
            let response = rule.respond(stage, detail);
            async move { ActionResult::Ok(response) }
        })
    }
}

/// A listener declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerRule {
    pub stage: Stage,
    pub urls: Vec<String>,
    pub action: RuleAction,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub origin: Option<String>,
}

/// Register every rule on `mux`, in declaration order.
pub fn install_rules(mux: &WebRequestMux, rules: &[ListenerRule]) -> MuxResult<Vec<Listener>> {
    rules
        .iter()
        .map(|rule| {
            let context = ContextOptions {
                priority: rule.priority,
                origin: rule.origin.clone(),
            };
            mux.add_shared_listener(
                rule.stage,
                UrlFilter::new(rule.urls.iter().cloned()),
                Some(rule.action.clone().into_action(rule.stage)),
                context,
            )
        })
        .collect()
}

/// Build a mux over `host` with the configured resolvers and listeners.
pub fn build_mux(host: Arc<dyn WebRequestHost>, config: &MuxConfig) -> MuxResult<WebRequestMux> {
    let mux = WebRequestMux::builder(host)
        .default_urls(config.dispatch.default_urls.clone())
        .build();

    for (stage, kind) in &config.resolvers {
        mux.set_shared_resolver(*stage, kind.build());
    }

    let installed = install_rules(&mux, &config.listeners)?;
    tracing::info!(listeners = installed.len(), resolvers = config.resolvers.len(), "Configured listeners installed");

    Ok(mux)
}
