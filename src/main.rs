//! request-mux replay tool.
//!
//! Loads a configuration of declarative listeners, builds a mux over the
//! in-process host and replays requests through it.
//!
//! ```text
//! request-mux --config mux.toml replay --stage before_request https://ads.example.com/x.js
//! request-mux --config mux.toml filters
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand};

use request_mux::config::{load_config, MuxConfig};
use request_mux::observability::logging::init_logging;
use request_mux::rules::build_mux;
use request_mux::{LocalHost, MuxResult, RequestDetail, Stage};

/// Time given to detached listener actions before the process exits.
const DETACHED_GRACE: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "request-mux")]
#[command(about = "Replay requests through configured web-request listeners", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one request per URL at a stage and print the responses
    ///
    /// On fire-and-forget stages listener actions run detached; actions
    /// still running shortly after the last request are cut off at exit.
    Replay {
        #[arg(short, long)]
        stage: Stage,

        #[arg(short, long, default_value = "GET")]
        method: String,

        urls: Vec<String>,
    },
    /// Print the filter set installed for each stage
    Filters,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        listeners = config.listeners.len(),
        log_level = %config.observability.log_level,
        "Configuration loaded"
    );

    let host = Arc::new(LocalHost::new());
    let mux = build_mux(host.clone(), &config)?;

    match cli.command {
        Commands::Replay { stage, method, urls } => {
            for line in replay(&host, stage, &method, urls).await? {
                println!("{}", line);
            }
        }
        Commands::Filters => {
            println!("{}", serde_json::to_string_pretty(&mux.filters())?);
        }
    }

    Ok(())
}

/// Emit one request per URL at `stage` and collect the outcome of each.
async fn replay(
    host: &LocalHost,
    stage: Stage,
    method: &str,
    urls: Vec<String>,
) -> MuxResult<Vec<serde_json::Value>> {
    let mut lines = Vec::with_capacity(urls.len());

    for (id, url) in urls.into_iter().enumerate() {
        let mut detail = RequestDetail::new(url.clone()).with_method(method);
        detail.id = id as u64 + 1;

        let response = host.emit(stage, detail).await?;
        lines.push(serde_json::json!({
            "stage": stage,
            "url": url,
            "response": response,
        }));
    }

    if !stage.has_callback() {
        // Let spawned listener actions finish before the runtime shuts down
        tokio::time::sleep(DETACHED_GRACE).await;
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use request_mux::listener::ActionResult;
    use request_mux::{ContextOptions, StageResponse, UrlFilter, WebRequestMux};

    #[tokio::test]
    async fn test_replay_waits_for_detached_actions() {
        let host = Arc::new(LocalHost::new());
        let mux = WebRequestMux::new(host.clone());
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        mux.add_listener(
            Stage::Completed,
            UrlFilter::new(["<all_urls>"]),
            move |_detail: RequestDetail| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ActionResult::Ok(None)
                }
            },
            ContextOptions::new(),
        )
        .unwrap();

        let urls = vec!["http://a.com/".to_string(), "http://b.com/".to_string()];
        let lines = replay(&host, Stage::Completed, "GET", urls).await.unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line["response"].is_null()));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_replay_reports_responses() {
        let host = Arc::new(LocalHost::new());
        let mux = WebRequestMux::new(host.clone());
        mux.add_listener(
            Stage::BeforeRequest,
            UrlFilter::new(["*://ads.com/*"]),
            |_detail: RequestDetail| async { ActionResult::Ok(Some(StageResponse::cancel())) },
            ContextOptions::new(),
        )
        .unwrap();

        let urls = vec!["http://ads.com/x.js".to_string()];
        let lines = replay(&host, Stage::BeforeRequest, "POST", urls).await.unwrap();

        assert_eq!(lines[0]["stage"], "before_request");
        assert_eq!(lines[0]["response"]["cancel"], true);
    }
}
