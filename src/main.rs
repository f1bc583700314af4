//! Financial news agent binary entrypoint.
//! Loads the configuration document, wires the pipeline adapters, installs
//! the configured triggers, and serves the HTTP control surface.
//!
//! See `README.md` for quickstart and the config document reference.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finnews_agent::agent::{Agent, RunTracker};
use finnews_agent::api::{self, AppState};
use finnews_agent::config::{ConfigStore, LoggingConfig};
use finnews_agent::metrics::Metrics;
use finnews_agent::news::AlphaVantageClient;
use finnews_agent::publish::XApiClient;
use finnews_agent::summarize::{GeminiClient, Summarizer};
use finnews_agent::triggers::{self, Triggers};

const DEFAULT_PORT: u16 = 3010;

/// Tracing setup from the logging section: env filter (`RUST_LOG` wins over
/// the configured level), compact stderr output, and an optional append-mode
/// file layer.
fn init_tracing(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));

    let file_layer = if cfg.save_to_file {
        let path = std::path::Path::new(&cfg.file_path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating log directory {}", dir.display()))?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    // No configuration document, no agent. Everything after this point
    // degrades gracefully instead.
    let store = Arc::new(ConfigStore::from_env());
    let cfg = store
        .load()
        .with_context(|| format!("loading configuration from {}", store.path().display()))?;
    init_tracing(&cfg.logging)?;

    let metrics = Metrics::init();

    let runs = Arc::new(RunTracker::new());
    let agent = Arc::new(Agent::new(
        Arc::clone(&store),
        Arc::new(AlphaVantageClient::new(Arc::clone(&store))),
        Summarizer::new(Arc::new(GeminiClient::new(Arc::clone(&store)))),
        Arc::new(XApiClient::new(Arc::clone(&store))),
        Arc::clone(&runs),
    ));

    if cfg.run_on_startup {
        triggers::spawn_startup_run(Arc::clone(&agent));
    }

    let triggers = Triggers::new();
    triggers
        .configure_interval(Arc::clone(&agent), &cfg.interval)
        .await;
    if let Err(err) = triggers
        .configure_schedule(Arc::clone(&agent), &cfg.schedule)
        .await
    {
        // A bad cron expression must not take the control surface down.
        error!(error = ?err, "failed to install cron schedule");
    }

    let state = AppState { store, agent, runs };
    let router = api::router(state).merge(metrics.router());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!(
        port,
        version = env!("CARGO_PKG_VERSION"),
        "financial news agent is running"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
