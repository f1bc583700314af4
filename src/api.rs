// src/api.rs
//! HTTP control surface: manual trigger, status, health.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::agent::{Agent, RunOutcome, RunTracker};
use crate::config::ConfigStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub agent: Arc<Agent>,
    pub runs: Arc<RunTracker>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/trigger", post(trigger))
        .route("/status", get(status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct TriggerResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Kick off one run and wait for it. A run that found no news still counts
/// as a success; only adapter failures map to 500.
async fn trigger(State(state): State<AppState>) -> (StatusCode, Json<TriggerResponse>) {
    info!("manual trigger received");
    match state.agent.run().await {
        Ok(RunOutcome::Posted { post_id }) => (
            StatusCode::OK,
            Json(TriggerResponse {
                success: true,
                message: Some(format!("Agent executed successfully, posted {post_id}")),
                error: None,
            }),
        ),
        Ok(RunOutcome::NoNews) => (
            StatusCode::OK,
            Json(TriggerResponse {
                success: true,
                message: Some("Agent executed, no news to post".to_string()),
                error: None,
            }),
        ),
        Err(err) => {
            error!(error = ?err, "manual trigger failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse {
                    success: false,
                    message: None,
                    error: Some("Failed to execute agent".to_string()),
                }),
            )
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    last_run: String,
    interval_enabled: bool,
    interval_minutes: u64,
    schedule_enabled: bool,
    schedule_cron: String,
}

/// Liveness plus trigger configuration. Never fails: an unreadable config
/// document degrades to default values rather than an error status.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let cfg = state
        .store
        .load()
        .map(|cfg| (*cfg).clone())
        .unwrap_or_default();
    let last_run = state
        .runs
        .last_run()
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "Never".to_string());

    Json(StatusResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        last_run,
        interval_enabled: cfg.interval.enabled,
        interval_minutes: cfg.interval.minutes,
        schedule_enabled: cfg.schedule.enabled,
        schedule_cron: cfg.schedule.cron,
    })
}
