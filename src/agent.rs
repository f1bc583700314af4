// src/agent.rs
//! The run pipeline: fetch news, generate post text, publish.
//!
//! Runs are deliberately not serialized against each other. Triggers that
//! fire close together race through the same three stages independently;
//! the last-run cell is last-write-wins.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigStore};
use crate::error::AgentError;
use crate::news::{NewsQuery, NewsSource};
use crate::publish::Publisher;
use crate::summarize::Summarizer;
use crate::timefmt::format_av_timestamp;

fn ensure_metrics_described() {
    static DESCRIBED: OnceCell<()> = OnceCell::new();
    DESCRIBED.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline runs started.");
        describe_counter!("pipeline_posts_total", "Runs that published a post.");
        describe_counter!(
            "pipeline_empty_total",
            "Runs aborted early on an empty news feed."
        );
        describe_counter!("pipeline_failures_total", "Runs that failed in an adapter.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix timestamp of the most recently started run."
        );
    });
}

/// Remembers when a run last started. Overwritten at the start of every
/// run, successful or not; no history is kept.
#[derive(Debug, Default)]
pub struct RunTracker {
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) -> DateTime<Utc> {
        let now = Utc::now();
        *self.last_run.lock().expect("run tracker mutex poisoned") = Some(now);
        now
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock().expect("run tracker mutex poisoned")
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A post went out; carries the platform id of the created post.
    Posted { post_id: String },
    /// The fetch came back empty; nothing was summarized or published.
    NoNews,
}

pub struct Agent {
    store: Arc<ConfigStore>,
    news: Arc<dyn NewsSource>,
    summarizer: Summarizer,
    publisher: Arc<dyn Publisher>,
    runs: Arc<RunTracker>,
}

impl Agent {
    pub fn new(
        store: Arc<ConfigStore>,
        news: Arc<dyn NewsSource>,
        summarizer: Summarizer,
        publisher: Arc<dyn Publisher>,
        runs: Arc<RunTracker>,
    ) -> Self {
        Self {
            store,
            news,
            summarizer,
            publisher,
            runs,
        }
    }

    pub fn runs(&self) -> &Arc<RunTracker> {
        &self.runs
    }

    /// One end-to-end run.
    pub async fn run(&self) -> Result<RunOutcome, AgentError> {
        ensure_metrics_described();
        let started = self.runs.mark_started();
        counter!("pipeline_runs_total").increment(1);
        gauge!("pipeline_last_run_ts").set(started.timestamp() as f64);
        info!("starting agent run");

        match self.run_pipeline().await {
            Ok(outcome) => {
                if matches!(outcome, RunOutcome::Posted { .. }) {
                    counter!("pipeline_posts_total").increment(1);
                }
                Ok(outcome)
            }
            Err(err) => {
                counter!("pipeline_failures_total").increment(1);
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self) -> Result<RunOutcome, AgentError> {
        let cfg = self.store.load()?;

        let batch = if cfg.skip_alpha_vantage_api {
            info!("news fetch disabled by configuration, running in topic mode");
            None
        } else {
            let query = build_news_query(&cfg, Utc::now());
            info!(
                source = self.news.name(),
                topics = ?query.topics,
                limit = query.limit,
                "fetching financial news"
            );
            let batch = self.news.fetch(&query).await?;
            if batch.is_empty() {
                warn!("no news items in the requested window, skipping this run");
                counter!("pipeline_empty_total").increment(1);
                return Ok(RunOutcome::NoNews);
            }
            info!(items = batch.len(), "processing news items");
            Some(batch)
        };

        let text = self
            .summarizer
            .summarize(batch.as_ref(), cfg.gemini.prompt.as_deref(), &cfg.gemini.topics)
            .await?;

        let post_id = self.publisher.publish(&text).await?;
        info!(%post_id, publisher = self.publisher.name(), "run completed");
        Ok(RunOutcome::Posted { post_id })
    }
}

/// Derive the query for one fetch from the current configuration.
pub fn build_news_query(cfg: &AppConfig, now: DateTime<Utc>) -> NewsQuery {
    NewsQuery {
        topics: cfg.alphavantage.topics.clone(),
        limit: cfg.alphavantage.limit,
        time_from: resolve_time_from(cfg, now),
        sort: cfg.alphavantage.sort.clone(),
    }
}

/// Lower time bound for the fetch. With `dynamicTimeFrom` the window is
/// "now minus one interval period" and overrides any static `timeFrom`.
fn resolve_time_from(cfg: &AppConfig, now: DateTime<Utc>) -> Option<String> {
    if cfg.interval.dynamic_time_from {
        let window_start = now - Duration::minutes(cfg.interval.minutes as i64);
        let time_from = format_av_timestamp(window_start);
        info!(%time_from, "using dynamic time window");
        return Some(time_from);
    }
    cfg.alphavantage.time_from.clone()
}
