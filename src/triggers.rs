// src/triggers.rs
//! Automatic run triggers: startup, fixed interval, and cron schedule.
//!
//! `Triggers` owns at most one interval task and at most one cron
//! scheduler. Reconfiguring either kind clears the previous registration
//! first, so repeated calls never accumulate timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::agent::Agent;
use crate::config::{IntervalConfig, ScheduleConfig};

pub struct Triggers {
    interval: Mutex<Option<JoinHandle<()>>>,
    cron: Mutex<Option<JobScheduler>>,
}

impl Triggers {
    pub fn new() -> Self {
        Self {
            interval: Mutex::new(None),
            cron: Mutex::new(None),
        }
    }

    /// Install (or clear) the periodic trigger.
    ///
    /// The first tick fires one period after installation, not immediately.
    /// Run failures are logged and the timer keeps ticking.
    pub async fn configure_interval(&self, agent: Arc<Agent>, cfg: &IntervalConfig) {
        let mut slot = self.interval.lock().await;
        if let Some(previous) = slot.take() {
            info!("clearing previous interval timer");
            previous.abort();
        }
        if !cfg.enabled {
            return;
        }

        let minutes = cfg.minutes.max(1);
        info!(minutes, "setting up interval execution");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
            // The first tick completes immediately; swallow it so the run
            // cadence starts one full period from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!(minutes, "running agent on interval");
                if let Err(err) = agent.run().await {
                    error!(error = ?err, "interval run failed");
                }
            }
        });
        *slot = Some(handle);
    }

    /// Install (or clear) the cron trigger. Expressions use the
    /// seconds-resolution cron form, e.g. `0 0 9 * * Mon-Fri`.
    pub async fn configure_schedule(
        &self,
        agent: Arc<Agent>,
        cfg: &ScheduleConfig,
    ) -> anyhow::Result<()> {
        let mut slot = self.cron.lock().await;
        if let Some(mut previous) = slot.take() {
            info!("shutting down previous cron scheduler");
            if let Err(err) = previous.shutdown().await {
                error!(error = ?err, "previous cron scheduler did not shut down cleanly");
            }
        }
        if !cfg.enabled {
            return Ok(());
        }

        let expression = cfg.cron.clone();
        info!(cron = %expression, "scheduling agent runs");
        let scheduler = JobScheduler::new().await?;
        let job_expression = expression.clone();
        let job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
            let agent = agent.clone();
            let cron = job_expression.clone();
            Box::pin(async move {
                info!(cron = %cron, "running agent on schedule");
                if let Err(err) = agent.run().await {
                    error!(error = ?err, "scheduled run failed");
                }
            })
        })?;
        scheduler.add(job).await?;
        scheduler.start().await?;
        *slot = Some(scheduler);
        Ok(())
    }

    /// True while an interval timer is installed.
    pub async fn interval_active(&self) -> bool {
        self.interval.lock().await.is_some()
    }

    /// True while a cron scheduler is installed.
    pub async fn schedule_active(&self) -> bool {
        self.cron.lock().await.is_some()
    }
}

impl Default for Triggers {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire one run right away, off the caller's task. Failures are logged,
/// never fatal to the host.
pub fn spawn_startup_run(agent: Arc<Agent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("running agent on startup");
        if let Err(err) = agent.run().await {
            error!(error = ?err, "startup run failed");
        }
    })
}
