// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod news;
pub mod publish;
pub mod summarize;
pub mod timefmt;
pub mod triggers;

// ---- Re-exports for stable public API ----
pub use crate::agent::{Agent, RunOutcome, RunTracker};
pub use crate::api::{router, AppState};
pub use crate::config::{AppConfig, ConfigStore};
pub use crate::error::AgentError;
