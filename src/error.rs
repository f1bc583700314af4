// src/error.rs
//! Error taxonomy for the agent pipeline.
//!
//! One variant per external collaborator. Each carries the upstream failure
//! as its source so the original message survives in the chain; each aborts
//! the current run only, never the host process.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to load configuration from {}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write configuration to {}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to fetch news from Alpha Vantage")]
    NewsFetch(#[source] anyhow::Error),

    #[error("failed to generate summary")]
    Summarization(#[source] anyhow::Error),

    #[error("failed to publish post")]
    Publish(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
