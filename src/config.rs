// src/config.rs
//! Configuration document handling.
//!
//! The agent is driven by a single JSON document (camelCase keys). Every
//! section and field is optional in the file; missing pieces fall back to
//! the defaults below. The path comes from `AGENT_CONFIG_PATH`, falling
//! back to `config/agent.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AgentError;

pub const ENV_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub alphavantage: AlphaVantageConfig,
    pub gemini: GeminiConfig,
    pub twitter: TwitterConfig,
    /// Skip the news fetch entirely and run the generator in topic mode.
    pub skip_alpha_vantage_api: bool,
    pub interval: IntervalConfig,
    pub schedule: ScheduleConfig,
    pub run_on_startup: bool,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    /// Topic filters joined into the query string, e.g. `financial_markets`.
    pub topics: Vec<String>,
    pub limit: u32,
    /// Static lower time bound (`YYYYMMDDThhmm`). Ignored when the interval
    /// section asks for a dynamic window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            topics: Vec::new(),
            limit: 50,
            time_from: None,
            sort: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Fixed prompt prefix. When set it replaces the built-in instruction
    /// text; the run context (headlines or topic) is still appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Topic pool for runs without news. One entry is picked at random.
    pub topics: Vec<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-pro".to_string(),
            prompt: None,
            topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitterConfig {
    pub api_key: String,
    pub api_key_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntervalConfig {
    pub enabled: bool,
    pub minutes: u64,
    /// Derive `time_from` as "now minus one interval" on every run.
    pub dynamic_time_from: bool,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            minutes: 60,
            dynamic_time_from: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Seconds-resolution cron expression, e.g. `0 0 9 * * Mon-Fri`.
    pub cron: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    pub save_to_file: bool,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            save_to_file: false,
            file_path: "logs/agent.log".to_string(),
        }
    }
}

/// Loads the configuration document once and hands out shared snapshots.
///
/// The first successful `load` caches the parsed document; later calls are
/// lock-and-clone cheap. `update` persists a new document and swaps the
/// cache only after the write landed, so readers never observe a document
/// that is not also on disk.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cached: RwLock<Option<Arc<AppConfig>>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Resolve the document path from `AGENT_CONFIG_PATH`, falling back to
    /// the default location.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<AppConfig>, AgentError> {
        {
            let guard = self.cached.read().expect("config cache poisoned");
            if let Some(cfg) = guard.as_ref() {
                return Ok(Arc::clone(cfg));
            }
        }
        let cfg = Arc::new(self.read_from_disk()?);
        info!(path = %self.path.display(), "configuration loaded");
        *self.cached.write().expect("config cache poisoned") = Some(Arc::clone(&cfg));
        Ok(cfg)
    }

    pub fn update(&self, updated: AppConfig) -> Result<(), AgentError> {
        let json = serde_json::to_string_pretty(&updated)
            .context("serializing configuration")
            .map_err(|source| AgentError::ConfigWrite {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
            .map_err(|source| AgentError::ConfigWrite {
                path: self.path.clone(),
                source,
            })?;
        *self.cached.write().expect("config cache poisoned") = Some(Arc::new(updated));
        info!(path = %self.path.display(), "configuration updated");
        Ok(())
    }

    fn read_from_disk(&self) -> Result<AppConfig, AgentError> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
            .map_err(|source| AgentError::ConfigLoad {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&raw)
            .context("parsing configuration JSON")
            .map_err(|source| AgentError::ConfigLoad {
                path: self.path.clone(),
                source,
            })
    }
}
