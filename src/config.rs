//! Layered configuration for campaign runs.
//!
//! Values resolve file → environment → CLI: `adloom.toml` (all sections
//! optional, missing file means defaults), then `ADLOOM_*` environment
//! overrides for the workflow knobs, then explicit CLI flags applied by
//! the command layer. The API key is environment-only (`.env` supported).
//!
//! ```toml
//! [workflow]
//! max_revisions = 3
//! quality_threshold = 80
//! max_duration_secs = 300
//! max_steps = 150
//!
//! [retry]
//! max_attempts = 2
//! initial_delay_ms = 2000
//! breaker_threshold = 5
//!
//! [service]
//! base_url = "https://api.openai.com/v1"
//! completion_model = "gpt-4o-mini"
//! image_model = "dall-e-3"
//! image_size = "1024x1024"
//! ```

use crate::service::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_max_revisions() -> u32 {
    3
}
fn default_quality_threshold() -> u8 {
    80
}
fn default_max_duration_secs() -> u64 {
    300
}
fn default_max_steps() -> u32 {
    150
}
fn default_max_attempts() -> u32 {
    2
}
fn default_initial_delay_ms() -> u64 {
    2000
}
fn default_breaker_threshold() -> u32 {
    5
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_image_size() -> String {
    "1024x1024".to_string()
}

/// Decision-point knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Revision loops before the router is forced to complete.
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
    /// Quality score at which the workflow completes early.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: u8,
    /// Wall-clock ceiling for a run.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    /// Structural backstop on node executions, independent of time.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_revisions: default_max_revisions(),
            quality_threshold: default_quality_threshold(),
            max_duration_secs: default_max_duration_secs(),
            max_steps: default_max_steps(),
        }
    }
}

impl WorkflowConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

/// Per-invocation retry and breaker settings for the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Consecutive failures across all stages before the breaker opens.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            breaker_threshold: default_breaker_threshold(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
        }
    }
}

/// Upstream service endpoint and model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            completion_model: default_completion_model(),
            image_model: default_image_model(),
            image_size: default_image_size(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdloomConfig {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl AdloomConfig {
    /// Load from the given file, falling back to defaults when the file is
    /// absent. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            Some(path) => {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            None => {
                let default_path = Path::new("adloom.toml");
                if default_path.exists() {
                    let raw = std::fs::read_to_string(default_path)
                        .context("Failed to read adloom.toml")?;
                    toml::from_str(&raw).context("Failed to parse adloom.toml")?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `ADLOOM_*` environment overrides for the workflow knobs.
    fn apply_env(&mut self) {
        if let Some(v) = env_parse("ADLOOM_MAX_REVISIONS") {
            self.workflow.max_revisions = v;
        }
        if let Some(v) = env_parse("ADLOOM_QUALITY_THRESHOLD") {
            self.workflow.quality_threshold = v;
        }
        if let Some(v) = env_parse("ADLOOM_MAX_DURATION_SECS") {
            self.workflow.max_duration_secs = v;
        }
        if let Ok(v) = std::env::var("ADLOOM_BASE_URL") {
            self.service.base_url = v;
        }
        if let Ok(v) = std::env::var("ADLOOM_COMPLETION_MODEL") {
            self.service.completion_model = v;
        }
    }

    /// Resolve the API key from the environment (`.env` supported).
    /// `ADLOOM_API_KEY` wins over `OPENAI_API_KEY`.
    pub fn api_key() -> Result<String> {
        dotenvy::dotenv().ok();
        std::env::var("ADLOOM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .context("No API key found; set ADLOOM_API_KEY or OPENAI_API_KEY")
    }

    /// Default config rendered as TOML, for `adloom config init`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).expect("default config serializes")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
