// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::types::Tone;
use crate::refresh::{DEFAULT_NOTIFICATION_TICKS, DEFAULT_PERIOD_TICKS};

pub const ENV_CONFIG_PATH: &str = "NEWSDESK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/newsdesk.toml";

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_tick_secs() -> u64 {
    1
}
fn default_period_ticks() -> u32 {
    DEFAULT_PERIOD_TICKS
}
fn default_notification_ticks() -> u32 {
    DEFAULT_NOTIFICATION_TICKS
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL of the summaries API; `/news` is appended.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub default_tone: Tone,
    /// Length of one countdown tick.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_period_ticks")]
    pub refresh_period_ticks: u32,
    #[serde(default = "default_notification_ticks")]
    pub notification_ticks: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Serve this JSON file instead of calling the API.
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_tone: Tone::default(),
            tick_secs: default_tick_secs(),
            refresh_period_ticks: default_period_ticks(),
            notification_ticks: default_notification_ticks(),
            request_timeout_secs: default_request_timeout_secs(),
            bind_addr: default_bind_addr(),
            fixture_path: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolve config with env var + fallbacks:
    /// 1) $NEWSDESK_CONFIG
    /// 2) config/newsdesk.toml
    /// 3) built-in defaults
    ///
    /// then apply `NEWSDESK_API_BASE_URL`, `NEWSDESK_BIND`, `NEWSDESK_TICK_SECS`.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from_file(&fallback)?
            } else {
                Self::default()
            }
        };
        Ok(cfg.with_env_overrides().sanitized())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("NEWSDESK_API_BASE_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(bind) = std::env::var("NEWSDESK_BIND") {
            if !bind.trim().is_empty() {
                self.bind_addr = bind.trim().to_string();
            }
        }
        if let Some(secs) = std::env::var("NEWSDESK_TICK_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.tick_secs = secs;
        }
        self
    }

    /// Zero durations fall back to defaults.
    fn sanitized(mut self) -> Self {
        if self.tick_secs == 0 {
            self.tick_secs = default_tick_secs();
        }
        if self.refresh_period_ticks == 0 {
            self.refresh_period_ticks = default_period_ticks();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        self
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
