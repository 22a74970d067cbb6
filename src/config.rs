//! Front-end settings persisted on disk.
//!
//! The file lives at `<config dir>/h2mm-gui/config.json`. Every field has a
//! default, so a missing file or a partial document is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::runner::{DEFAULT_DRAIN_TIMEOUT, RunnerOptions};
use crate::tool::ToolSource;

/// Environment variable that forces a custom tool path.
pub const TOOL_ENV_VAR: &str = "H2MM_CLI";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tool: ToolSource,
    pub runner: RunnerSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub drain_timeout_ms: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            drain_timeout: Duration::from_millis(self.runner.drain_timeout_ms),
        }
    }

    /// Apply an override tool path (usually the value of [`TOOL_ENV_VAR`]).
    /// Blank values are ignored.
    pub fn with_tool_override(mut self, path: Option<String>) -> Self {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            debug!("Tool path overridden to {}", path);
            self.tool = ToolSource::custom(path);
        }
        self
    }

    /// Apply the [`TOOL_ENV_VAR`] override from the process environment.
    pub fn with_env_override(self) -> Self {
        self.with_tool_override(std::env::var(TOOL_ENV_VAR).ok())
    }
}

/// `~/.config/h2mm-gui/config.json` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("h2mm-gui")
        .join("config.json")
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config =
        serde_json::from_str(&raw).with_context(|| format!("Invalid config JSON at {}", path.display()))?;
    Ok(config)
}

/// Like [`load`], but a missing or unreadable file yields the defaults.
pub fn load_or_default(path: &Path) -> Config {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Config::default();
    }
    match load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config: {:#}", e);
            Config::default()
        }
    }
}

pub fn save(path: &Path, config: &Config) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    write_atomic(path, &data)
}

fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("Failed to write temp file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {} with {}", path.display(), tmp.display()))?;
    Ok(())
}
