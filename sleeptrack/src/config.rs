//! Configuration loading.
//!
//! Reads `<config dir>/sleeptrack/config.toml` when present, then applies
//! `SLEEPTRACK_DB` and `SLEEPTRACK_LOG` from the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::db::Database;

const CONFIG_FILE: &str = "config.toml";
const ENV_DB: &str = "SLEEPTRACK_DB";
const ENV_LOG: &str = "SLEEPTRACK_LOG";

/// Default tracing filter when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// User configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the sleep database lives.
    pub database_path: Option<PathBuf>,
    /// Tracing filter directive, e.g. `info` or `sleeptrack=debug`.
    pub log_level: Option<String>,
}

impl Config {
    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sleeptrack").join(CONFIG_FILE))
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Override fields from environment lookups.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log_level = Some(level);
        }
    }

    /// Resolve the database path: explicit override, then config, then default.
    pub fn database_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Database::default_path(),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
