//! Layered engine configuration: defaults, then an optional TOML file,
//! then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiscError, Result};
use crate::session::SessionOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SKILLDISC_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matcher: MatcherConfig,
    pub budget: BudgetConfig,
    pub load: LoadConfig,
}

/// Trigger matcher tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Weight of an exact phrase match (highest factor)
    pub phrase_weight: f32,
    /// Weight of declared trigger-keyword matches
    pub keyword_weight: f32,
    /// Weight of loose token/stem overlap (lowest factor)
    pub token_weight: f32,
    /// Skills scoring below this are excluded from ranking entirely
    pub min_relevance: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            phrase_weight: 0.5,
            keyword_weight: 0.3,
            token_weight: 0.2,
            min_relevance: 0.0,
        }
    }
}

/// Session budget tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Default per-session capacity in size units
    pub capacity: u64,
    /// Per-session reference cache entries
    pub reference_cache_entries: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            capacity: 8_000,
            reference_cache_entries: crate::resolver::DEFAULT_CACHE_ENTRIES,
        }
    }
}

/// Source load/fetch deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub scan_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 2_000,
            fetch_timeout_ms: 1_000,
        }
    }
}

impl Config {
    /// Load configuration: defaults, overridden by the explicit file (or
    /// `SKILLDISC_CONFIG`, or the global config file when present), then
    /// by `SKILLDISC_*` environment variables.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = if let Some(path) = explicit {
            Self::from_file(&path)?
        } else if let Some(global) = Self::global_path().filter(|p| p.is_file()) {
            Self::from_file(&global)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DiscError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| DiscError::Config(format!("{}: {e}", path.display())))
    }

    fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("skilldisc").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(capacity) = env_parse::<u64>("SKILLDISC_BUDGET_CAPACITY")? {
            self.budget.capacity = capacity;
        }
        if let Some(min_relevance) = env_parse::<f32>("SKILLDISC_MIN_RELEVANCE")? {
            self.matcher.min_relevance = min_relevance;
        }
        if let Some(ms) = env_parse::<u64>("SKILLDISC_SCAN_TIMEOUT_MS")? {
            self.load.scan_timeout_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("SKILLDISC_FETCH_TIMEOUT_MS")? {
            self.load.fetch_timeout_ms = ms;
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.load.scan_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.load.fetch_timeout_ms)
    }

    /// Session options derived from this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            capacity: self.budget.capacity,
            fetch_timeout: self.fetch_timeout(),
            reference_cache_entries: self.budget.reference_cache_entries,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| DiscError::Config(format!("{key}: cannot parse '{value}'"))),
        Err(_) => Ok(None),
    }
}
