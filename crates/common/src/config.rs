//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filter parameters handed to the compositor at construction.
    pub filter: FilterConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Static filter parameters. Read once when the filter is built and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Logo offset along x, in pixels. May be negative.
    pub offset_x: i32,

    /// Logo offset along y, in pixels. May be negative.
    pub offset_y: i32,

    /// Transform selection: "embed", "pre", "post" (or "0", "1", "2").
    /// Validated when the filter initializes, not here.
    pub func: String,

    /// How the two inputs are paired.
    pub sync: SyncMode,
}

/// Pairing strategy for the two input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Pair queue heads in arrival order.
    #[default]
    Fifo,
    /// Skip stale logo frames so the logo timestamp trails the primary one.
    Timestamp,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tmblock=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            func: "embed".to_string(),
            sync: SyncMode::Fifo,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = crate::error::TmblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "timestamp" | "pts" => Ok(Self::Timestamp),
            other => Err(crate::error::TmblockError::config(format!(
                "unknown sync mode '{other}' (expected fifo or timestamp)"
            ))),
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file. Missing fields take defaults.
    pub fn load_from(path: &Path) -> crate::error::TmblockResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the given location.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("tmblock").join("config.json")
}
