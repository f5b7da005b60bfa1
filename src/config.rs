//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSHARE_CONFIG` (environment variable)
//! 2. `~/.config/mailshare/config.toml` (Linux)
//!    `~/Library/Application Support/mailshare/config.toml` (macOS)
//!    `%APPDATA%\mailshare\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::mail::{DEFAULT_HEADER_SCAN_CHARS, DEFAULT_RAW_PREVIEW_CHARS};
use crate::proxy::DEFAULT_LIMIT;
use crate::store::tokens::DEFAULT_VIEWER_URL;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail viewer settings.
    pub viewer: ViewerSettings,
    /// Upstream mailbox API settings.
    pub upstream: UpstreamConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override data directory for the token store and logs.
    pub data_dir: Option<PathBuf>,
}

/// Mail viewer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Base URL share links point at.
    pub viewer_url: String,
    /// Messages requested per page; `0` defers to `upstream.default_limit`.
    pub page_size: u32,
    /// Raw characters shown when a message has no readable body.
    pub raw_preview_chars: usize,
    /// Characters scanned for headers when building a message list.
    pub list_header_scan_bytes: usize,
}

/// Upstream mailbox API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `limit` sent when the caller gives none.
    pub default_limit: u32,
}

impl Config {
    /// `limit` for a viewer page request that names none.
    pub fn page_limit(&self) -> u32 {
        if self.viewer.page_size > 0 {
            self.viewer.page_size
        } else {
            self.upstream.default_limit
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            data_dir: None,
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
            page_size: DEFAULT_LIMIT,
            raw_preview_chars: DEFAULT_RAW_PREVIEW_CHARS,
            list_header_scan_bytes: DEFAULT_HEADER_SCAN_CHARS,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSHARE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailshare").join("config.toml"))
}

/// Return the data directory for the token store and logs.
pub fn data_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.data_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailshare")
}

/// Return the token store path.
pub fn token_store_path(config: &Config) -> PathBuf {
    data_dir(config).join("tokens.json")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    data_dir(config).join("mailshare.log")
}
