//! TOML configuration for the scheduler console.
//!
//! Layered model: compiled-in defaults, an optional config file (path from
//! `SCHEDULER_CONSOLE_CONFIG` or the standard system location), then the
//! `SCHEDULER_API_URL` override for the backend address.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SCHEDULER_CONSOLE_CONFIG";
/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "SCHEDULER_API_URL";

const SYSTEM_CONFIG_PATH: &str = "/etc/scheduler-console/console.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the console.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub table: TableConfig,
}

impl ConsoleConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded console configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path in `SCHEDULER_CONSOLE_CONFIG`.
    /// 2. `/etc/scheduler-console/console.toml`.
    /// 3. Compiled-in defaults.
    ///
    /// `SCHEDULER_API_URL` is applied on top of whichever one wins.
    pub fn load_or_default() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_env();
        config
    }

    fn load_file_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{CONFIG_ENV} set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Apply `SCHEDULER_API_URL` on top of the current values.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!(%url, "api base url overridden from environment");
                self.api.base_url = url;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// Where the scheduler backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the scheduler REST API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Geometry of the column-resize interaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Narrowest a column may be dragged, in pixels.
    pub min_column_width: f64,
    /// Distance from a header's trailing edge that counts as the resize handle.
    pub edge_threshold: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_column_width: 80.0,
            edge_threshold: 8.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.table.min_column_width, 80.0);
        assert_eq!(config.table.edge_threshold, 8.0);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://scheduler.example.com\"\n\n[logging]\njson = true"
        )
        .unwrap();

        let config = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://scheduler.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        assert!(ConsoleConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ConsoleConfig::load(Path::new("/nonexistent/console.toml")).is_err());
    }
}
