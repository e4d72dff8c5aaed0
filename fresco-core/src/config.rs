//! Application configuration management.
//!
//! Handles loading, saving, and accessing the deployment configuration:
//! runtime environment, database location, logging, the unconfigured-setup
//! window, export output, and telemetry. Configuration is persisted as TOML.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::UNCONFIGURED_TIMEOUT_MS;
use crate::error::{FrescoError, FrescoResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Runtime environment. Development unlocks privileged maintenance operations.
    #[serde(default)]
    pub environment: Environment,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// First-run setup settings.
    #[serde(default)]
    pub setup: SetupConfig,

    /// Interview export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Analytics settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Runtime environment of the deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. If empty, uses default location.
    #[serde(default)]
    pub path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Run integrity check on startup.
    #[serde(default = "default_true")]
    pub integrity_check_on_startup: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// First-run setup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// How long an unconfigured installation stays usable, in milliseconds.
    #[serde(default = "default_unconfigured_timeout")]
    pub unconfigured_timeout_ms: i64,
}

/// Interview export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory export bundles are written to. If empty, uses `<data_dir>/exports`.
    #[serde(default)]
    pub output_directory: String,

    /// Pretty-print exported JSON.
    #[serde(default)]
    pub pretty_print: bool,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Send events to the analytics endpoint. When false, events are only logged.
    #[serde(default)]
    pub enabled: bool,

    /// Analytics ingestion endpoint.
    #[serde(default)]
    pub endpoint: String,

    /// Identifier attached to every event from this installation.
    #[serde(default)]
    pub installation_id: String,
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_unconfigured_timeout() -> i64 {
    UNCONFIGURED_TIMEOUT_MS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            wal_mode: true,
            pool_size: default_pool_size(),
            integrity_check_on_startup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            unconfigured_timeout_ms: default_unconfigured_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: String::new(),
            pretty_print: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            installation_id: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file path, or defaults if absent.
    pub fn load_default() -> FrescoResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> FrescoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> FrescoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FrescoError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration file path.
    pub fn default_config_path() -> FrescoResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Effective database path, using the configured path or the default.
    pub fn effective_db_path(&self) -> FrescoResult<PathBuf> {
        if self.database.path.is_empty() {
            Ok(Platform::data_dir()?.join("fresco.db"))
        } else {
            Ok(PathBuf::from(&self.database.path))
        }
    }

    /// Effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> FrescoResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(Platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Effective export directory, using the configured path or the default.
    pub fn effective_export_dir(&self) -> FrescoResult<PathBuf> {
        if self.export.output_directory.is_empty() {
            Ok(Platform::data_dir()?.join("exports"))
        } else {
            Ok(PathBuf::from(&self.export.output_directory))
        }
    }

    /// Whether events should be shipped to an analytics endpoint.
    pub fn is_telemetry_enabled(&self) -> bool {
        self.telemetry.enabled && !self.telemetry.endpoint.is_empty()
    }
}

/// Thread-safe configuration holder for shared access across services.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Clone out the current configuration.
    pub async fn snapshot(&self) -> AppConfig {
        self.inner.read().await.clone()
    }
}
