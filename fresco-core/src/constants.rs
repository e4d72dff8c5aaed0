//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "Fresco";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long an installation may stay unconfigured before it locks down (1 hour).
pub const UNCONFIGURED_TIMEOUT_MS: i64 = 60 * 60 * 1000;

/// Lifetime of a freshly issued user session (30 days).
pub const SESSION_TTL_DAYS: i64 = 30;

/// Database schema version.
pub const DB_SCHEMA_VERSION: i32 = 2;

/// Cache tags used for read-through invalidation.
pub mod cache_tags {
    /// Tag covering the AppSettings singleton read.
    pub const APP_SETTINGS_GET: &str = "appSettings.get";
}

/// User-facing messages returned across the service boundary.
pub mod messages {
    pub const EXPORT_FAILED: &str = "Failed to export interview sessions!";
    pub const EXPORT_REQUIRES_LOGIN: &str = "You must be logged in to export interview sessions!";
    pub const CREATE_SETTINGS_FAILED: &str = "Failed to create appSettings";
    pub const UPDATE_SETTINGS_FAILED: &str = "Failed to update appSettings";
    pub const RESET_SETTINGS_FAILED: &str = "Failed to reset appSettings";
}

/// Route reported with export failures in telemetry.
pub const INTERVIEWS_PATH: &str = "/dashboard/interviews";
