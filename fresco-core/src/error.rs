//! Global error types for Fresco.
//!
//! All error categories across the application are unified into a single
//! `FrescoError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using FrescoError.
pub type FrescoResult<T> = Result<T, FrescoError>;

/// Unified error type covering all error categories in Fresco.
#[derive(Error, Debug)]
pub enum FrescoError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Database errors --
    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. "protocol").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    // -- Access errors --
    /// The request carries no authenticated session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request is authenticated but lacks the required privilege.
    #[error("forbidden: {0}")]
    Forbidden(String),

    // -- Export errors --
    /// The export engine reported a failure.
    #[error("export failed: {0}")]
    Export(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service is not yet initialized.
    #[error("service not initialized: {0}")]
    ServiceNotInitialized(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrescoError {
    /// Whether this error is an access precondition failure.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }
}

impl From<serde_json::Error> for FrescoError {
    fn from(e: serde_json::Error) -> Self {
        FrescoError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for FrescoError {
    fn from(e: toml::de::Error) -> Self {
        FrescoError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresco_error_display() {
        let err = FrescoError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn test_not_found_display() {
        let err = FrescoError::NotFound {
            entity: "protocol",
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "protocol not found: abc");
    }

    #[test]
    fn test_access_denied() {
        assert!(FrescoError::Unauthorized("no session".into()).is_access_denied());
        assert!(FrescoError::Forbidden("dev only".into()).is_access_denied());
        assert!(!FrescoError::Export("engine down".into()).is_access_denied());
    }

    #[test]
    fn test_from_serde_json() {
        let err: FrescoError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FrescoError::Serialization(_)));
    }
}
