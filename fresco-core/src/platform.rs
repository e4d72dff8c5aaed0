//! Platform-specific directory resolution.

use std::path::PathBuf;
use crate::constants::APP_NAME;
use crate::error::{FrescoError, FrescoResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Application data directory (database, logs, exports).
    ///
    /// - Windows: `%APPDATA%/Fresco`
    /// - macOS: `~/Library/Application Support/Fresco`
    /// - Linux: `~/.local/share/Fresco`
    pub fn data_dir() -> FrescoResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| FrescoError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Application configuration directory.
    pub fn config_dir() -> FrescoResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| FrescoError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
