//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Overlay directory settings
    pub overlays: OverlaySettings,
    /// Import workflow settings
    pub import: ImportSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Where overlay datasets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySettings {
    /// Directory scanned for containers and tile directories
    pub directory: PathBuf,
    /// Container file extensions, lowercase, without the leading dot
    pub container_extensions: Vec<String>,
}

/// Import workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Seconds to wait for a collision decision; 0 waits indefinitely
    pub decision_timeout_secs: u64,
}

impl ImportSettings {
    /// The decision timeout, or `None` to wait indefinitely.
    pub fn decision_timeout(&self) -> Option<Duration> {
        (self.decision_timeout_secs > 0).then(|| Duration::from_secs(self.decision_timeout_secs))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log directory
    pub directory: PathBuf,
    /// Log file name inside `directory`
    pub file: String,
}
