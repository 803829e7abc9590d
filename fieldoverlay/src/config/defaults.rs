//! Default values and constants for all configuration settings.

use super::file::config_directory;
use super::settings::*;

/// Container file extensions recognised when the config names none.
pub const DEFAULT_CONTAINER_EXTENSIONS: &[&str] = &["gpkg", "gpkx"];

/// Default collision decision timeout; 0 waits indefinitely.
pub const DEFAULT_DECISION_TIMEOUT_SECS: u64 = 0;

/// Overlay directory name under the config directory.
pub const DEFAULT_OVERLAY_DIR_NAME: &str = "overlays";

/// Log directory name under the config directory.
pub const DEFAULT_LOG_DIR_NAME: &str = "logs";

/// Log file name.
pub const DEFAULT_LOG_FILE: &str = "fieldoverlay.log";

pub fn default_container_extensions() -> Vec<String> {
    DEFAULT_CONTAINER_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = config_directory();

        Self {
            overlays: OverlaySettings {
                directory: config_dir.join(DEFAULT_OVERLAY_DIR_NAME),
                container_extensions: default_container_extensions(),
            },
            import: ImportSettings {
                decision_timeout_secs: DEFAULT_DECISION_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                directory: config_dir.join(DEFAULT_LOG_DIR_NAME),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
