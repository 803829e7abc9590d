//! Configuration for the overlay subsystem.
//!
//! The user configuration lives in `~/.fieldoverlay/config.ini`:
//!
//! ```ini
//! [overlays]
//! directory = ~/.fieldoverlay/overlays
//! container_extensions = gpkg, gpkx
//!
//! [import]
//! decision_timeout_secs = 0
//!
//! [logging]
//! directory = ~/.fieldoverlay/logs
//! file = fieldoverlay.log
//! ```
//!
//! A missing file yields [`ConfigFile::default`]; missing keys keep their
//! default values.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_container_extensions, DEFAULT_CONTAINER_EXTENSIONS, DEFAULT_DECISION_TIMEOUT_SECS,
    DEFAULT_LOG_DIR_NAME, DEFAULT_LOG_FILE, DEFAULT_OVERLAY_DIR_NAME,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, ImportSettings, LoggingSettings, OverlaySettings};
