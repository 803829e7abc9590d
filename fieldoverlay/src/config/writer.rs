//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[overlays]
; Directory scanned for overlay datasets. Layout:
;   <directory>/<name>.gpkg                       local containers
;   <directory>/<name>/{{z}}/{{x}}/{{y}}.png          tiled image directories
;   <directory>/geopackages/<layer_id>/<name>.gpkg  server layers (event scoped)
directory = {}
; Comma-separated container file extensions (default: gpkg, gpkx)
container_extensions = {}

[import]
; Seconds to wait for an answer when an import collides with an existing
; overlay before giving up and skipping the import (default: 0 = wait forever)
decision_timeout_secs = {}

[logging]
; Directory for log files
directory = {}
; Log file name (cleared at the start of each session)
file = {}
"#,
        path_to_string(&config.overlays.directory),
        config.overlays.container_extensions.join(", "),
        config.import.decision_timeout_secs,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Render a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use super::to_config_string;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.overlays.directory = temp_dir.path().join("overlays");
        config.overlays.container_extensions = vec!["gpkg".to_string(), "mbtiles".to_string()];
        config.import.decision_timeout_secs = 30;
        config.logging.directory = PathBuf::from("/var/log/fieldoverlay");
        config.logging.file = "session.log".to_string();

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_written_file_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[overlays]"));
        assert!(content.contains("; Comma-separated container file extensions"));
        assert!(content.contains("container_extensions = gpkg, gpkx"));
        assert!(content.contains("decision_timeout_secs = 0"));
    }
}
