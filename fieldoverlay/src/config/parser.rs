//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [overlays] section
    if let Some(section) = ini.section(Some("overlays")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.overlays.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("container_extensions") {
            let extensions = parse_extensions(v);
            if extensions.is_empty() {
                return Err(ConfigFileError::InvalidValue {
                    section: "overlays".to_string(),
                    key: "container_extensions".to_string(),
                    value: v.to_string(),
                    reason: "expected a comma-separated list like 'gpkg, gpkx'".to_string(),
                });
            }
            config.overlays.container_extensions = extensions;
        }
    }

    // [import] section
    if let Some(section) = ini.section(Some("import")) {
        if let Some(v) = section.get("decision_timeout_secs") {
            config.import.decision_timeout_secs =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "import".to_string(),
                    key: "decision_timeout_secs".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (seconds, 0 = wait indefinitely)"
                        .to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Split a comma-separated extension list, dropping dots and blanks.
fn parse_extensions(value: &str) -> Vec<String> {
    let mut extensions: Vec<String> = value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    extensions.dedup();
    extensions
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::config::settings::ConfigFile;
    use std::time::Duration;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_overlay_section() {
        let config = load(
            r#"
[overlays]
directory = /srv/overlays
container_extensions = .GPKG, gpkx ,mbtiles
"#,
        )
        .unwrap();

        assert_eq!(config.overlays.directory, PathBuf::from("/srv/overlays"));
        assert_eq!(config.overlays.container_extensions, vec!["gpkg", "gpkx", "mbtiles"]);
    }

    #[test]
    fn test_empty_extension_list_is_invalid() {
        let err = load("[overlays]\ncontainer_extensions = , ,\n").unwrap_err();
        assert!(err.to_string().contains("overlays.container_extensions"));
    }

    #[test]
    fn test_decision_timeout() {
        let config = load("[import]\ndecision_timeout_secs = 45\n").unwrap();
        assert_eq!(config.import.decision_timeout(), Some(Duration::from_secs(45)));

        let err = load("[import]\ndecision_timeout_secs = soon\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { ref key, .. } if key == "decision_timeout_secs"));
    }

    #[test]
    fn test_logging_section() {
        let config = load("[logging]\ndirectory = /var/log/fo\nfile = run.log\n").unwrap();
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/fo"));
        assert_eq!(config.logging.file, "run.log");
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = load("[overlays]\n[import]\n").unwrap();
        assert_eq!(config.overlays.container_extensions, default_container_extensions());
        assert_eq!(config.import.decision_timeout_secs, DEFAULT_DECISION_TIMEOUT_SECS);
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/data"), home.join("data"));
        }
        assert_eq!(expand_tilde("/abs/data"), PathBuf::from("/abs/data"));
    }
}
