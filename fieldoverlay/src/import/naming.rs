//! Overlay names derived from files on disk.

use std::path::Path;

/// Name of the dataset at `path`: the file stem, or the directory name.
pub fn derive_name(path: &Path) -> Option<String> {
    let name = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    }?;
    let name = name.to_string_lossy();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// `"{base}_{n}"`.
pub fn numbered_name(base: &str, n: u32) -> String {
    format!("{}_{}", base, n)
}

/// Whether `path` has one of `extensions` (case-insensitive, no dot).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derive_name_from_file() {
        assert_eq!(derive_name(Path::new("/data/roads.gpkg")), Some("roads".to_string()));
        assert_eq!(derive_name(Path::new("/data/archive.tar.gpkg")), Some("archive.tar".to_string()));
    }

    #[test]
    fn test_derive_name_from_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("imagery.v2");
        std::fs::create_dir(&dir).unwrap();
        assert_eq!(derive_name(&dir), Some("imagery.v2".to_string()));
    }

    #[test]
    fn test_derive_name_rejects_empty() {
        assert_eq!(derive_name(Path::new("/")), None);
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("roads", 2), "roads_2");
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["gpkg".to_string(), "gpkx".to_string()];
        assert!(has_extension(Path::new("a.GPKG"), &exts));
        assert!(has_extension(Path::new("a.gpkx"), &exts));
        assert!(!has_extension(Path::new("a.zip"), &exts));
        assert!(!has_extension(Path::new("gpkg"), &exts));
    }
}
