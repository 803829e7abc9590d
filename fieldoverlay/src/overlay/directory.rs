//! Tiled directory overlay: a `{zoom}/{x}/{y}.ext` tree of image tiles.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::OverlayBase;

/// Overlay backed by a directory of pre-rendered tiles.
///
/// Zoom range and tile count are computed once, when the overlay is built.
pub struct TiledDirectoryOverlay {
    pub(crate) base: OverlayBase,
    directory_path: PathBuf,
    tile_count: u64,
    min_zoom: u8,
    max_zoom: u8,
}

/// Summary of a walked tile tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TileTreeStats {
    tile_count: u64,
    min_zoom: u8,
    max_zoom: u8,
}

impl TiledDirectoryOverlay {
    /// Build an overlay by walking `directory`.
    ///
    /// The overlay is named after the directory. Non-numeric entries at the
    /// zoom and column levels are ignored.
    pub fn from_directory(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory_path = directory.into();
        let name = directory_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| directory_path.display().to_string());
        let stats = walk_tile_tree(&directory_path)?;

        Ok(Self {
            base: OverlayBase::new(name),
            directory_path,
            tile_count: stats.tile_count,
            min_zoom: stats.min_zoom,
            max_zoom: stats.max_zoom,
        })
    }

    /// Build an overlay from already-known values.
    pub fn from_parts(
        name: impl Into<String>,
        directory_path: impl Into<PathBuf>,
        tile_count: u64,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            base: OverlayBase::new(name),
            directory_path: directory_path.into(),
            tile_count,
            min_zoom,
            max_zoom,
        }
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    pub fn tile_count(&self) -> u64 {
        self.tile_count
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub(super) fn info(&self) -> Option<String> {
        Some(format!(
            "tiles: {}, zoom: {} - {}",
            self.tile_count, self.min_zoom, self.max_zoom
        ))
    }
}

impl fmt::Debug for TiledDirectoryOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiledDirectoryOverlay")
            .field("base", &self.base)
            .field("directory_path", &self.directory_path)
            .field("tile_count", &self.tile_count)
            .field("zoom", &(self.min_zoom, self.max_zoom))
            .finish()
    }
}

/// Whether `path` looks like a tile tree: a directory with at least one
/// numeric child directory.
pub fn is_tile_directory(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    match fs::read_dir(path) {
        Ok(entries) => entries
            .flatten()
            .any(|e| e.path().is_dir() && parse_level(&e.path()).is_some()),
        Err(_) => false,
    }
}

fn parse_level(path: &Path) -> Option<u32> {
    path.file_name()?.to_str()?.parse().ok()
}

/// Walk zoom, column and row levels.
fn walk_tile_tree(root: &Path) -> io::Result<TileTreeStats> {
    let mut stats = TileTreeStats::default();
    let mut zoom_range: Option<(u8, u8)> = None;

    for zoom_entry in fs::read_dir(root)?.flatten() {
        let zoom_path = zoom_entry.path();
        if !zoom_path.is_dir() {
            continue;
        }
        let Some(zoom) = parse_level(&zoom_path).and_then(|z| u8::try_from(z).ok()) else {
            continue;
        };
        zoom_range = Some(match zoom_range {
            Some((min, max)) => (min.min(zoom), max.max(zoom)),
            None => (zoom, zoom),
        });

        for x_entry in fs::read_dir(&zoom_path)?.flatten() {
            let x_path = x_entry.path();
            if !x_path.is_dir() || parse_level(&x_path).is_none() {
                continue;
            }
            for y_entry in fs::read_dir(&x_path)?.flatten() {
                if y_entry.path().is_file() {
                    stats.tile_count += 1;
                }
            }
        }
    }

    if let Some((min, max)) = zoom_range {
        stats.min_zoom = min;
        stats.max_zoom = max;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tile(root: &Path, z: u8, x: u32, y: u32) {
        let dir = root.join(z.to_string()).join(x.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.png", y)), b"png").unwrap();
    }

    #[test]
    fn test_walks_zoom_range_and_counts_tiles() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("imagery");
        write_tile(&root, 3, 1, 1);
        write_tile(&root, 3, 1, 2);
        write_tile(&root, 5, 4, 7);
        write_tile(&root, 12, 100, 200);

        let overlay = TiledDirectoryOverlay::from_directory(&root).unwrap();

        assert_eq!(overlay.base.name(), "imagery");
        assert_eq!(overlay.tile_count(), 4);
        assert_eq!(overlay.min_zoom(), 3);
        assert_eq!(overlay.max_zoom(), 12);
        assert_eq!(overlay.info().unwrap(), "tiles: 4, zoom: 3 - 12");
    }

    #[test]
    fn test_ignores_non_numeric_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("imagery");
        write_tile(&root, 2, 0, 0);
        fs::create_dir_all(root.join("thumbnails").join("0")).unwrap();
        fs::write(root.join("README.txt"), b"hello").unwrap();

        let overlay = TiledDirectoryOverlay::from_directory(&root).unwrap();

        assert_eq!(overlay.tile_count(), 1);
        assert_eq!(overlay.min_zoom(), 2);
        assert_eq!(overlay.max_zoom(), 2);
    }

    #[test]
    fn test_is_tile_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("imagery");
        assert!(!is_tile_directory(&root));

        fs::create_dir_all(root.join("misc")).unwrap();
        assert!(!is_tile_directory(&root));

        write_tile(&root, 0, 0, 0);
        assert!(is_tile_directory(&root));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(TiledDirectoryOverlay::from_directory(temp.path().join("nope")).is_err());
    }
}
