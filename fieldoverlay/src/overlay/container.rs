//! Container overlay: one geospatial container file and its tables.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::surface::MapSurface;
use super::table::{FeatureTableOverlay, TileTableOverlay};
use super::types::{Overlay, OverlayBase};

/// Directory name under which server-linked containers are stored, as
/// `.../geopackages/<layer_id>/<file>`.
pub const LAYER_DIRECTORY: &str = "geopackages";

/// Overlay backed by a single container file holding several tables.
pub struct ContainerOverlay {
    pub(crate) base: OverlayBase,
    file_path: PathBuf,
    layer_id: Option<i64>,
    children: Vec<Arc<Overlay>>,
}

impl ContainerOverlay {
    /// Create a container whose cache name equals its name.
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        tile_tables: Vec<TileTableOverlay>,
        feature_tables: Vec<FeatureTableOverlay>,
    ) -> Self {
        let name = name.into();
        Self::with_cache_name(name.clone(), name, file_path, tile_tables, feature_tables)
    }

    /// Create a container with a distinct cache name.
    ///
    /// Tables are re-homed under `cache_name` and feature tables are wired to
    /// the tile tables they name via [`FeatureTableOverlay::link_tile_table`].
    pub fn with_cache_name(
        name: impl Into<String>,
        cache_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        tile_tables: Vec<TileTableOverlay>,
        feature_tables: Vec<FeatureTableOverlay>,
    ) -> Self {
        let name = name.into();
        let cache_name = cache_name.into();
        let file_path = file_path.into();
        let layer_id = layer_id_from_path(&file_path);

        let mut children = Vec::with_capacity(tile_tables.len() + feature_tables.len());
        let mut tiles_by_name: HashMap<String, Weak<Overlay>> = HashMap::new();

        for mut tiles in tile_tables {
            tiles.attach(&name, &cache_name);
            let table_name = tiles.table_name().to_string();
            let child = Arc::new(Overlay::TileTable(tiles));
            tiles_by_name.insert(table_name, Arc::downgrade(&child));
            children.push(child);
        }

        for mut features in feature_tables {
            features.attach(&name, &cache_name);
            let mut linked = Vec::new();
            for tile_name in features.linked_table_names() {
                match tiles_by_name.get(tile_name) {
                    Some(weak) => linked.push(Weak::clone(weak)),
                    None => warn!(
                        container = %cache_name,
                        table = %features.table_name(),
                        linked = %tile_name,
                        "Linked tile table not found in container"
                    ),
                }
            }
            features.set_linked_tile_tables(linked);
            children.push(Arc::new(Overlay::FeatureTable(features)));
        }

        Self {
            base: OverlayBase::with_cache_name(name, cache_name),
            file_path,
            layer_id,
            children,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Server layer id parsed from the file path, if any.
    pub fn layer_id(&self) -> Option<i64> {
        self.layer_id
    }

    pub fn children(&self) -> &[Arc<Overlay>] {
        &self.children
    }

    /// Child table by cache name.
    pub fn child(&self, cache_name: &str) -> Option<&Arc<Overlay>> {
        self.children.iter().find(|c| c.cache_name() == cache_name)
    }

    /// Whether any child table is enabled.
    pub fn any_child_enabled(&self) -> bool {
        self.children.iter().any(|c| c.is_enabled())
    }

    pub(super) fn info(&self) -> Option<String> {
        None
    }

    pub(super) fn remove_from_map(&self, surface: &dyn MapSurface) {
        debug!(
            container = %self.base.cache_name(),
            children = self.children.len(),
            "Removing container from map"
        );
        for child in &self.children {
            child.remove_from_map(surface);
        }
    }
}

impl fmt::Debug for ContainerOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOverlay")
            .field("base", &self.base)
            .field("file_path", &self.file_path)
            .field("layer_id", &self.layer_id)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Parse the layer id out of a `.../geopackages/<layer_id>/...` path.
///
/// Returns `None` when the convention is absent or the id is not numeric;
/// such containers are event-independent.
pub fn layer_id_from_path(path: &Path) -> Option<i64> {
    let mut components = path.components();
    while let Some(component) = components.next() {
        if let Component::Normal(part) = component {
            if part == LAYER_DIRECTORY {
                return match components.next() {
                    Some(Component::Normal(id)) => id.to_str()?.parse().ok(),
                    _ => None,
                };
            }
        }
    }
    None
}
