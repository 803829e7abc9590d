//! The polymorphic overlay type and the attributes every variant shares.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::coord::LatLng;

use super::container::ContainerOverlay;
use super::directory::TiledDirectoryOverlay;
use super::surface::MapSurface;
use super::table::{FeatureTableOverlay, TileTableOverlay};

/// Compose the cache name of a table inside a container.
///
/// Produces `"{parent}-{child}"`, which keeps child identities unique across
/// containers that happen to share table names.
pub fn build_child_cache_name(parent_name: &str, child_name: &str) -> String {
    format!("{}-{}", parent_name, child_name)
}

/// Attributes shared by every overlay variant.
///
/// `enabled` and `expanded` are atomics because overlays are handed out as
/// `Arc<Overlay>` and the registry toggles them in place.
pub struct OverlayBase {
    name: String,
    cache_name: String,
    enabled: AtomicBool,
    expanded: AtomicBool,
    added: bool,
    replaced: Option<Arc<Overlay>>,
}

impl OverlayBase {
    /// Create a base whose cache name equals its display name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            cache_name: name.clone(),
            name,
            enabled: AtomicBool::new(false),
            expanded: AtomicBool::new(false),
            added: false,
            replaced: None,
        }
    }

    /// Create a base with a distinct cache name.
    pub fn with_cache_name(name: impl Into<String>, cache_name: impl Into<String>) -> Self {
        let mut base = Self::new(name);
        base.cache_name = cache_name.into();
        base
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub(crate) fn set_cache_name(&mut self, cache_name: String) {
        self.cache_name = cache_name;
    }
}

impl fmt::Debug for OverlayBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayBase")
            .field("name", &self.name)
            .field("cache_name", &self.cache_name)
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .field("added", &self.added)
            .field(
                "replaced",
                &self.replaced.as_ref().map(|r| r.cache_name().to_string()),
            )
            .finish()
    }
}

/// Discriminant of an overlay, used for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    TiledDirectory,
    Container,
    TileTable,
    FeatureTable,
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayKind::TiledDirectory => write!(f, "tiles"),
            OverlayKind::Container => write!(f, "container"),
            OverlayKind::TileTable => write!(f, "tile table"),
            OverlayKind::FeatureTable => write!(f, "feature table"),
        }
    }
}

/// A loadable map overlay.
///
/// Containers own their table children as `Arc<Overlay>`. Tables refer to
/// their container by cache name only; resolve it through the registry.
#[derive(Debug)]
pub enum Overlay {
    TiledDirectory(TiledDirectoryOverlay),
    Container(ContainerOverlay),
    TileTable(TileTableOverlay),
    FeatureTable(FeatureTableOverlay),
}

impl Overlay {
    fn base(&self) -> &OverlayBase {
        match self {
            Overlay::TiledDirectory(o) => &o.base,
            Overlay::Container(o) => &o.base,
            Overlay::TileTable(o) => &o.base,
            Overlay::FeatureTable(o) => &o.base,
        }
    }

    fn base_mut(&mut self) -> &mut OverlayBase {
        match self {
            Overlay::TiledDirectory(o) => &mut o.base,
            Overlay::Container(o) => &mut o.base,
            Overlay::TileTable(o) => &mut o.base,
            Overlay::FeatureTable(o) => &mut o.base,
        }
    }

    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::TiledDirectory(_) => OverlayKind::TiledDirectory,
            Overlay::Container(_) => OverlayKind::Container,
            Overlay::TileTable(_) => OverlayKind::TileTable,
            Overlay::FeatureTable(_) => OverlayKind::FeatureTable,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Registry identity.
    pub fn cache_name(&self) -> &str {
        &self.base().cache_name
    }

    pub fn is_enabled(&self) -> bool {
        self.base().enabled.load(Ordering::SeqCst)
    }

    /// Set the enabled flag. Containers apply it to every child as well.
    pub fn set_enabled(&self, enabled: bool) {
        self.set_own_enabled(enabled);
        for child in self.children() {
            child.set_enabled(enabled);
        }
    }

    /// Set the enabled flag of this overlay only, leaving children alone.
    pub(crate) fn set_own_enabled(&self, enabled: bool) {
        self.base().enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_expanded(&self) -> bool {
        self.base().expanded.load(Ordering::Relaxed)
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.base().expanded.store(expanded, Ordering::Relaxed);
    }

    /// Whether this overlay was created as a deliberate replacement or copy.
    pub fn is_added(&self) -> bool {
        self.base().added
    }

    pub fn set_added(&mut self, added: bool) {
        self.base_mut().added = added;
    }

    /// The overlay this one supersedes.
    pub fn replaced(&self) -> Option<&Arc<Overlay>> {
        self.base().replaced.as_ref()
    }

    pub fn set_replaced(&mut self, replaced: Option<Arc<Overlay>>) {
        self.base_mut().replaced = replaced;
    }

    pub fn supports_children(&self) -> bool {
        matches!(self, Overlay::Container(_))
    }

    pub fn is_child(&self) -> bool {
        matches!(self, Overlay::TileTable(_) | Overlay::FeatureTable(_))
    }

    /// Owned children; empty for leaf variants.
    pub fn children(&self) -> &[Arc<Overlay>] {
        match self {
            Overlay::Container(o) => o.children(),
            _ => &[],
        }
    }

    /// Cache name of the owning container, for table variants.
    pub fn parent_cache_name(&self) -> Option<&str> {
        match self {
            Overlay::TileTable(o) => Some(o.parent_cache_name()),
            Overlay::FeatureTable(o) => Some(o.parent_cache_name()),
            _ => None,
        }
    }

    /// Layer id for event-scoped containers.
    pub fn layer_id(&self) -> Option<i64> {
        match self {
            Overlay::Container(o) => o.layer_id(),
            _ => None,
        }
    }

    /// File or directory backing this overlay on disk.
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Overlay::Container(o) => Some(o.file_path()),
            Overlay::TiledDirectory(o) => Some(o.directory_path()),
            _ => None,
        }
    }

    /// Human-readable summary.
    pub fn get_info(&self) -> Option<String> {
        match self {
            Overlay::TiledDirectory(o) => o.info(),
            Overlay::Container(o) => o.info(),
            Overlay::TileTable(o) => o.info(),
            Overlay::FeatureTable(o) => o.info(),
        }
    }

    /// Release every rendering resource tied to this overlay.
    pub fn remove_from_map(&self, surface: &dyn MapSurface) {
        match self {
            Overlay::TiledDirectory(_) => surface.remove_tile_layer(self.cache_name()),
            Overlay::Container(o) => o.remove_from_map(surface),
            Overlay::TileTable(o) => o.remove_from_map(surface),
            Overlay::FeatureTable(o) => o.remove_from_map(surface),
        }
    }

    /// Textual summary of what was tapped, if this overlay can answer.
    pub fn on_map_click(&self, location: LatLng, surface: &dyn MapSurface) -> Option<String> {
        match self {
            Overlay::TileTable(o) => o.on_map_click(location, surface),
            Overlay::FeatureTable(o) => o.on_map_click(location, surface),
            Overlay::TiledDirectory(_) | Overlay::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerOverlay> {
        match self {
            Overlay::Container(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_tile_table(&self) -> Option<&TileTableOverlay> {
        match self {
            Overlay::TileTable(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_feature_table(&self) -> Option<&FeatureTableOverlay> {
        match self {
            Overlay::FeatureTable(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_tiled_directory(&self) -> Option<&TiledDirectoryOverlay> {
        match self {
            Overlay::TiledDirectory(o) => Some(o),
            _ => None,
        }
    }
}

/// The overlay a replacement should point back to.
///
/// Returns `existing`'s own `replaced` target when it has one, so that
/// replacement chains always reference the original, never an intermediate.
pub fn replacement_root(existing: &Arc<Overlay>) -> Arc<Overlay> {
    existing
        .replaced()
        .cloned()
        .unwrap_or_else(|| Arc::clone(existing))
}

impl From<TiledDirectoryOverlay> for Overlay {
    fn from(o: TiledDirectoryOverlay) -> Self {
        Overlay::TiledDirectory(o)
    }
}

impl From<ContainerOverlay> for Overlay {
    fn from(o: ContainerOverlay) -> Self {
        Overlay::Container(o)
    }
}

impl From<TileTableOverlay> for Overlay {
    fn from(o: TileTableOverlay) -> Self {
        Overlay::TileTable(o)
    }
}

impl From<FeatureTableOverlay> for Overlay {
    fn from(o: FeatureTableOverlay) -> Self {
        Overlay::FeatureTable(o)
    }
}
