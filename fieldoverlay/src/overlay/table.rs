//! Table overlays: one tile or feature table inside a container.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::coord::LatLng;

use super::query::{FeatureItem, FeatureKey, FeatureQuery};
use super::surface::{MapSurface, ShapeHandle};
use super::types::{build_child_cache_name, Overlay, OverlayBase};

/// Zoom ceiling for vector feature tables; they render at any zoom.
pub const FEATURE_TABLE_MAX_ZOOM: u8 = 21;

/// Attributes common to tile and feature tables.
#[derive(Debug, Clone)]
pub struct TableAttributes {
    /// Display name of the container this table lives in.
    pub source_container_name: String,
    /// Table name within the container.
    pub table_name: String,
    /// Rows (tiles or features) in the table.
    pub count: u64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Cache name of the owning container.
    parent_cache_name: String,
}

impl TableAttributes {
    fn new(table_name: String, count: u64, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            source_container_name: String::new(),
            table_name,
            count,
            min_zoom,
            max_zoom,
            parent_cache_name: String::new(),
        }
    }
}

/// Re-home a table under its container: display name, parent key and the
/// composite cache name.
fn attach(
    base: &mut OverlayBase,
    table: &mut TableAttributes,
    container_name: &str,
    container_cache_name: &str,
) {
    table.source_container_name = container_name.to_string();
    table.parent_cache_name = container_cache_name.to_string();
    base.set_cache_name(build_child_cache_name(
        container_cache_name,
        &table.table_name,
    ));
}

// =============================================================================
// Tile table
// =============================================================================

/// A tiled raster table.
pub struct TileTableOverlay {
    pub(crate) base: OverlayBase,
    table: TableAttributes,
    /// Feature queries drawn as part of these tiles; consulted on map click.
    queries: Vec<Arc<dyn FeatureQuery>>,
}

impl TileTableOverlay {
    /// Create a tile table. The container fills in parent and cache name.
    pub fn new(table_name: impl Into<String>, tile_count: u64, min_zoom: u8, max_zoom: u8) -> Self {
        let table_name = table_name.into();
        Self {
            base: OverlayBase::new(table_name.clone()),
            table: TableAttributes::new(table_name, tile_count, min_zoom, max_zoom),
            queries: Vec::new(),
        }
    }

    /// Attach a feature query answered on map click.
    pub fn with_query(mut self, query: Arc<dyn FeatureQuery>) -> Self {
        self.queries.push(query);
        self
    }

    pub(crate) fn attach(&mut self, container_name: &str, container_cache_name: &str) {
        attach(
            &mut self.base,
            &mut self.table,
            container_name,
            container_cache_name,
        );
    }

    pub fn table(&self) -> &TableAttributes {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.table_name
    }

    pub fn parent_cache_name(&self) -> &str {
        &self.table.parent_cache_name
    }

    pub fn min_zoom(&self) -> u8 {
        self.table.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.table.max_zoom
    }

    pub(super) fn info(&self) -> Option<String> {
        Some(format!(
            "tiles: {}, zoom: {} - {}",
            self.table.count, self.table.min_zoom, self.table.max_zoom
        ))
    }

    pub(super) fn remove_from_map(&self, surface: &dyn MapSurface) {
        surface.remove_tile_layer(self.base.cache_name());
    }

    /// Messages from every attached query, separated by blank lines.
    pub(super) fn on_map_click(&self, location: LatLng, surface: &dyn MapSurface) -> Option<String> {
        if self.queries.is_empty() {
            return None;
        }

        let zoom = surface.zoom();
        let bbox = surface.click_bounding_box(location);
        let mut messages = Vec::new();

        for query in &self.queries {
            match query.map_click_message(location, zoom, &bbox) {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => {}
                Err(e) => {
                    warn!(table = %self.table.table_name, error = %e, "Map click query failed");
                }
            }
        }

        if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n\n"))
        }
    }
}

impl fmt::Debug for TileTableOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileTableOverlay")
            .field("base", &self.base)
            .field("table", &self.table)
            .field("queries", &self.queries.len())
            .finish()
    }
}

// =============================================================================
// Feature table
// =============================================================================

/// A vector feature table.
///
/// Linked tile tables are owned by the container; this overlay only holds
/// weak references to them so it can fold their zoom range into its info and
/// cascade map removal.
pub struct FeatureTableOverlay {
    pub(crate) base: OverlayBase,
    table: TableAttributes,
    indexed: bool,
    geometry_type: Option<String>,
    query: Option<Arc<dyn FeatureQuery>>,
    shapes: Mutex<HashMap<i64, ShapeHandle>>,
    linked_table_names: Vec<String>,
    linked_tile_tables: Vec<Weak<Overlay>>,
}

impl FeatureTableOverlay {
    /// Create a feature table. `max_zoom` is always [`FEATURE_TABLE_MAX_ZOOM`].
    pub fn new(table_name: impl Into<String>, feature_count: u64, min_zoom: u8) -> Self {
        let table_name = table_name.into();
        Self {
            base: OverlayBase::new(table_name.clone()),
            table: TableAttributes::new(
                table_name,
                feature_count,
                min_zoom,
                FEATURE_TABLE_MAX_ZOOM,
            ),
            indexed: false,
            geometry_type: None,
            query: None,
            shapes: Mutex::new(HashMap::new()),
            linked_table_names: Vec::new(),
            linked_tile_tables: Vec::new(),
        }
    }

    /// Record whether the container reported a spatial index for this table.
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn with_geometry_type(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry_type = Some(geometry_type.into());
        self
    }

    pub fn with_query(mut self, query: Arc<dyn FeatureQuery>) -> Self {
        self.query = Some(query);
        self
    }

    /// Pair this table with a tile table of the same container, by table name.
    /// The link is resolved when the container is built.
    pub fn link_tile_table(mut self, tile_table_name: impl Into<String>) -> Self {
        self.linked_table_names.push(tile_table_name.into());
        self
    }

    pub(crate) fn attach(&mut self, container_name: &str, container_cache_name: &str) {
        attach(
            &mut self.base,
            &mut self.table,
            container_name,
            container_cache_name,
        );
    }

    pub(crate) fn linked_table_names(&self) -> &[String] {
        &self.linked_table_names
    }

    pub(crate) fn set_linked_tile_tables(&mut self, linked: Vec<Weak<Overlay>>) {
        self.linked_tile_tables = linked;
    }

    pub fn table(&self) -> &TableAttributes {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.table_name
    }

    pub fn parent_cache_name(&self) -> &str {
        &self.table.parent_cache_name
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn geometry_type(&self) -> Option<&str> {
        self.geometry_type.as_deref()
    }

    /// Linked tile tables that are still alive.
    pub fn linked_tile_tables(&self) -> Vec<Arc<Overlay>> {
        self.linked_tile_tables
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Shapes
    // -------------------------------------------------------------------------

    /// Record a rendered shape; returns the handle it replaced, if any.
    pub fn add_shape(&self, shape_id: i64, handle: ShapeHandle) -> Option<ShapeHandle> {
        self.shapes.lock().insert(shape_id, handle)
    }

    pub fn shape(&self, shape_id: i64) -> Option<ShapeHandle> {
        self.shapes.lock().get(&shape_id).copied()
    }

    pub fn remove_shape(&self, shape_id: i64) -> Option<ShapeHandle> {
        self.shapes.lock().remove(&shape_id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.lock().len()
    }

    // -------------------------------------------------------------------------
    // Polymorphic behaviour
    // -------------------------------------------------------------------------

    pub(super) fn info(&self) -> Option<String> {
        let mut min_zoom = self.table.min_zoom;
        let mut max_zoom = self.table.max_zoom;
        for linked in self.linked_tile_tables() {
            if let Some(tiles) = linked.as_tile_table() {
                min_zoom = min_zoom.min(tiles.min_zoom());
                max_zoom = max_zoom.max(tiles.max_zoom());
            }
        }
        Some(format!(
            "features: {}, zoom: {} - {}",
            self.table.count, min_zoom, max_zoom
        ))
    }

    pub(super) fn remove_from_map(&self, surface: &dyn MapSurface) {
        let drained: Vec<ShapeHandle> = {
            let mut shapes = self.shapes.lock();
            shapes.drain().map(|(_, handle)| handle).collect()
        };
        debug!(
            table = %self.table.table_name,
            shapes = drained.len(),
            "Removing feature table from map"
        );
        for handle in drained {
            surface.remove_shape(handle);
        }
        for linked in self.linked_tile_tables() {
            linked.remove_from_map(surface);
        }
    }

    pub(super) fn on_map_click(&self, location: LatLng, surface: &dyn MapSurface) -> Option<String> {
        let query = self.query.as_ref()?;
        let bbox = surface.click_bounding_box(location);
        match query.map_click_message(location, surface.zoom(), &bbox) {
            Ok(message) => message,
            Err(e) => {
                warn!(table = %self.table.table_name, error = %e, "Map click query failed");
                None
            }
        }
    }

    /// Gate shared by both lookups: indexed, some reporting enabled, and the
    /// helper is on at the current zoom.
    fn active_query(&self, location: LatLng, zoom: f64) -> Option<&Arc<dyn FeatureQuery>> {
        let query = self.query.as_ref()?;

        let indexed = match query.is_indexed() {
            Ok(indexed) => indexed,
            Err(e) => {
                warn!(table = %self.table.table_name, error = %e, "Index check failed");
                false
            }
        };
        if !indexed {
            return None;
        }
        if !(query.max_features_info() || query.features_info()) {
            return None;
        }
        if !query.is_on_at_zoom(zoom, location) {
            return None;
        }
        Some(query)
    }

    /// Tile feature count, or `None` if the helper failed.
    fn tile_count(&self, query: &dyn FeatureQuery, location: LatLng, zoom: f64) -> Option<u64> {
        match query.tile_feature_count(location, zoom) {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(table = %self.table.table_name, error = %e, "Tile feature count failed");
                None
            }
        }
    }

    /// Features near a tap location.
    pub fn get_features_near(&self, location: LatLng, surface: &dyn MapSurface) -> Vec<FeatureItem> {
        let zoom = surface.zoom();
        let Some(query) = self.active_query(location, zoom) else {
            return Vec::new();
        };
        let Some(count) = self.tile_count(query.as_ref(), location, zoom) else {
            return Vec::new();
        };

        if query.more_than_max(count) {
            return vec![FeatureItem::MaxFeaturesReached {
                container_name: self.table.source_container_name.clone(),
                layer_name: self.base_name(),
                table_name: self.table.table_name.clone(),
                count,
            }];
        }

        let bbox = surface.click_bounding_box(location);
        match query.query_features(&bbox) {
            Ok(rows) => rows
                .into_iter()
                .map(|row| FeatureItem::Feature {
                    container_name: self.table.source_container_name.clone(),
                    layer_name: self.base_name(),
                    table_name: self.table.table_name.clone(),
                    row,
                })
                .collect(),
            Err(e) => {
                warn!(table = %self.table.table_name, error = %e, "Feature query failed");
                Vec::new()
            }
        }
    }

    /// Lightweight keys for the features near a tap location.
    pub fn get_feature_keys_near(
        &self,
        location: LatLng,
        surface: &dyn MapSurface,
    ) -> Vec<FeatureKey> {
        let zoom = surface.zoom();
        let Some(query) = self.active_query(location, zoom) else {
            return Vec::new();
        };
        let Some(count) = self.tile_count(query.as_ref(), location, zoom) else {
            return Vec::new();
        };

        if query.more_than_max(count) {
            if !query.max_features_info() {
                return Vec::new();
            }
            return vec![FeatureKey {
                container_name: self.table.source_container_name.clone(),
                row_id: None,
                layer_name: self.base_name(),
                table_name: self.table.table_name.clone(),
                max_features_found: true,
                feature_count: count,
            }];
        }

        let bbox = surface.click_bounding_box(location);
        match query.query_features(&bbox) {
            Ok(rows) => rows
                .into_iter()
                .map(|row| FeatureKey {
                    container_name: self.table.source_container_name.clone(),
                    row_id: Some(row.row_id),
                    layer_name: self.base_name(),
                    table_name: self.table.table_name.clone(),
                    max_features_found: false,
                    feature_count: count,
                })
                .collect(),
            Err(e) => {
                warn!(table = %self.table.table_name, error = %e, "Feature key query failed");
                Vec::new()
            }
        }
    }

    fn base_name(&self) -> String {
        self.base.name().to_string()
    }
}

impl fmt::Debug for FeatureTableOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureTableOverlay")
            .field("base", &self.base)
            .field("table", &self.table)
            .field("indexed", &self.indexed)
            .field("shapes", &self.shape_count())
            .field("linked", &self.linked_table_names)
            .finish()
    }
}
