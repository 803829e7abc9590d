//! Spatial query helper contract.
//!
//! Each feature table (and each tile table that renders features) is paired
//! with a query helper supplied by the container library. The helper is the
//! only thing that touches the spatial index, and any of its calls may fail.
//! Overlays convert every failure into "no data" at the call site.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::coord::{BoundingBox, LatLng};

/// Errors raised by the spatial index library.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The table has no usable spatial index.
    #[error("Spatial index unavailable for table '{table}': {reason}")]
    IndexUnavailable { table: String, reason: String },

    /// The query itself failed.
    #[error("Spatial query failed: {0}")]
    QueryFailed(String),
}

/// One result row from a bounding-box feature query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    /// Row id within the feature table.
    pub row_id: i64,
    /// Geometry type name as reported by the container (e.g. "POINT").
    pub geometry_type: Option<String>,
    /// Attribute columns rendered as text.
    pub attributes: BTreeMap<String, String>,
}

impl FeatureRow {
    /// Create a row without attributes.
    pub fn new(row_id: i64) -> Self {
        Self {
            row_id,
            ..Default::default()
        }
    }

    /// Add an attribute column.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Spatial query helper for one table.
///
/// Implementations wrap the container library's feature index. Only the
/// fallible calls return `Result`; the reporting toggles are plain settings.
pub trait FeatureQuery: Send + Sync {
    /// Whether the table has a spatial index.
    fn is_indexed(&self) -> Result<bool, QueryError>;

    /// Whether feature querying is switched on at this zoom and location.
    fn is_on_at_zoom(&self, zoom: f64, location: LatLng) -> bool;

    /// Number of features in the tile containing `location` at `zoom`.
    fn tile_feature_count(&self, location: LatLng, zoom: f64) -> Result<u64, QueryError>;

    /// Whether `count` exceeds the configured maximum.
    fn more_than_max(&self, count: u64) -> bool;

    /// Whether overflow ("too many features") is itself reported.
    fn max_features_info(&self) -> bool;

    /// Whether individual features are reported.
    fn features_info(&self) -> bool;

    /// Run a bounding-box query.
    fn query_features(&self, bbox: &BoundingBox) -> Result<Vec<FeatureRow>, QueryError>;

    /// Textual summary of the features near a click, if any.
    fn map_click_message(
        &self,
        location: LatLng,
        zoom: f64,
        bbox: &BoundingBox,
    ) -> Result<Option<String>, QueryError>;
}

/// Item produced by a feature lookup near a map tap.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureItem {
    /// A materialised feature row.
    Feature {
        container_name: String,
        layer_name: String,
        table_name: String,
        row: FeatureRow,
    },
    /// Synthetic item: the tile holds more features than the configured
    /// maximum, so none were enumerated.
    MaxFeaturesReached {
        container_name: String,
        layer_name: String,
        table_name: String,
        count: u64,
    },
}

impl FeatureItem {
    /// Returns true for the synthetic overflow item.
    pub fn is_max_features(&self) -> bool {
        matches!(self, FeatureItem::MaxFeaturesReached { .. })
    }
}

/// Lightweight reference to a feature, used by tap handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureKey {
    pub container_name: String,
    /// Row id; `None` for the synthetic overflow key.
    pub row_id: Option<i64>,
    pub layer_name: String,
    pub table_name: String,
    /// Set on the synthetic overflow key.
    pub max_features_found: bool,
    /// Tile feature count that triggered the overflow key.
    pub feature_count: u64,
}
