//! Map rendering surface contract.
//!
//! The live map owns rendered layers and shapes. Overlays only ask it to
//! release what they put there and to describe the current viewport.

use crate::coord::{BoundingBox, LatLng};

/// Opaque handle to a shape drawn on the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u64);

/// The map surface an overlay is rendered on.
pub trait MapSurface: Send + Sync {
    /// Current zoom level.
    fn zoom(&self) -> f64;

    /// Geographic box covering the tap tolerance around `location`.
    fn click_bounding_box(&self, location: LatLng) -> BoundingBox;

    /// Drop the raster layer registered under `cache_name`. Must tolerate
    /// unknown names.
    fn remove_tile_layer(&self, cache_name: &str);

    /// Drop a rendered shape.
    fn remove_shape(&self, handle: ShapeHandle);
}
