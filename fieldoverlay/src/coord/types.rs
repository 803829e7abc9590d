//! Coordinate type definitions

use std::fmt;

/// Valid latitude range
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A geographic position in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude, positive north
    pub lat: f64,
    /// Longitude, positive east
    pub lng: f64,
}

impl LatLng {
    /// Create a position without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Create a position, rejecting out-of-range values.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lng) {
            return Err(CoordError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// An axis-aligned geographic bounding box.
///
/// The map surface computes this around a tap location; the spatial query
/// helpers consume it. No projection happens here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box from its corners.
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// Box of `half_width` degrees on each side of `center`, clamped to the
    /// valid coordinate range.
    pub fn around(center: LatLng, half_width: f64) -> Self {
        let half_width = half_width.abs();
        Self {
            min_lng: (center.lng - half_width).max(MIN_LON),
            min_lat: (center.lat - half_width).max(MIN_LAT),
            max_lng: (center.lng + half_width).min(MAX_LON),
            max_lat: (center.lat + half_width).min(MAX_LAT),
        }
    }

    /// Check whether a position lies inside the box (edges inclusive).
    pub fn contains(&self, point: LatLng) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

/// Coordinate validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),
}
