//! Geographic value types shared by the overlay hierarchy and its
//! collaborators.
//!
//! Only plain positions and boxes live here. Converting screen taps into
//! geographic boxes is the map surface's job.

mod types;

pub use types::{BoundingBox, CoordError, LatLng, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
