//! Overlay entity hierarchy.
//!
//! An [`Overlay`] is anything the map can draw from cached data:
//!
//! ```text
//! Overlay
//! ├── TiledDirectory   {zoom}/{x}/{y}.ext image tree
//! ├── Container        one container file
//! │   ├── TileTable    raster table        (child)
//! │   └── FeatureTable vector table        (child, may link tile tables)
//! ```
//!
//! Containers own their tables as `Arc<Overlay>`. Tables name their parent
//! by cache name rather than holding a pointer, and feature tables hold only
//! `Weak` references to the tile tables they are paired with, so there are no
//! ownership cycles.
//!
//! Nothing here is concurrent except the feature table shape map, which the
//! map surface mutates through shared references.
//!
//! # Example
//!
//! ```
//! use fieldoverlay::overlay::{ContainerOverlay, FeatureTableOverlay, Overlay, TileTableOverlay};
//!
//! let container = ContainerOverlay::new(
//!     "roads",
//!     "/data/roads.gpkg",
//!     vec![TileTableOverlay::new("roads_tiles", 100, 4, 12)],
//!     vec![FeatureTableOverlay::new("roads_lines", 20, 0).link_tile_table("roads_tiles")],
//! );
//! let overlay = Overlay::from(container);
//!
//! assert_eq!(overlay.children().len(), 2);
//! assert_eq!(overlay.children()[1].get_info().unwrap(), "features: 20, zoom: 0 - 21");
//! ```

mod container;
mod directory;
mod query;
mod surface;
mod table;
mod types;


pub use container::{layer_id_from_path, ContainerOverlay, LAYER_DIRECTORY};
pub use directory::{is_tile_directory, TiledDirectoryOverlay};
pub use query::{FeatureItem, FeatureKey, FeatureQuery, FeatureRow, QueryError};
pub use surface::{MapSurface, ShapeHandle};
pub use table::{FeatureTableOverlay, TableAttributes, TileTableOverlay, FEATURE_TABLE_MAX_ZOOM};
pub use types::{build_child_cache_name, replacement_root, Overlay, OverlayBase, OverlayKind};
