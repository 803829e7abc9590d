//! FieldOverlay - map overlay cache for field data collection
//!
//! This library keeps the set of map overlays a field-collection app can
//! show: raster tile sets and vector feature tables from imported container
//! files, plus plain `{z}/{x}/{y}` tile directories.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use fieldoverlay::import::{ImportRequest, ImportResolver, InMemoryLayerRecordStore};
//! use fieldoverlay::registry::{InMemoryLayerCounts, OverlayRegistry};
//!
//! let registry = OverlayRegistry::spawn(Arc::new(InMemoryLayerCounts::new()));
//! let resolver = ImportResolver::new(registry.clone(), reader, records, decisions);
//!
//! let outcome = resolver.import(ImportRequest::new(path), &cancel).await;
//! let overlays = registry.get_overlays().await;
//! ```

pub mod config;
pub mod coord;
pub mod import;
pub mod logging;
pub mod overlay;
pub mod registry;

/// Version of the FieldOverlay library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
