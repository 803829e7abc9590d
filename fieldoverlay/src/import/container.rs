//! Container library contract.
//!
//! The container format itself is opaque. A [`ContainerReader`] opens a file
//! and describes its tables; this module turns that description into a
//! [`ContainerOverlay`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::overlay::{ContainerOverlay, FeatureQuery, FeatureTableOverlay, TileTableOverlay};

use super::error::ContainerError;

/// A raster tile table as reported by the container library.
#[derive(Clone)]
pub struct TileTableInfo {
    pub name: String,
    pub tile_count: u64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub queries: Vec<Arc<dyn FeatureQuery>>,
}

impl TileTableInfo {
    pub fn new(name: impl Into<String>, tile_count: u64, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            name: name.into(),
            tile_count,
            min_zoom,
            max_zoom,
            queries: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Arc<dyn FeatureQuery>) -> Self {
        self.queries.push(query);
        self
    }

    fn into_overlay(self) -> TileTableOverlay {
        self.queries.into_iter().fold(
            TileTableOverlay::new(self.name, self.tile_count, self.min_zoom, self.max_zoom),
            TileTableOverlay::with_query,
        )
    }
}

/// A vector feature table as reported by the container library.
#[derive(Clone)]
pub struct FeatureTableInfo {
    pub name: String,
    pub feature_count: u64,
    pub min_zoom: u8,
    pub indexed: bool,
    pub geometry_type: Option<String>,
    pub linked_tile_tables: Vec<String>,
    pub query: Option<Arc<dyn FeatureQuery>>,
}

impl FeatureTableInfo {
    pub fn new(name: impl Into<String>, feature_count: u64, min_zoom: u8) -> Self {
        Self {
            name: name.into(),
            feature_count,
            min_zoom,
            indexed: false,
            geometry_type: None,
            linked_tile_tables: Vec::new(),
            query: None,
        }
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn geometry_type(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry_type = Some(geometry_type.into());
        self
    }

    pub fn linked_to(mut self, tile_table: impl Into<String>) -> Self {
        self.linked_tile_tables.push(tile_table.into());
        self
    }

    pub fn with_query(mut self, query: Arc<dyn FeatureQuery>) -> Self {
        self.query = Some(query);
        self
    }

    fn into_overlay(self) -> FeatureTableOverlay {
        let mut table = FeatureTableOverlay::new(self.name, self.feature_count, self.min_zoom)
            .with_indexed(self.indexed);
        if let Some(geometry_type) = self.geometry_type {
            table = table.with_geometry_type(geometry_type);
        }
        if let Some(query) = self.query {
            table = table.with_query(query);
        }
        self.linked_tile_tables
            .into_iter()
            .fold(table, FeatureTableOverlay::link_tile_table)
    }
}

/// Everything a reader found inside one container file.
#[derive(Clone, Default)]
pub struct ContainerContents {
    pub tile_tables: Vec<TileTableInfo>,
    pub feature_tables: Vec<FeatureTableInfo>,
}

impl ContainerContents {
    pub fn new(tile_tables: Vec<TileTableInfo>, feature_tables: Vec<FeatureTableInfo>) -> Self {
        Self {
            tile_tables,
            feature_tables,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tile_tables.is_empty() && self.feature_tables.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tile_tables.len() + self.feature_tables.len()
    }

    /// Build the overlay for these contents under `cache_name`.
    pub fn into_overlay(
        self,
        name: &str,
        cache_name: &str,
        file_path: impl Into<PathBuf>,
    ) -> ContainerOverlay {
        ContainerOverlay::with_cache_name(
            name,
            cache_name,
            file_path,
            self.tile_tables.into_iter().map(TileTableInfo::into_overlay).collect(),
            self.feature_tables
                .into_iter()
                .map(FeatureTableInfo::into_overlay)
                .collect(),
        )
    }
}

/// Opens container files.
pub trait ContainerReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<ContainerContents, ContainerError>;
}

/// Open `path` and reject containers without tables.
pub fn open_container(
    reader: &dyn ContainerReader,
    path: &Path,
) -> Result<ContainerContents, ContainerError> {
    let contents = reader.open(path)?;
    if contents.is_empty() {
        return Err(ContainerError::Empty(path.to_path_buf()));
    }
    Ok(contents)
}
