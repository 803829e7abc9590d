//! Overlay directory scanning.
//!
//! The scanner reconciles the registry with an overlay directory: datasets
//! on disk that are not registered get added in one batch, and registered
//! overlays whose backing file or directory is gone get removed together with
//! their layer records. A second scan without filesystem changes does
//! nothing.
//!
//! Names held by an import in flight are skipped, never waited on; the next
//! scan picks them up if the import left them unregistered.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   survey.gpkg                  local container
//!   imagery/{z}/{x}/{y}.png      tiled directory
//!   geopackages/<layer_id>/*.gpkg   server layer containers
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::default_container_extensions;
use crate::overlay::{is_tile_directory, layer_id_from_path, Overlay, TiledDirectoryOverlay, LAYER_DIRECTORY};
use crate::registry::OverlayRegistry;

use super::container::{open_container, ContainerReader};
use super::error::{ImportError, ImportResult};
use super::locks::NameLocks;
use super::naming::{derive_name, has_extension};
use super::records::{mark_not_downloaded, upsert_loaded, LayerKey, LayerRecordStore, LayerStatus};

/// What kind of dataset a discovered path holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Container,
    TileDirectory,
}

/// A dataset found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub name: String,
    pub path: PathBuf,
    pub kind: DatasetKind,
}

/// What one scan changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Cache names registered by this scan.
    pub added: Vec<String>,
    /// Cache names removed because their source disappeared.
    pub removed: Vec<String>,
    /// Datasets that could not be loaded.
    pub failed: Vec<PathBuf>,
}

impl ScanReport {
    /// Whether the registry was left untouched.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Reconciles an overlay directory with the registry.
pub struct OverlayScanner {
    root: PathBuf,
    registry: OverlayRegistry,
    reader: Arc<dyn ContainerReader>,
    records: Arc<dyn LayerRecordStore>,
    extensions: Vec<String>,
    event_id: Option<i64>,
    locks: NameLocks,
}

impl OverlayScanner {
    pub fn new(
        root: impl Into<PathBuf>,
        registry: OverlayRegistry,
        reader: Arc<dyn ContainerReader>,
        records: Arc<dyn LayerRecordStore>,
    ) -> Self {
        Self {
            root: root.into(),
            registry,
            reader,
            records,
            extensions: default_container_extensions(),
            event_id: None,
            locks: NameLocks::new(),
        }
    }

    /// Container extensions to recognise, without the leading dot.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Event that server layer records found by this scanner belong to.
    pub fn with_event_id(mut self, event_id: Option<i64>) -> Self {
        self.event_id = event_id;
        self
    }

    /// Share per-name locks with an [`ImportResolver`](super::ImportResolver).
    pub fn with_name_locks(mut self, locks: NameLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List datasets under the root, sorted by path.
    ///
    /// A missing root yields an empty list.
    pub fn discover(&self) -> ImportResult<Vec<Discovered>> {
        let mut found = Vec::new();
        if !self.root.exists() {
            debug!(root = %self.root.display(), "Overlay directory does not exist");
            return Ok(found);
        }

        for path in list_dir(&self.root)? {
            if path.is_file() {
                self.push_container(&path, &mut found);
            } else if path.is_dir() {
                if path.file_name().is_some_and(|n| n == LAYER_DIRECTORY) {
                    self.discover_layers(&path, &mut found)?;
                } else if is_tile_directory(&path) {
                    push(&path, DatasetKind::TileDirectory, &mut found);
                }
            }
        }

        Ok(found)
    }

    fn discover_layers(&self, layers_dir: &Path, found: &mut Vec<Discovered>) -> ImportResult<()> {
        for layer_dir in list_dir(layers_dir)? {
            let is_layer = layer_dir.is_dir()
                && layer_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.parse::<i64>().is_ok());
            if !is_layer {
                continue;
            }
            for path in list_dir(&layer_dir)? {
                if path.is_file() {
                    self.push_container(&path, found);
                }
            }
        }
        Ok(())
    }

    fn push_container(&self, path: &Path, found: &mut Vec<Discovered>) {
        if has_extension(path, &self.extensions) {
            push(path, DatasetKind::Container, found);
        }
    }

    /// Reconcile the registry with the directory.
    pub async fn scan(&self) -> ImportResult<ScanReport> {
        let mut report = ScanReport::default();

        let mut seen = HashSet::new();
        let mut batch = Vec::new();
        // Held until the batch is registered.
        let mut guards = Vec::new();
        for dataset in self.discover()? {
            if !seen.insert(dataset.name.clone()) {
                debug!(name = %dataset.name, path = %dataset.path.display(), "Duplicate dataset name skipped");
                continue;
            }
            let Some(guard) = self.locks.try_lock(&dataset.name) else {
                debug!(name = %dataset.name, "Dataset busy, skipped");
                continue;
            };
            if self.registry.get_by_cache_name(&dataset.name).await.is_some()
                || self.registry.is_processing(&dataset.name).await
            {
                continue;
            }

            let layer_id = layer_id_from_path(&dataset.path);
            let key = LayerKey::for_overlay(&dataset.name, layer_id, self.event_id);
            match self.load(&dataset) {
                Ok(overlay) => {
                    upsert_loaded(
                        self.records.as_ref(),
                        key,
                        layer_id,
                        &dataset.name,
                        &dataset.path,
                        LayerStatus::loaded(layer_id),
                    )?;
                    report.added.push(dataset.name);
                    batch.push(overlay);
                    guards.push(guard);
                }
                Err(e) => {
                    warn!(path = %dataset.path.display(), error = %e, "Skipping unreadable dataset");
                    mark_not_downloaded(self.records.as_ref(), &key)?;
                    report.failed.push(dataset.path);
                }
            }
        }

        if !batch.is_empty() {
            self.registry.add_overlays(batch).await;
        }
        drop(guards);

        report.removed = self.collect_garbage().await?;

        if !report.is_unchanged() {
            info!(
                root = %self.root.display(),
                added = report.added.len(),
                removed = report.removed.len(),
                failed = report.failed.len(),
                "Overlay scan complete"
            );
        }
        Ok(report)
    }

    fn load(&self, dataset: &Discovered) -> ImportResult<Overlay> {
        match dataset.kind {
            DatasetKind::Container => {
                let contents = open_container(self.reader.as_ref(), &dataset.path)?;
                Ok(contents
                    .into_overlay(&dataset.name, &dataset.name, &dataset.path)
                    .into())
            }
            DatasetKind::TileDirectory => TiledDirectoryOverlay::from_directory(&dataset.path)
                .map(Overlay::from)
                .map_err(|source| ImportError::Scan {
                    path: dataset.path.clone(),
                    source,
                }),
        }
    }

    /// Remove overlays whose source is gone, along with their records.
    async fn collect_garbage(&self) -> ImportResult<Vec<String>> {
        let mut removed = Vec::new();
        for overlay in self.registry.all_overlays().await {
            let Some(path) = overlay.source_path() else {
                continue;
            };
            if path.exists() {
                continue;
            }

            debug!(cache_name = %overlay.cache_name(), path = %path.display(), "Source missing, removing overlay");
            self.registry.remove_overlay(overlay.cache_name()).await;
            for record in self.records.find_by_path(path)? {
                self.records.delete(record.id)?;
            }
            removed.push(overlay.cache_name().to_string());
        }
        Ok(removed)
    }
}

fn push(path: &Path, kind: DatasetKind, found: &mut Vec<Discovered>) {
    if let Some(name) = derive_name(path) {
        found.push(Discovered {
            name,
            path: path.to_path_buf(),
            kind,
        });
    }
}

/// Entries of `dir`, sorted by path.
fn list_dir(dir: &Path) -> ImportResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| ImportError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    Ok(paths)
}
