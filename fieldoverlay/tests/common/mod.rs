//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fieldoverlay::import::{
    ContainerContents, ContainerError, ContainerReader, DecisionProvider, FeatureTableInfo,
    ImportConflict, ImportDecision, InMemoryLayerRecordStore, TileTableInfo,
};
use fieldoverlay::registry::{BoxFuture, InMemoryLayerCounts, OverlayListener, OverlayRegistry, OverlaySnapshot};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Marker content that makes [`TextContainerReader`] reject a file.
pub const CORRUPT: &str = "corrupt";

/// Reads fake containers: any readable file becomes one tile table and one
/// feature table linked to it, unless it contains [`CORRUPT`].
///
/// `features=<n>` and `indexed=<bool>` tokens in the file override the
/// feature table's defaults of 8 features, indexed.
pub struct TextContainerReader;

impl ContainerReader for TextContainerReader {
    fn open(&self, path: &Path) -> Result<ContainerContents, ContainerError> {
        let content = fs::read_to_string(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.contains(CORRUPT) {
            return Err(ContainerError::Malformed {
                path: path.to_path_buf(),
                reason: "bad header".to_string(),
            });
        }
        let mut features = 8;
        let mut indexed = true;
        for token in content.split_whitespace() {
            if let Some(value) = token.strip_prefix("features=") {
                features = value.parse().unwrap_or(features);
            } else if let Some(value) = token.strip_prefix("indexed=") {
                indexed = value == "true";
            }
        }
        Ok(ContainerContents::new(
            vec![TileTableInfo::new("imagery", 120, 3, 15)],
            vec![FeatureTableInfo::new("points", features, 6)
                .indexed(indexed)
                .geometry_type("POINT")
                .linked_to("imagery")],
        ))
    }
}

/// Write a valid fake container.
pub fn write_container(dir: &Path, file_name: &str) -> PathBuf {
    write_container_with(dir, file_name, "container")
}

/// Write a fake container with explicit content, see [`TextContainerReader`].
pub fn write_container_with(dir: &Path, file_name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, content).unwrap();
    path
}

/// [`TextContainerReader`] that blocks its thread for `delay` on every open.
pub struct SlowReader {
    pub delay: Duration,
    opened: AtomicUsize,
}

impl SlowReader {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            opened: AtomicUsize::new(0),
        }
    }

    /// Opens started so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ContainerReader for SlowReader {
    fn open(&self, path: &Path) -> Result<ContainerContents, ContainerError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        TextContainerReader.open(path)
    }
}

/// Write a container the reader rejects.
pub fn write_corrupt(dir: &Path, file_name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, CORRUPT).unwrap();
    path
}

/// Write a `{z}/{x}/{y}.png` tree with one tile per zoom.
pub fn write_tile_directory(dir: &Path, zooms: &[u8]) -> PathBuf {
    for zoom in zooms {
        let column = dir.join(zoom.to_string()).join("0");
        fs::create_dir_all(&column).unwrap();
        fs::write(column.join("0.png"), [0u8; 4]).unwrap();
    }
    dir.to_path_buf()
}

pub struct Harness {
    pub registry: OverlayRegistry,
    pub counts: Arc<InMemoryLayerCounts>,
    pub records: Arc<InMemoryLayerRecordStore>,
}

pub fn harness() -> Harness {
    let counts = Arc::new(InMemoryLayerCounts::new());
    Harness {
        registry: OverlayRegistry::spawn(counts.clone()),
        counts,
        records: Arc::new(InMemoryLayerRecordStore::new()),
    }
}

/// Never answers.
pub struct PendingDecision;

impl DecisionProvider for PendingDecision {
    fn decide<'a>(&'a self, _conflict: &'a ImportConflict) -> BoxFuture<'a, Option<ImportDecision>> {
        Box::pin(std::future::pending())
    }
}

/// Answers only after a permit is added; counts how often it was asked.
pub struct GatedDecision {
    pub decision: ImportDecision,
    pub calls: AtomicUsize,
    pub gate: Semaphore,
}

impl GatedDecision {
    pub fn new(decision: ImportDecision) -> Self {
        Self {
            decision,
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

impl DecisionProvider for GatedDecision {
    fn decide<'a>(&'a self, _conflict: &'a ImportConflict) -> BoxFuture<'a, Option<ImportDecision>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.ok()?;
            permit.forget();
            Some(self.decision)
        })
    }
}

/// Records every snapshot it receives.
#[derive(Default)]
pub struct RecordingListener {
    pub snapshots: Mutex<Vec<Arc<OverlaySnapshot>>>,
}

impl RecordingListener {
    pub fn count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn last(&self) -> Option<Arc<OverlaySnapshot>> {
        self.snapshots.lock().last().cloned()
    }
}

impl OverlayListener for RecordingListener {
    fn overlays_changed(&self, snapshot: Arc<OverlaySnapshot>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.snapshots.lock().push(snapshot);
        })
    }
}

/// Poll until `check` holds or about half a second passes.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
