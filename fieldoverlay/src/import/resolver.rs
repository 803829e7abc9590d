//! Import conflict resolution.
//!
//! [`ImportResolver::import`] takes a freshly downloaded or dropped-in file,
//! checks it against the registry by derived name and, on a collision, asks
//! the [`DecisionProvider`] how to proceed before touching anything.
//!
//! Imports of the same name are serialized: a second attempt waits for the
//! first to finish and then sees the registry state it left behind. The
//! locks are [`NameLocks`] and can be shared with an
//! [`OverlayScanner`](super::OverlayScanner) so scans serialize too.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ImportSettings;
use crate::overlay::{replacement_root, Overlay};
use crate::registry::OverlayRegistry;

use super::container::{open_container, ContainerContents, ContainerReader};
use super::decision::{DecisionProvider, ImportConflict, ImportDecision};
use super::error::{ImportError, ImportResult};
use super::locks::{NameGuard, NameLocks};
use super::naming::{derive_name, numbered_name};
use super::records::{
    mark_not_downloaded, upsert_loaded, LayerKey, LayerRecord, LayerRecordStore, LayerStatus,
};

/// A file to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub path: PathBuf,
    /// Server layer id, when the file belongs to one.
    pub layer_id: Option<i64>,
    pub event_id: Option<i64>,
}

impl ImportRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layer_id: None,
            event_id: None,
        }
    }

    pub fn with_layer_id(mut self, layer_id: i64) -> Self {
        self.layer_id = Some(layer_id);
        self
    }

    pub fn with_event_id(mut self, event_id: i64) -> Self {
        self.event_id = Some(event_id);
        self
    }

    fn record_key(&self, cache_name: &str) -> LayerKey {
        LayerKey::for_overlay(cache_name, self.layer_id, self.event_id)
    }

    fn status(&self) -> LayerStatus {
        LayerStatus::loaded(self.layer_id)
    }
}

/// How an import ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportResolution {
    /// No collision; registered directly.
    Fresh,
    /// Collision resolved as do-not-import, abandoned or timed out.
    Skipped,
    /// Registered alongside the existing overlay under a new cache name.
    ImportedAsNew,
    /// Replaced the existing overlay in place.
    Overwritten,
    /// The file could not be loaded.
    Rejected,
}

impl fmt::Display for ImportResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "imported"),
            Self::Skipped => write!(f, "skipped"),
            Self::ImportedAsNew => write!(f, "imported as new"),
            Self::Overwritten => write!(f, "overwritten"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Result of [`ImportResolver::import`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: bool,
    /// Cache name the data ended up under (or would have).
    pub cache_name: String,
    pub resolution: ImportResolution,
}

impl ImportOutcome {
    fn new(cache_name: impl Into<String>, resolution: ImportResolution) -> Self {
        let imported = matches!(
            resolution,
            ImportResolution::Fresh | ImportResolution::ImportedAsNew | ImportResolution::Overwritten
        );
        Self {
            imported,
            cache_name: cache_name.into(),
            resolution,
        }
    }
}

/// Drives the import workflow against one registry.
///
/// Cloning shares the per-name locks, so clones serialize with each other.
#[derive(Clone)]
pub struct ImportResolver {
    registry: OverlayRegistry,
    reader: Arc<dyn ContainerReader>,
    records: Arc<dyn LayerRecordStore>,
    decisions: Arc<dyn DecisionProvider>,
    decision_timeout: Option<Duration>,
    locks: NameLocks,
}

impl ImportResolver {
    pub fn new(
        registry: OverlayRegistry,
        reader: Arc<dyn ContainerReader>,
        records: Arc<dyn LayerRecordStore>,
        decisions: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            registry,
            reader,
            records,
            decisions,
            decision_timeout: None,
            locks: NameLocks::new(),
        }
    }

    /// Give up on a pending decision after `timeout`. `None` waits forever.
    pub fn with_decision_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decision_timeout = timeout;
        self
    }

    /// Apply the `[import]` settings.
    pub fn with_settings(self, settings: &ImportSettings) -> Self {
        self.with_decision_timeout(settings.decision_timeout())
    }

    /// Serialize against `locks` instead of a private set.
    pub fn with_name_locks(mut self, locks: NameLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Import a container file.
    ///
    /// Never fails: problems are logged and reported as
    /// [`ImportResolution::Rejected`]. Cancelling `cancel` while a decision is
    /// pending behaves exactly like [`ImportDecision::DoNotImport`].
    pub async fn import(&self, request: ImportRequest, cancel: &CancellationToken) -> ImportOutcome {
        let Some(name) = derive_name(&request.path) else {
            warn!(error = %ImportError::InvalidName(request.path.clone()), "Import rejected");
            return ImportOutcome::new(String::new(), ImportResolution::Rejected);
        };

        let guard = self.locks.lock(&name).await;
        let outcome = match self.run(&name, &request, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(name = %name, path = %request.path.display(), error = %e, "Import failed");
                ImportOutcome::new(name.clone(), ImportResolution::Rejected)
            }
        };
        drop(guard);

        info!(
            name = %name,
            cache_name = %outcome.cache_name,
            resolution = %outcome.resolution,
            "Import finished"
        );
        outcome
    }

    async fn run(
        &self,
        name: &str,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> ImportResult<ImportOutcome> {
        let contents = match open_container(self.reader.as_ref(), &request.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(name = %name, error = %e, "Container rejected");
                mark_not_downloaded(self.records.as_ref(), &request.record_key(name))?;
                return Ok(ImportOutcome::new(name, ImportResolution::Rejected));
            }
        };
        debug!(name = %name, tables = contents.table_count(), "Container opened");

        self.registry.add_processing(name).await;
        let result = self.register(name, request, contents, cancel).await;
        self.registry.remove_processing(name).await;
        result
    }

    async fn register(
        &self,
        name: &str,
        request: &ImportRequest,
        contents: ContainerContents,
        cancel: &CancellationToken,
    ) -> ImportResult<ImportOutcome> {
        let Some(existing) = self.registry.get_by_cache_name(name).await else {
            upsert_loaded(
                self.records.as_ref(),
                request.record_key(name),
                request.layer_id,
                name,
                &request.path,
                request.status(),
            )?;
            let overlay = contents.into_overlay(name, name, &request.path);
            self.registry.add_overlay(overlay.into()).await;
            return Ok(ImportOutcome::new(name, ImportResolution::Fresh));
        };

        let conflict = ImportConflict {
            name: name.to_string(),
            path: request.path.clone(),
            existing,
        };

        match self.decide(&conflict, cancel).await {
            ImportDecision::DoNotImport => Ok(ImportOutcome::new(name, ImportResolution::Skipped)),
            ImportDecision::ImportAsNew => {
                let (cache_name, _copy_guard) = self.claim_numbered_name(name).await;
                self.records.create(
                    LayerRecord::new(
                        LayerKey::new(cache_name.clone(), request.event_id),
                        &cache_name,
                        &request.path,
                        request.status(),
                    )
                    .with_layer_id(request.layer_id),
                )?;

                let mut overlay: Overlay = contents
                    .into_overlay(&cache_name, &cache_name, &request.path)
                    .into();
                overlay.set_added(true);
                overlay.set_replaced(Some(replacement_root(&conflict.existing)));
                self.registry.add_overlay(overlay).await;
                Ok(ImportOutcome::new(cache_name, ImportResolution::ImportedAsNew))
            }
            ImportDecision::Overwrite => {
                upsert_loaded(
                    self.records.as_ref(),
                    request.record_key(name),
                    request.layer_id,
                    name,
                    &request.path,
                    request.status(),
                )?;
                let overlay = contents.into_overlay(name, name, &request.path);
                self.registry.add_overlay(overlay.into()).await;
                Ok(ImportOutcome::new(name, ImportResolution::Overwritten))
            }
        }
    }

    /// Ask for a decision; cancellation, timeout and abandonment all skip.
    async fn decide(&self, conflict: &ImportConflict, cancel: &CancellationToken) -> ImportDecision {
        let pending = self.decisions.decide(conflict);
        let decision = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(name = %conflict.name, "Import decision cancelled");
                None
            }

            decision = async {
                match self.decision_timeout {
                    Some(timeout) => tokio::time::timeout(timeout, pending).await.unwrap_or_else(|_| {
                        debug!(name = %conflict.name, "Import decision timed out");
                        None
                    }),
                    None => pending.await,
                }
            } => decision,
        };
        decision.unwrap_or(ImportDecision::DoNotImport)
    }

    /// Smallest `"{name}_{n}"` (n >= 1) that is neither registered nor locked,
    /// held until the copy is registered.
    async fn claim_numbered_name(&self, name: &str) -> (String, NameGuard) {
        let mut n = 1;
        loop {
            let candidate = numbered_name(name, n);
            n += 1;
            let Some(guard) = self.locks.try_lock(&candidate) else {
                debug!(candidate = %candidate, "Numbered name busy");
                continue;
            };
            if self.registry.get_by_cache_name(&candidate).await.is_none() {
                return (candidate, guard);
            }
        }
    }

    /// Locks shared with anything else registering overlays by name.
    pub fn name_locks(&self) -> NameLocks {
        self.locks.clone()
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }
}
