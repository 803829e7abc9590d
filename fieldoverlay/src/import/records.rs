//! Layer records: the persisted view of which datasets are loaded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::error::RecordError;

/// Load status of a layer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerStatus {
    /// Known but not present locally (or failed to load).
    NotDownloaded,
    /// Loaded from a locally supplied file, independent of any event.
    LoadedAsExternal,
    /// Loaded for a server layer scoped to an event.
    LoadedAsEventScoped,
}

impl LayerStatus {
    /// Status after a successful load.
    pub fn loaded(layer_id: Option<i64>) -> Self {
        if layer_id.is_some() {
            Self::LoadedAsEventScoped
        } else {
            Self::LoadedAsExternal
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::NotDownloaded)
    }
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDownloaded => write!(f, "not downloaded"),
            Self::LoadedAsExternal => write!(f, "external"),
            Self::LoadedAsEventScoped => write!(f, "event"),
        }
    }
}

/// Lookup key of a layer record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerKey {
    /// External layer id when known, else the overlay cache name.
    pub remote_id: String,
    pub event_id: Option<i64>,
}

impl LayerKey {
    pub fn new(remote_id: impl Into<String>, event_id: Option<i64>) -> Self {
        Self {
            remote_id: remote_id.into(),
            event_id,
        }
    }

    /// Key for an overlay, preferring the external layer id.
    pub fn for_overlay(cache_name: &str, layer_id: Option<i64>, event_id: Option<i64>) -> Self {
        let remote_id = match layer_id {
            Some(id) => id.to_string(),
            None => cache_name.to_string(),
        };
        Self::new(remote_id, event_id)
    }
}

/// One persisted layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    /// Store-assigned id; zero until created.
    pub id: u64,
    pub remote_id: String,
    pub event_id: Option<i64>,
    /// Server layer id. Differs from `remote_id` for copies imported under a
    /// numbered cache name, which are keyed by that name.
    pub layer_id: Option<i64>,
    pub name: String,
    pub file_path: PathBuf,
    pub status: LayerStatus,
}

impl LayerRecord {
    pub fn new(
        key: LayerKey,
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        status: LayerStatus,
    ) -> Self {
        Self {
            id: 0,
            remote_id: key.remote_id,
            event_id: key.event_id,
            layer_id: None,
            name: name.into(),
            file_path: file_path.into(),
            status,
        }
    }

    pub fn with_layer_id(mut self, layer_id: Option<i64>) -> Self {
        self.layer_id = layer_id;
        self
    }

    pub fn key(&self) -> LayerKey {
        LayerKey::new(self.remote_id.clone(), self.event_id)
    }
}

/// Persistence for layer records.
pub trait LayerRecordStore: Send + Sync {
    /// Store a new record and return it with its assigned id.
    fn create(&self, record: LayerRecord) -> Result<LayerRecord, RecordError>;

    /// Replace an existing record, matched by id.
    fn update(&self, record: &LayerRecord) -> Result<(), RecordError>;

    /// Delete by id. Returns whether a record was removed.
    fn delete(&self, id: u64) -> Result<bool, RecordError>;

    fn find_by_key(&self, key: &LayerKey) -> Result<Option<LayerRecord>, RecordError>;

    /// Every record whose file is `path`.
    fn find_by_path(&self, path: &Path) -> Result<Vec<LayerRecord>, RecordError>;
}

/// Create or refresh the record for a loaded dataset.
pub fn upsert_loaded(
    store: &dyn LayerRecordStore,
    key: LayerKey,
    layer_id: Option<i64>,
    name: &str,
    file_path: &Path,
    status: LayerStatus,
) -> Result<LayerRecord, RecordError> {
    match store.find_by_key(&key)? {
        Some(mut record) => {
            if record.layer_id != layer_id
                || record.name != name
                || record.file_path != file_path
                || record.status != status
            {
                record.layer_id = layer_id;
                record.name = name.to_string();
                record.file_path = file_path.to_path_buf();
                record.status = status;
                store.update(&record)?;
            }
            Ok(record)
        }
        None => store.create(LayerRecord::new(key, name, file_path, status).with_layer_id(layer_id)),
    }
}

/// Flag an existing record as not downloaded. Never deletes.
///
/// Returns whether a record was changed.
pub fn mark_not_downloaded(store: &dyn LayerRecordStore, key: &LayerKey) -> Result<bool, RecordError> {
    match store.find_by_key(key)? {
        Some(mut record) if record.status != LayerStatus::NotDownloaded => {
            record.status = LayerStatus::NotDownloaded;
            store.update(&record)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Record store held in memory.
#[derive(Debug)]
pub struct InMemoryLayerRecordStore {
    records: DashMap<u64, LayerRecord>,
    next_id: AtomicU64,
}

impl Default for InMemoryLayerRecordStore {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryLayerRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by id.
    pub fn records(&self) -> Vec<LayerRecord> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

impl LayerRecordStore for InMemoryLayerRecordStore {
    fn create(&self, mut record: LayerRecord) -> Result<LayerRecord, RecordError> {
        record.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, record: &LayerRecord) -> Result<(), RecordError> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(RecordError::NotFound(record.id)),
        }
    }

    fn delete(&self, id: u64) -> Result<bool, RecordError> {
        Ok(self.records.remove(&id).is_some())
    }

    fn find_by_key(&self, key: &LayerKey) -> Result<Option<LayerRecord>, RecordError> {
        Ok(self
            .records
            .iter()
            .find(|r| r.remote_id == key.remote_id && r.event_id == key.event_id)
            .map(|r| r.value().clone()))
    }

    fn find_by_path(&self, path: &Path) -> Result<Vec<LayerRecord>, RecordError> {
        let mut found: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.file_path == path)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_layer_id() {
        assert_eq!(LayerKey::for_overlay("roads", Some(12), Some(3)).remote_id, "12");
        assert_eq!(LayerKey::for_overlay("roads", None, None).remote_id, "roads");
    }

    #[test]
    fn test_status_after_load() {
        assert_eq!(LayerStatus::loaded(Some(1)), LayerStatus::LoadedAsEventScoped);
        assert_eq!(LayerStatus::loaded(None), LayerStatus::LoadedAsExternal);
        assert!(!LayerStatus::NotDownloaded.is_loaded());
    }

    #[test]
    fn test_store_crud() {
        let store = InMemoryLayerRecordStore::new();
        let key = LayerKey::new("roads", None);
        let created = store
            .create(LayerRecord::new(key.clone(), "roads", "/d/roads.gpkg", LayerStatus::LoadedAsExternal))
            .expect("create");
        assert_eq!(created.id, 1);

        let mut found = store.find_by_key(&key).expect("find").expect("present");
        found.status = LayerStatus::NotDownloaded;
        store.update(&found).expect("update");
        assert_eq!(store.records()[0].status, LayerStatus::NotDownloaded);

        assert_eq!(store.find_by_path(Path::new("/d/roads.gpkg")).expect("find").len(), 1);
        assert!(store.delete(created.id).expect("delete"));
        assert!(!store.delete(created.id).expect("delete"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_unknown_fails() {
        let store = InMemoryLayerRecordStore::new();
        let record = LayerRecord::new(LayerKey::new("x", None), "x", "/x", LayerStatus::NotDownloaded);
        assert!(matches!(store.update(&record), Err(RecordError::NotFound(0))));
    }

    #[test]
    fn test_mark_not_downloaded_keeps_record() {
        let store = InMemoryLayerRecordStore::new();
        let key = LayerKey::new("7", Some(1));
        store
            .create(LayerRecord::new(key.clone(), "a", "/a.gpkg", LayerStatus::LoadedAsEventScoped))
            .expect("create");

        assert!(mark_not_downloaded(&store, &key).expect("mark"));
        assert!(!mark_not_downloaded(&store, &key).expect("mark"));
        assert!(!mark_not_downloaded(&store, &LayerKey::new("8", None)).expect("mark"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].status, LayerStatus::NotDownloaded);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let store = InMemoryLayerRecordStore::new();
        let key = LayerKey::new("7", Some(1));
        let first = upsert_loaded(&store, key.clone(), None, "a", Path::new("/a.gpkg"), LayerStatus::NotDownloaded)
            .expect("create");
        let second = upsert_loaded(&store, key, Some(7), "a", Path::new("/a.gpkg"), LayerStatus::LoadedAsEventScoped)
            .expect("update");

        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].status, LayerStatus::LoadedAsEventScoped);
        assert_eq!(store.records()[0].layer_id, Some(7));
    }
}
