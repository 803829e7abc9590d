//! Event-scoped visibility filtering.
//!
//! A container that belongs to a server layer is only visible while that
//! layer exists in the active event. Everything else is always visible.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::overlay::Overlay;

use super::traits::{BoxFuture, LayerCountRepository, RepositoryError};

/// Whether `overlay` is visible under `event_id`.
///
/// Repository errors and a missing active event both count as invisible.
pub async fn is_visible(
    overlay: &Overlay,
    repository: &dyn LayerCountRepository,
    event_id: Option<i64>,
) -> bool {
    let Some(layer_id) = overlay.layer_id() else {
        return true;
    };
    let Some(event_id) = event_id else {
        debug!(cache_name = %overlay.cache_name(), layer_id, "No active event, hiding layer overlay");
        return false;
    };
    match repository.count(event_id, layer_id).await {
        Ok(count) => count > 0,
        Err(e) => {
            warn!(
                cache_name = %overlay.cache_name(),
                layer_id,
                event_id,
                error = %e,
                "Layer count lookup failed, hiding overlay"
            );
            false
        }
    }
}

/// Keep the visible overlays, preserving order.
///
/// Lookups for event-scoped containers run concurrently.
pub async fn filter_visible(
    overlays: Vec<Arc<Overlay>>,
    repository: &dyn LayerCountRepository,
    event_id: Option<i64>,
) -> Vec<Arc<Overlay>> {
    let flags = join_all(
        overlays
            .iter()
            .map(|overlay| is_visible(overlay, repository, event_id)),
    )
    .await;

    overlays
        .into_iter()
        .zip(flags)
        .filter_map(|(overlay, visible)| visible.then_some(overlay))
        .collect()
}

/// In-memory layer counts keyed by `(event_id, layer_id)`.
#[derive(Debug, Default)]
pub struct InMemoryLayerCounts {
    counts: DashMap<(i64, i64), u64>,
}

impl InMemoryLayerCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for a layer in an event. Zero removes the entry.
    pub fn set(&self, event_id: i64, layer_id: i64, count: u64) {
        if count == 0 {
            self.counts.remove(&(event_id, layer_id));
        } else {
            self.counts.insert((event_id, layer_id), count);
        }
    }

    pub fn get(&self, event_id: i64, layer_id: i64) -> u64 {
        self.counts
            .get(&(event_id, layer_id))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }
}

impl LayerCountRepository for InMemoryLayerCounts {
    fn count(&self, event_id: i64, layer_id: i64) -> BoxFuture<'_, Result<u64, RepositoryError>> {
        let count = self.get(event_id, layer_id);
        Box::pin(async move { Ok(count) })
    }
}
