//! Collaborator contracts consumed and exposed by the registry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::overlay::Overlay;

/// Boxed future used by object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What listeners receive after every registry change.
///
/// One snapshot is built per notification round and shared by every
/// listener in that round.
#[derive(Debug, Default, Clone)]
pub struct OverlaySnapshot {
    /// Visible overlays, sorted by cache name.
    pub overlays: Vec<Arc<Overlay>>,
    /// Names currently being imported.
    pub processing: Vec<String>,
}

impl OverlaySnapshot {
    /// Cache names of the overlays, in snapshot order.
    pub fn cache_names(&self) -> Vec<String> {
        self.overlays
            .iter()
            .map(|o| o.cache_name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// Receives overlay list updates.
///
/// The registry keeps only a weak reference; dropping the last `Arc` to a
/// listener unregisters it implicitly. Deliveries to one listener arrive in
/// the order they were produced.
pub trait OverlayListener: Send + Sync {
    fn overlays_changed(&self, snapshot: Arc<OverlaySnapshot>) -> BoxFuture<'_, ()>;
}

/// Errors from the layer-count repository.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("Layer repository unavailable: {0}")]
    Unavailable(String),
}

/// Counts layer records per event; drives event-scoped visibility.
pub trait LayerCountRepository: Send + Sync {
    /// Number of layers with `layer_id` in `event_id`. Unknown ids count 0.
    fn count(&self, event_id: i64, layer_id: i64) -> BoxFuture<'_, Result<u64, RepositoryError>>;
}
