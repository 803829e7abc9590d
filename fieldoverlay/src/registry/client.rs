//! Cloneable handle to the registry daemon.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::overlay::Overlay;

use super::command::{Reply, RegistryCommand};
use super::daemon::RegistryDaemon;
use super::traits::{LayerCountRepository, OverlayListener};

/// Handle to the overlay registry.
///
/// Every call is a request to the daemon task and resolves once the daemon
/// has applied it. Handles are cheap to clone; share one per process.
///
/// After [`shutdown`](Self::shutdown) every call resolves to its empty result.
#[derive(Clone)]
pub struct OverlayRegistry {
    tx: mpsc::UnboundedSender<RegistryCommand>,
    shutdown: CancellationToken,
}

impl OverlayRegistry {
    /// Create a handle and the daemon it talks to.
    ///
    /// The caller is responsible for running the daemon with the returned
    /// token (or a parent of it).
    pub fn new(
        repository: Arc<dyn LayerCountRepository>,
    ) -> (Self, RegistryDaemon, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let daemon = RegistryDaemon::new(rx, repository);
        (
            Self {
                tx,
                shutdown: shutdown.clone(),
            },
            daemon,
            shutdown,
        )
    }

    /// Create a handle and spawn its daemon on the current runtime.
    pub fn spawn(repository: Arc<dyn LayerCountRepository>) -> Self {
        let (registry, daemon, shutdown) = Self::new(repository);
        tokio::spawn(daemon.run(shutdown));
        registry
    }

    /// Stop the daemon.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.tx.is_closed()
    }

    async fn request<T: Default>(&self, build: impl FnOnce(Reply<T>) -> RegistryCommand) -> T {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(build(reply)).is_err() {
            warn!("Overlay registry is not running");
            return T::default();
        }
        rx.await.unwrap_or_default()
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener and deliver the current snapshot to it.
    ///
    /// Only a weak reference is kept. Registering the same listener twice is
    /// a no-op.
    pub async fn register_listener(&self, listener: &Arc<dyn OverlayListener>) {
        let listener = Arc::downgrade(listener);
        self.request(|reply| RegistryCommand::RegisterListener { listener, reply })
            .await
    }

    /// Remove a listener by identity. Unknown listeners are ignored.
    pub async fn unregister_listener(&self, listener: &Arc<dyn OverlayListener>) {
        let listener = Arc::downgrade(listener);
        self.request(|reply| RegistryCommand::UnregisterListener { listener, reply })
            .await
    }

    /// Push the current snapshot to every listener.
    pub async fn notify_listeners(&self) {
        self.request(|reply| RegistryCommand::Notify {
            except: None,
            reply,
        })
        .await
    }

    /// Push the current snapshot to every listener except `caller`.
    pub async fn notify_listeners_except(&self, caller: &Arc<dyn OverlayListener>) {
        let except = Some(Arc::downgrade(caller));
        self.request(|reply| RegistryCommand::Notify { except, reply })
            .await
    }

    /// Number of notification rounds performed so far.
    pub async fn notification_count(&self) -> u64 {
        self.request(|reply| RegistryCommand::NotificationCount { reply })
            .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace the whole overlay set.
    pub async fn set_overlays(&self, overlays: Vec<Overlay>) {
        self.request(|reply| RegistryCommand::SetOverlays { overlays, reply })
            .await
    }

    /// Add or merge one overlay.
    pub async fn add_overlay(&self, overlay: Overlay) {
        self.add_overlays(vec![overlay]).await
    }

    /// Add or merge a batch, notifying once after the whole batch.
    pub async fn add_overlays(&self, overlays: Vec<Overlay>) {
        self.request(|reply| RegistryCommand::AddOverlays { overlays, reply })
            .await
    }

    /// Remove an overlay, returning it if it was registered.
    pub async fn remove_overlay(&self, cache_name: &str) -> Option<Arc<Overlay>> {
        let cache_name = cache_name.to_string();
        self.request(|reply| RegistryCommand::RemoveOverlay { cache_name, reply })
            .await
    }

    /// Remove every overlay one at a time. Returns how many were removed.
    pub async fn remove_all(&self) -> usize {
        self.request(|reply| RegistryCommand::RemoveAll { reply })
            .await
    }

    /// Toggle an overlay or a container table. Returns false if unknown.
    pub async fn set_enabled(&self, cache_name: &str, enabled: bool) -> bool {
        let cache_name = cache_name.to_string();
        self.request(|reply| RegistryCommand::SetEnabled {
            cache_name,
            enabled,
            reply,
        })
        .await
    }

    /// Switch the event used for layer visibility.
    pub async fn set_current_event(&self, event_id: Option<i64>) {
        self.request(|reply| RegistryCommand::SetCurrentEvent { event_id, reply })
            .await
    }

    // =========================================================================
    // Busy names
    // =========================================================================

    pub async fn add_processing(&self, name: &str) {
        self.add_processing_many(vec![name.to_string()]).await
    }

    pub async fn add_processing_many(&self, names: Vec<String>) {
        self.request(|reply| RegistryCommand::AddProcessing { names, reply })
            .await
    }

    pub async fn remove_processing(&self, name: &str) {
        let name = name.to_string();
        self.request(|reply| RegistryCommand::RemoveProcessing { name, reply })
            .await
    }

    pub async fn processing(&self) -> Vec<String> {
        self.request(|reply| RegistryCommand::Processing { reply })
            .await
    }

    pub async fn is_processing(&self, name: &str) -> bool {
        self.processing().await.iter().any(|n| n == name)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Visible overlays sorted by cache name.
    pub async fn get_overlays(&self) -> Vec<Arc<Overlay>> {
        self.request(|reply| RegistryCommand::GetOverlays { reply })
            .await
    }

    /// Every registered overlay in registration order, ignoring visibility.
    pub async fn all_overlays(&self) -> Vec<Arc<Overlay>> {
        self.request(|reply| RegistryCommand::AllOverlays { reply })
            .await
    }

    /// Look up a top-level overlay, ignoring visibility.
    pub async fn get_by_cache_name(&self, cache_name: &str) -> Option<Arc<Overlay>> {
        let cache_name = cache_name.to_string();
        self.request(|reply| RegistryCommand::GetByCacheName { cache_name, reply })
            .await
    }

    /// The container that owns the table with `child_cache_name`.
    pub async fn get_parent(&self, child_cache_name: &str) -> Option<Arc<Overlay>> {
        let cache_name = child_cache_name.to_string();
        self.request(|reply| RegistryCommand::GetParent { cache_name, reply })
            .await
    }

    /// Number of registered overlays, ignoring visibility.
    pub async fn count(&self) -> usize {
        self.request(|reply| RegistryCommand::Count { reply }).await
    }

    /// Overlay at `index` in registration order.
    pub async fn at_index(&self, index: usize) -> Option<Arc<Overlay>> {
        self.request(|reply| RegistryCommand::AtIndex { index, reply })
            .await
    }
}
