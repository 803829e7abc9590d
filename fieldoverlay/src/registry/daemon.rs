//! Registry daemon.
//!
//! The [`RegistryDaemon`] runs as an independent async task that owns the
//! [`RegistryState`] and applies [`RegistryCommand`]s one at a time, so no
//! two mutations ever interleave.
//!
//! Listener delivery goes through a per-listener queue drained by its own
//! task. A listener that calls back into the registry from its callback
//! therefore cannot stall the daemon.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::overlay::Overlay;

use super::command::RegistryCommand;
use super::state::RegistryState;
use super::traits::{LayerCountRepository, OverlayListener, OverlaySnapshot};
use super::visibility::filter_visible;

/// A registered listener and the queue feeding it.
struct ListenerEntry {
    listener: Weak<dyn OverlayListener>,
    tx: mpsc::UnboundedSender<Arc<OverlaySnapshot>>,
}

impl ListenerEntry {
    fn spawn(listener: Weak<dyn OverlayListener>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<OverlaySnapshot>>();
        let target = Weak::clone(&listener);

        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                let Some(listener) = target.upgrade() else {
                    break;
                };
                listener.overlays_changed(snapshot).await;
            }
        });

        Self { listener, tx }
    }

    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }

    fn matches(&self, other: &Weak<dyn OverlayListener>) -> bool {
        Weak::ptr_eq(&self.listener, other)
    }

    fn deliver(&self, snapshot: &Arc<OverlaySnapshot>) -> bool {
        self.tx.send(Arc::clone(snapshot)).is_ok()
    }
}

/// The single writer behind every [`OverlayRegistry`](super::OverlayRegistry).
pub struct RegistryDaemon {
    rx: mpsc::UnboundedReceiver<RegistryCommand>,
    state: RegistryState,
    repository: Arc<dyn LayerCountRepository>,
    listeners: Vec<ListenerEntry>,
    notifications: u64,
}

impl RegistryDaemon {
    pub fn new(
        rx: mpsc::UnboundedReceiver<RegistryCommand>,
        repository: Arc<dyn LayerCountRepository>,
    ) -> Self {
        Self {
            rx,
            state: RegistryState::new(),
            repository,
            listeners: Vec::new(),
            notifications: 0,
        }
    }

    /// Run until shutdown is signaled or every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Overlay registry starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Overlay registry shutting down");
                    break;
                }

                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.process(command).await,
                        None => {
                            debug!("All registry handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        self.rx.close();
        debug!(overlays = self.state.len(), "Overlay registry stopped");
    }

    async fn process(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::RegisterListener { listener, reply } => {
                self.register(listener).await;
                let _ = reply.send(());
            }
            RegistryCommand::UnregisterListener { listener, reply } => {
                self.listeners.retain(|entry| !entry.matches(&listener));
                let _ = reply.send(());
            }
            RegistryCommand::SetOverlays { overlays, reply } => {
                debug!(count = overlays.len(), "Replacing all overlays");
                self.state.replace_all(overlays);
                self.notify(None).await;
                let _ = reply.send(());
            }
            RegistryCommand::AddOverlays { overlays, reply } => {
                if !overlays.is_empty() {
                    debug!(count = overlays.len(), "Adding overlays");
                    for overlay in overlays {
                        self.state.insert(overlay);
                    }
                    self.notify(None).await;
                }
                let _ = reply.send(());
            }
            RegistryCommand::RemoveOverlay { cache_name, reply } => {
                let removed = self.state.remove(&cache_name);
                if removed.is_some() {
                    debug!(cache_name = %cache_name, "Removed overlay");
                    self.notify(None).await;
                }
                let _ = reply.send(removed);
            }
            RegistryCommand::RemoveAll { reply } => {
                let keys = self.state.order().to_vec();
                let mut removed = 0;
                for key in keys {
                    if self.state.remove(&key).is_some() {
                        removed += 1;
                        self.notify(None).await;
                    }
                }
                let _ = reply.send(removed);
            }
            RegistryCommand::GetOverlays { reply } => {
                let _ = reply.send(self.visible_overlays().await);
            }
            RegistryCommand::AllOverlays { reply } => {
                let all = self
                    .state
                    .order()
                    .iter()
                    .filter_map(|key| self.state.get(key))
                    .collect();
                let _ = reply.send(all);
            }
            RegistryCommand::GetByCacheName { cache_name, reply } => {
                let _ = reply.send(self.state.get(&cache_name));
            }
            RegistryCommand::GetParent { cache_name, reply } => {
                let _ = reply.send(self.state.parent_of(&cache_name));
            }
            RegistryCommand::Count { reply } => {
                let _ = reply.send(self.state.len());
            }
            RegistryCommand::AtIndex { index, reply } => {
                let _ = reply.send(self.state.at_index(index));
            }
            RegistryCommand::AddProcessing { names, reply } => {
                if self.state.add_processing(names) {
                    self.notify(None).await;
                }
                let _ = reply.send(());
            }
            RegistryCommand::RemoveProcessing { name, reply } => {
                if self.state.remove_processing(&name) {
                    self.notify(None).await;
                }
                let _ = reply.send(());
            }
            RegistryCommand::Processing { reply } => {
                let _ = reply.send(self.state.processing().to_vec());
            }
            RegistryCommand::SetEnabled {
                cache_name,
                enabled,
                reply,
            } => {
                let found = self.state.set_enabled(&cache_name, enabled);
                if found {
                    self.notify(None).await;
                } else {
                    debug!(cache_name = %cache_name, "Enable toggle for unknown overlay ignored");
                }
                let _ = reply.send(found);
            }
            RegistryCommand::SetCurrentEvent { event_id, reply } => {
                info!(?event_id, "Active event changed");
                self.state.set_current_event(event_id);
                self.notify(None).await;
                let _ = reply.send(());
            }
            RegistryCommand::Notify { except, reply } => {
                self.notify(except.as_ref()).await;
                let _ = reply.send(());
            }
            RegistryCommand::NotificationCount { reply } => {
                let _ = reply.send(self.notifications);
            }
        }
    }

    async fn visible_overlays(&self) -> Vec<Arc<Overlay>> {
        filter_visible(
            self.state.sorted(),
            self.repository.as_ref(),
            self.state.current_event(),
        )
        .await
    }

    async fn snapshot(&self) -> Arc<OverlaySnapshot> {
        Arc::new(OverlaySnapshot {
            overlays: self.visible_overlays().await,
            processing: self.state.processing().to_vec(),
        })
    }

    async fn register(&mut self, listener: Weak<dyn OverlayListener>) {
        if self.listeners.iter().any(|entry| entry.matches(&listener)) {
            return;
        }
        let entry = ListenerEntry::spawn(listener);
        let snapshot = self.snapshot().await;
        entry.deliver(&snapshot);
        self.listeners.push(entry);
        debug!(listeners = self.listeners.len(), "Listener registered");
    }

    /// Compute one snapshot and queue it for every listener but `except`.
    async fn notify(&mut self, except: Option<&Weak<dyn OverlayListener>>) {
        self.notifications += 1;
        self.listeners.retain(ListenerEntry::is_alive);
        if self.listeners.is_empty() {
            return;
        }

        let snapshot = self.snapshot().await;
        self.listeners.retain(|entry| {
            if except.is_some_and(|skip| entry.matches(skip)) {
                return true;
            }
            entry.deliver(&snapshot)
        });
    }
}
