//! Messages sent from [`OverlayRegistry`](super::OverlayRegistry) handles to
//! the registry daemon.

use std::sync::{Arc, Weak};

use tokio::sync::oneshot;

use crate::overlay::Overlay;

use super::traits::OverlayListener;

/// Reply channel for a command.
pub type Reply<T> = oneshot::Sender<T>;

/// A request to the registry daemon.
///
/// Every variant carries a reply channel so callers can await completion,
/// including mutations.
pub enum RegistryCommand {
    RegisterListener {
        listener: Weak<dyn OverlayListener>,
        reply: Reply<()>,
    },
    UnregisterListener {
        listener: Weak<dyn OverlayListener>,
        reply: Reply<()>,
    },
    SetOverlays {
        overlays: Vec<Overlay>,
        reply: Reply<()>,
    },
    AddOverlays {
        overlays: Vec<Overlay>,
        reply: Reply<()>,
    },
    RemoveOverlay {
        cache_name: String,
        reply: Reply<Option<Arc<Overlay>>>,
    },
    RemoveAll {
        reply: Reply<usize>,
    },
    GetOverlays {
        reply: Reply<Vec<Arc<Overlay>>>,
    },
    AllOverlays {
        reply: Reply<Vec<Arc<Overlay>>>,
    },
    GetByCacheName {
        cache_name: String,
        reply: Reply<Option<Arc<Overlay>>>,
    },
    GetParent {
        cache_name: String,
        reply: Reply<Option<Arc<Overlay>>>,
    },
    Count {
        reply: Reply<usize>,
    },
    AtIndex {
        index: usize,
        reply: Reply<Option<Arc<Overlay>>>,
    },
    AddProcessing {
        names: Vec<String>,
        reply: Reply<()>,
    },
    RemoveProcessing {
        name: String,
        reply: Reply<()>,
    },
    Processing {
        reply: Reply<Vec<String>>,
    },
    SetEnabled {
        cache_name: String,
        enabled: bool,
        reply: Reply<bool>,
    },
    SetCurrentEvent {
        event_id: Option<i64>,
        reply: Reply<()>,
    },
    Notify {
        except: Option<Weak<dyn OverlayListener>>,
        reply: Reply<()>,
    },
    NotificationCount {
        reply: Reply<u64>,
    },
}
