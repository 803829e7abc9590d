//! Overlay registry.
//!
//! A single daemon task owns every registered overlay. [`OverlayRegistry`]
//! handles send it commands and await the reply, so readers always observe a
//! consistent state and mutations never interleave.
//!
//! # Listeners
//!
//! Listeners implement [`OverlayListener`] and are held weakly. Each one
//! receives the current snapshot on registration and a fresh one after every
//! mutation. All listeners in a round share the same `Arc<OverlaySnapshot>`.
//!
//! # Visibility
//!
//! Containers that came from a server layer (`.../geopackages/<id>/...`) are
//! only listed by [`OverlayRegistry::get_overlays`] while the
//! [`LayerCountRepository`] reports that layer in the active event.

mod client;
mod command;
mod daemon;
mod state;
mod traits;
mod visibility;


pub use client::OverlayRegistry;
pub use daemon::RegistryDaemon;
pub use state::RegistryState;
pub use traits::{BoxFuture, LayerCountRepository, OverlayListener, OverlaySnapshot, RepositoryError};
pub use visibility::{filter_visible, is_visible, InMemoryLayerCounts};
