//! Integration tests for the overlay registry.
//!
//! Exercises the public registry API end to end: listener replay and
//! fan-out, re-entrant listeners, enable propagation, event-scoped visibility
//! and cascade removal through a map surface.

mod common;

use std::sync::Arc;

use common::*;
use fieldoverlay::coord::BoundingBox;
use fieldoverlay::coord::LatLng;
use fieldoverlay::overlay::{
    ContainerOverlay, FeatureTableOverlay, MapSurface, Overlay, ShapeHandle, TileTableOverlay,
    TiledDirectoryOverlay,
};
use fieldoverlay::registry::{BoxFuture, OverlayListener, OverlayRegistry, OverlaySnapshot};
use parking_lot::Mutex;

fn directory(name: &str) -> Overlay {
    TiledDirectoryOverlay::from_parts(name, format!("/tiles/{}", name), 5, 1, 3).into()
}

fn container(name: &str, path: &str) -> Overlay {
    ContainerOverlay::new(
        name,
        path,
        vec![TileTableOverlay::new("imagery", 50, 2, 12)],
        vec![FeatureTableOverlay::new("points", 10, 5).link_tile_table("imagery")],
    )
    .into()
}

#[derive(Default)]
struct RecordingSurface {
    tile_layers: Mutex<Vec<String>>,
    shapes: Mutex<Vec<ShapeHandle>>,
}

impl MapSurface for RecordingSurface {
    fn zoom(&self) -> f64 {
        12.0
    }

    fn click_bounding_box(&self, location: LatLng) -> BoundingBox {
        BoundingBox::around(location, 0.001)
    }

    fn remove_tile_layer(&self, cache_name: &str) {
        self.tile_layers.lock().push(cache_name.to_string());
    }

    fn remove_shape(&self, handle: ShapeHandle) {
        self.shapes.lock().push(handle);
    }
}

/// Reads the registry from inside its own callback.
struct ReentrantListener {
    registry: OverlayRegistry,
    counts: Mutex<Vec<usize>>,
}

impl OverlayListener for ReentrantListener {
    fn overlays_changed(&self, _snapshot: Arc<OverlaySnapshot>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let count = self.registry.count().await;
            self.counts.lock().push(count);
        })
    }
}

// =============================================================================
// Listeners
// =============================================================================

#[tokio::test]
async fn test_late_listener_gets_current_state() {
    let h = harness();
    h.registry.add_overlays(vec![directory("b"), directory("a")]).await;

    let recorder = Arc::new(RecordingListener::default());
    let listener: Arc<dyn OverlayListener> = recorder.clone();
    h.registry.register_listener(&listener).await;

    assert!(eventually(|| recorder.count() == 1).await);
    let snapshot = recorder.last().expect("delivered");
    assert_eq!(snapshot.cache_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_listener_order_matches_mutations() {
    let h = harness();
    let recorder = Arc::new(RecordingListener::default());
    let listener: Arc<dyn OverlayListener> = recorder.clone();
    h.registry.register_listener(&listener).await;

    h.registry.add_overlay(directory("a")).await;
    h.registry.add_overlay(directory("b")).await;
    h.registry.remove_overlay("a").await;

    assert!(eventually(|| recorder.count() == 4).await);
    let seen: Vec<_> = recorder
        .snapshots
        .lock()
        .iter()
        .map(|s| s.cache_names())
        .collect();
    assert_eq!(
        seen,
        vec![vec![], vec!["a".to_string()], vec!["a".to_string(), "b".to_string()], vec!["b".to_string()]]
    );
}

#[tokio::test]
async fn test_reentrant_listener_does_not_stall_registry() {
    let h = harness();
    let reentrant = Arc::new(ReentrantListener {
        registry: h.registry.clone(),
        counts: Mutex::new(Vec::new()),
    });
    let listener: Arc<dyn OverlayListener> = reentrant.clone();
    h.registry.register_listener(&listener).await;

    h.registry.add_overlay(directory("a")).await;
    h.registry.add_overlay(directory("b")).await;

    assert!(eventually(|| reentrant.counts.lock().len() == 3).await);
    assert_eq!(reentrant.counts.lock().last().copied(), Some(2));
}

// =============================================================================
// Enable state
// =============================================================================

#[tokio::test]
async fn test_enable_state_survives_reload() {
    let h = harness();
    h.registry.add_overlay(container("site", "/docs/site.gpkg")).await;
    assert!(h.registry.set_enabled("site-points", true).await);

    h.registry.add_overlay(container("site", "/docs/site.gpkg")).await;

    let site = h.registry.get_by_cache_name("site").await.expect("registered");
    assert!(site.is_enabled());
    let flags: Vec<_> = site.children().iter().map(|c| c.is_enabled()).collect();
    assert_eq!(flags, vec![false, true]);

    let parent = h.registry.get_parent("site-points").await.expect("parent");
    assert!(Arc::ptr_eq(&parent, &site));
}

#[tokio::test]
async fn test_unknown_enable_toggle_does_not_notify() {
    let h = harness();
    let before = h.registry.notification_count().await;
    assert!(!h.registry.set_enabled("ghost", true).await);
    assert_eq!(h.registry.notification_count().await, before);
}

// =============================================================================
// Visibility
// =============================================================================

#[tokio::test]
async fn test_visibility_round_trip() {
    let h = harness();
    h.registry
        .add_overlays(vec![
            directory("local"),
            container("roads", "/docs/geopackages/4/roads.gpkg"),
        ])
        .await;

    h.registry.set_current_event(Some(1)).await;
    let names = |overlays: Vec<Arc<Overlay>>| -> Vec<String> {
        overlays.iter().map(|o| o.cache_name().to_string()).collect()
    };
    assert_eq!(names(h.registry.get_overlays().await), vec!["local"]);

    h.counts.set(1, 4, 1);
    assert_eq!(names(h.registry.get_overlays().await), vec!["local", "roads"]);

    h.counts.set(1, 4, 0);
    assert_eq!(names(h.registry.get_overlays().await), vec!["local"]);
}

// =============================================================================
// Map removal
// =============================================================================

#[tokio::test]
async fn test_cascade_removal_from_map() {
    let h = harness();
    h.registry.add_overlay(container("site", "/docs/site.gpkg")).await;
    let site = h.registry.get_by_cache_name("site").await.expect("registered");

    let points = site.children()[1].as_feature_table().expect("feature table");
    points.add_shape(1, ShapeHandle(100));
    points.add_shape(2, ShapeHandle(200));

    let surface = RecordingSurface::default();
    site.remove_from_map(&surface);

    let mut shapes = surface.shapes.lock().clone();
    shapes.sort_by_key(|h| h.0);
    assert_eq!(shapes, vec![ShapeHandle(100), ShapeHandle(200)]);
    assert_eq!(points.shape_count(), 0);
    assert_eq!(
        *surface.tile_layers.lock(),
        vec!["site-imagery".to_string(), "site-imagery".to_string()]
    );
}
