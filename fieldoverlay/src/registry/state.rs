//! Registry state owned by the daemon.
//!
//! Nothing here is shared: the daemon is the only writer and hands out
//! `Arc<Overlay>` clones to readers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::overlay::{replacement_root, Overlay};

/// Overlays keyed by cache name plus their registration order.
///
/// `order` and the keys of `overlays` always hold the same set.
#[derive(Debug, Default)]
pub struct RegistryState {
    overlays: HashMap<String, Arc<Overlay>>,
    order: Vec<String>,
    processing: Vec<String>,
    current_event: Option<i64>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge one overlay.
    ///
    /// When the cache name is already taken the incoming overlay inherits the
    /// existing enabled flags, and an `added` overlay points its `replaced`
    /// reference at the original it supersedes.
    pub fn insert(&mut self, mut overlay: Overlay) {
        let key = overlay.cache_name().to_string();

        match self.overlays.get(&key) {
            Some(existing) => {
                inherit_enabled(existing, &overlay);
                if overlay.is_added() {
                    overlay.set_replaced(Some(replacement_root(existing)));
                }
            }
            None => self.order.push(key.clone()),
        }

        self.overlays.insert(key, Arc::new(overlay));
    }

    /// Drop everything and insert `overlays` in order.
    pub fn replace_all(&mut self, overlays: Vec<Overlay>) {
        self.overlays.clear();
        self.order.clear();
        for overlay in overlays {
            self.insert(overlay);
        }
    }

    pub fn remove(&mut self, cache_name: &str) -> Option<Arc<Overlay>> {
        let removed = self.overlays.remove(cache_name)?;
        self.order.retain(|key| key != cache_name);
        Some(removed)
    }

    pub fn get(&self, cache_name: &str) -> Option<Arc<Overlay>> {
        self.overlays.get(cache_name).cloned()
    }

    /// Overlay at `index` in registration order.
    pub fn at_index(&self, index: usize) -> Option<Arc<Overlay>> {
        self.order.get(index).and_then(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Cache names in registration order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Every top-level overlay sorted by cache name.
    pub fn sorted(&self) -> Vec<Arc<Overlay>> {
        let mut overlays: Vec<_> = self.overlays.values().cloned().collect();
        overlays.sort_by(|a, b| a.cache_name().cmp(b.cache_name()));
        overlays
    }

    /// Find a container child by its cache name, with its owning container.
    pub fn find_child(&self, cache_name: &str) -> Option<(Arc<Overlay>, Arc<Overlay>)> {
        self.overlays.values().find_map(|parent| {
            parent
                .children()
                .iter()
                .find(|child| child.cache_name() == cache_name)
                .map(|child| (Arc::clone(parent), Arc::clone(child)))
        })
    }

    /// The container owning the table with `child_cache_name`.
    pub fn parent_of(&self, child_cache_name: &str) -> Option<Arc<Overlay>> {
        self.find_child(child_cache_name).map(|(parent, _)| parent)
    }

    /// Apply an enabled change. Returns false for unknown names.
    ///
    /// Containers cascade to their children. A child updates itself and then
    /// sets its container to "any child enabled".
    pub fn set_enabled(&self, cache_name: &str, enabled: bool) -> bool {
        if let Some(overlay) = self.overlays.get(cache_name) {
            overlay.set_enabled(enabled);
            return true;
        }

        match self.find_child(cache_name) {
            Some((parent, child)) => {
                child.set_enabled(enabled);
                let any = parent
                    .as_container()
                    .map(|c| c.any_child_enabled())
                    .unwrap_or(enabled);
                parent.set_own_enabled(any);
                true
            }
            None => false,
        }
    }

    /// Mark names busy. Returns true when the set changed.
    pub fn add_processing<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut changed = false;
        for name in names {
            let name = name.into();
            if !self.processing.contains(&name) {
                self.processing.push(name);
                changed = true;
            }
        }
        changed
    }

    pub fn remove_processing(&mut self, name: &str) -> bool {
        let before = self.processing.len();
        self.processing.retain(|n| n != name);
        self.processing.len() != before
    }

    pub fn is_processing(&self, name: &str) -> bool {
        self.processing.iter().any(|n| n == name)
    }

    pub fn processing(&self) -> &[String] {
        &self.processing
    }

    pub fn current_event(&self) -> Option<i64> {
        self.current_event
    }

    pub fn set_current_event(&mut self, event_id: Option<i64>) {
        self.current_event = event_id;
    }
}

/// Carry enabled flags from `existing` onto its incoming replacement.
///
/// Children are matched by cache name; new children keep their own flag.
fn inherit_enabled(existing: &Overlay, incoming: &Overlay) {
    incoming.set_own_enabled(existing.is_enabled());
    for child in incoming.children() {
        if let Some(previous) = existing
            .children()
            .iter()
            .find(|c| c.cache_name() == child.cache_name())
        {
            child.set_own_enabled(previous.is_enabled());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{ContainerOverlay, FeatureTableOverlay, TileTableOverlay, TiledDirectoryOverlay};

    fn directory(name: &str) -> Overlay {
        TiledDirectoryOverlay::from_parts(name, format!("/tiles/{}", name), 1, 0, 0).into()
    }

    fn container(name: &str) -> Overlay {
        ContainerOverlay::new(
            name,
            format!("/docs/{}.gpkg", name),
            vec![TileTableOverlay::new("imagery", 10, 0, 12)],
            vec![FeatureTableOverlay::new("points", 3, 0)],
        )
        .into()
    }

    fn added(mut overlay: Overlay) -> Overlay {
        overlay.set_added(true);
        overlay
    }

    #[test]
    fn test_insert_appends_order() {
        let mut state = RegistryState::new();
        state.insert(directory("b"));
        state.insert(directory("a"));

        assert_eq!(state.order(), &["b".to_string(), "a".to_string()]);
        assert_eq!(state.at_index(0).map(|o| o.cache_name().to_string()), Some("b".into()));
        let sorted: Vec<_> = state.sorted().iter().map(|o| o.cache_name().to_string()).collect();
        assert_eq!(sorted, vec!["a", "b"]);
    }

    #[test]
    fn test_insert_existing_keeps_single_entry() {
        let mut state = RegistryState::new();
        state.insert(directory("a"));
        state.insert(directory("a"));

        assert_eq!(state.len(), 1);
        assert_eq!(state.order().len(), 1);
    }

    #[test]
    fn test_insert_inherits_enabled() {
        let mut state = RegistryState::new();
        state.insert(directory("a"));
        assert!(state.set_enabled("a", true));

        state.insert(directory("a"));
        assert!(state.get("a").map(|o| o.is_enabled()).unwrap_or(false));
    }

    #[test]
    fn test_insert_inherits_child_enabled() {
        let mut state = RegistryState::new();
        state.insert(container("roads"));
        state.set_enabled("roads-points", true);

        state.insert(container("roads"));
        let roads = state.get("roads").expect("registered");
        let flags: Vec<_> = roads.children().iter().map(|c| c.is_enabled()).collect();
        assert_eq!(flags, vec![false, true]);
        assert!(roads.is_enabled());
    }

    #[test]
    fn test_replacement_chain_collapses() {
        let mut state = RegistryState::new();
        state.insert(directory("a"));
        let original = state.get("a").expect("registered");

        state.insert(added(directory("a")));
        state.insert(added(directory("a")));

        let latest = state.get("a").expect("registered");
        let replaced = latest.replaced().expect("replaced set");
        assert!(Arc::ptr_eq(replaced, &original));
        assert!(replaced.replaced().is_none());
    }

    #[test]
    fn test_not_added_leaves_replaced_unset() {
        let mut state = RegistryState::new();
        state.insert(directory("a"));
        state.insert(directory("a"));
        assert!(state.get("a").and_then(|o| o.replaced().cloned()).is_none());
    }

    #[test]
    fn test_remove_keeps_order_in_sync() {
        let mut state = RegistryState::new();
        state.insert(directory("a"));
        state.insert(directory("b"));

        assert!(state.remove("a").is_some());
        assert!(state.remove("a").is_none());
        assert_eq!(state.order(), &["b".to_string()]);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_set_enabled_container_cascades() {
        let mut state = RegistryState::new();
        state.insert(container("roads"));

        state.set_enabled("roads", true);
        let roads = state.get("roads").expect("registered");
        assert!(roads.children().iter().all(|c| c.is_enabled()));

        state.set_enabled("roads", false);
        assert!(roads.children().iter().all(|c| !c.is_enabled()));
    }

    #[test]
    fn test_set_enabled_child_updates_parent() {
        let mut state = RegistryState::new();
        state.insert(container("roads"));
        let roads = state.get("roads").expect("registered");

        state.set_enabled("roads-imagery", true);
        assert!(roads.is_enabled());
        state.set_enabled("roads-points", true);
        state.set_enabled("roads-imagery", false);
        assert!(roads.is_enabled());
        state.set_enabled("roads-points", false);
        assert!(!roads.is_enabled());
    }

    #[test]
    fn test_set_enabled_unknown_is_noop() {
        let state = RegistryState::new();
        assert!(!state.set_enabled("missing", true));
    }

    #[test]
    fn test_parent_of_child() {
        let mut state = RegistryState::new();
        state.insert(container("roads"));

        let parent = state.parent_of("roads-points").expect("parent");
        assert_eq!(parent.cache_name(), "roads");
        assert!(state.parent_of("roads").is_none());
    }

    #[test]
    fn test_processing_set() {
        let mut state = RegistryState::new();
        assert!(state.add_processing(["a", "b"]));
        assert!(!state.add_processing(["a"]));
        assert!(state.is_processing("a"));
        assert!(state.remove_processing("a"));
        assert!(!state.remove_processing("a"));
        assert_eq!(state.processing(), &["b".to_string()]);
    }
}
