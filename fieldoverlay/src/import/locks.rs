//! Per-name locks shared by everything that registers overlays by name.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per overlay name.
///
/// Clones share the same locks. An entry is removed once its last guard is
/// dropped and nobody is waiting on it.
#[derive(Clone, Default)]
pub struct NameLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `name` is free and take it.
    pub async fn lock(&self, name: &str) -> NameGuard {
        let guard = self.entry(name).lock_owned().await;
        NameGuard::new(self.clone(), name, guard)
    }

    /// Take `name` if nobody holds it.
    pub fn try_lock(&self, name: &str) -> Option<NameGuard> {
        let guard = self.entry(name).try_lock_owned().ok()?;
        Some(NameGuard::new(self.clone(), name, guard))
    }

    /// Number of names currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn entry(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    fn release(&self, name: &str) {
        self.locks.remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl fmt::Debug for NameLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameLocks").field("held", &self.locks.len()).finish()
    }
}

/// Holds one name until dropped.
pub struct NameGuard {
    locks: NameLocks,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl NameGuard {
    fn new(locks: NameLocks, name: &str, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            locks,
            name: name.to_string(),
            guard: Some(guard),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        // The mutex Arc inside the guard must go before the count check.
        drop(self.guard.take());
        self.locks.release(&self.name);
    }
}

impl fmt::Debug for NameGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameGuard").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_lock_is_exclusive() {
        let locks = NameLocks::new();
        let held = locks.try_lock("roads").expect("free");
        assert_eq!(held.name(), "roads");
        assert!(locks.try_lock("roads").is_none());
        assert!(locks.try_lock("rivers").is_some());

        drop(held);
        assert!(locks.try_lock("roads").is_some());
    }

    #[test]
    fn test_entries_removed_on_release() {
        let locks = NameLocks::new();
        let a = locks.try_lock("a").expect("free");
        let b = locks.clone().try_lock("b").expect("free");
        assert_eq!(locks.len(), 2);

        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_waits_for_holder() {
        let locks = NameLocks::new();
        let held = locks.lock("roads").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock("roads").await.name().to_string() })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.expect("join"), "roads");
        assert!(locks.is_empty());
    }
}
