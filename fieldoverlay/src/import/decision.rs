//! Collision decisions supplied by the caller.

use std::path::PathBuf;
use std::sync::Arc;

use crate::overlay::Overlay;
use crate::registry::BoxFuture;

/// How to proceed when an import collides with a registered overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportDecision {
    /// Leave the registry and records untouched.
    DoNotImport,
    /// Register an additional overlay under a fresh cache name.
    ImportAsNew,
    /// Replace the registered overlay in place.
    Overwrite,
}

/// The collision presented to a [`DecisionProvider`].
#[derive(Debug, Clone)]
pub struct ImportConflict {
    /// Name derived from the incoming file.
    pub name: String,
    /// Path of the incoming file.
    pub path: PathBuf,
    /// The overlay already registered under `name`.
    pub existing: Arc<Overlay>,
}

/// Asks the user (or a policy) how to resolve a collision.
///
/// Returning `None` abandons the import, which is treated like
/// [`ImportDecision::DoNotImport`].
pub trait DecisionProvider: Send + Sync {
    fn decide<'a>(&'a self, conflict: &'a ImportConflict) -> BoxFuture<'a, Option<ImportDecision>>;
}

/// Answers every conflict the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Option<ImportDecision>);

impl DecisionProvider for FixedDecision {
    fn decide<'a>(&'a self, _conflict: &'a ImportConflict) -> BoxFuture<'a, Option<ImportDecision>> {
        let decision = self.0;
        Box::pin(async move { decision })
    }
}
