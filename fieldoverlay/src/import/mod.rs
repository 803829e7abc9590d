//! Importing datasets into the overlay registry.
//!
//! Two entry points:
//!
//! - [`ImportResolver`] imports a single container file, asking a
//!   [`DecisionProvider`] what to do when an overlay with the same derived
//!   name is already registered.
//! - [`OverlayScanner`] reconciles a whole overlay directory with the
//!   registry and garbage-collects overlays whose files disappeared.
//!
//! Both keep [`LayerRecord`]s in step with the registry through a
//! [`LayerRecordStore`], and both take the per-name [`NameLocks`] before
//! registering, so a resolver and a scanner sharing one set never register
//! the same name twice.

mod container;
mod decision;
mod error;
mod locks;
mod naming;
mod records;
mod resolver;
mod scanner;

pub use container::{open_container, ContainerContents, ContainerReader, FeatureTableInfo, TileTableInfo};
pub use decision::{DecisionProvider, FixedDecision, ImportConflict, ImportDecision};
pub use error::{ContainerError, ImportError, ImportResult, RecordError};
pub use locks::{NameGuard, NameLocks};
pub use naming::{derive_name, has_extension, numbered_name};
pub use records::{
    mark_not_downloaded, upsert_loaded, InMemoryLayerRecordStore, LayerKey, LayerRecord,
    LayerRecordStore, LayerStatus,
};
pub use resolver::{ImportOutcome, ImportRequest, ImportResolution, ImportResolver};
pub use scanner::{DatasetKind, Discovered, OverlayScanner, ScanReport};
