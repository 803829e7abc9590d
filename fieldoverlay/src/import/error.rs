//! Error types for the import module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a [`ContainerReader`](super::ContainerReader).
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The file could not be read.
    #[error("Failed to read container {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The file is not a valid container.
    #[error("Malformed container {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The container holds no tile or feature tables.
    #[error("Container {0} has no tables")]
    Empty(PathBuf),

    /// No container backend can open this file.
    #[error("Unsupported container {0}")]
    Unsupported(PathBuf),
}

/// Errors from the layer record store.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    #[error("Layer record {0} not found")]
    NotFound(u64),

    #[error("Layer record store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised inside the import workflow.
///
/// These never escape [`ImportResolver::import`](super::ImportResolver::import);
/// they are logged and reported as a rejected outcome.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Record(#[from] RecordError),

    /// No overlay name can be derived from the path.
    #[error("Cannot derive an overlay name from {0}")]
    InvalidName(PathBuf),

    /// Listing the overlay directory failed.
    #[error("Failed to scan {path}: {source}")]
    Scan { path: PathBuf, source: io::Error },
}

/// Result alias for import operations.
pub type ImportResult<T> = Result<T, ImportError>;
