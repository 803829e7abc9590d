//! Overlay directory scan command.
//!
//! Runs one scan of the overlay directory through a registry and prints the
//! overlays it ends up holding, including children of containers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use fieldoverlay::import::{
    ContainerContents, ContainerError, ContainerReader, InMemoryLayerRecordStore, OverlayScanner,
};
use fieldoverlay::overlay::Overlay;
use fieldoverlay::registry::{InMemoryLayerCounts, OverlayRegistry};
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the scan command.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Overlay directory (defaults to [overlays] directory from config)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Event id recorded against discovered datasets
    #[arg(long)]
    pub event: Option<i64>,
}

/// Reader used when no container backend is linked into the binary.
///
/// Every container is reported as unsupported, so only tiled image
/// directories are registered.
struct NoContainerBackend;

impl ContainerReader for NoContainerBackend {
    fn open(&self, path: &Path) -> Result<ContainerContents, ContainerError> {
        Err(ContainerError::Unsupported(path.to_path_buf()))
    }
}

/// Run the scan command.
pub async fn run(args: ScanArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("scan");

    let config = runner.config();
    let directory = args
        .dir
        .unwrap_or_else(|| config.overlays.directory.clone());

    let registry = OverlayRegistry::spawn(Arc::new(InMemoryLayerCounts::new()));
    registry.set_current_event(args.event).await;

    let scanner = OverlayScanner::new(
        directory.clone(),
        registry.clone(),
        Arc::new(NoContainerBackend),
        Arc::new(InMemoryLayerRecordStore::new()),
    )
    .with_extensions(config.overlays.container_extensions.clone())
    .with_event_id(args.event);

    let report = scanner.scan().await;
    let overlays = registry.all_overlays().await;
    registry.shutdown();
    let report = report?;

    info!(
        directory = %directory.display(),
        added = report.added.len(),
        failed = report.failed.len(),
        "Scan complete"
    );

    println!("Overlay directory: {}", directory.display());
    println!();

    if overlays.is_empty() {
        println!("No overlays found.");
    } else {
        for overlay in &overlays {
            print_overlay(overlay, 0);
        }
    }

    if !report.failed.is_empty() {
        println!();
        println!("Skipped {} dataset(s):", report.failed.len());
        for path in &report.failed {
            warn!(path = %path.display(), "Dataset skipped");
            println!("  {}", path.display());
        }
    }

    Ok(())
}

fn print_overlay(overlay: &Overlay, depth: usize) {
    let indent = "  ".repeat(depth);
    match overlay.get_info() {
        Some(info) => println!(
            "{}{} [{}] {}",
            indent,
            overlay.name(),
            overlay.kind(),
            info
        ),
        None => println!("{}{} [{}]", indent, overlay.name(), overlay.kind()),
    }
    for child in overlay.children() {
        print_overlay(child, depth + 1);
    }
}
