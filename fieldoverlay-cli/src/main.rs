//! FieldOverlay CLI - Command-line interface
//!
//! This binary provides a command-line interface to the FieldOverlay library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::scan::ScanArgs;

#[derive(Parser)]
#[command(name = "fieldoverlay")]
#[command(version, about = "Manage map overlay datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the overlay directory and list the overlays found
    Scan(ScanArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan(args) => commands::scan::run(args).await,
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
