//! FolderSweep: size up the subfolders of a directory and clean them out.
//!
//! Thin binary entry point. All logic lives in the `foldersweep-core`
//! and `foldersweep-cli` crates.

use clap::Parser;
use foldersweep_cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging. Stdout is reserved for results.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("FolderSweep starting");

    foldersweep_cli::run(cli)
}
