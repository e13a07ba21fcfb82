/// FolderSweep Core: subfolder size scanning, result model, and cleanup.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends (CLI today, anything else tomorrow) drive it through
/// [`scanner::Scanner`] and read results off its event channel.
///
/// # Modules
///
/// - [`model`]: Scan tasks, size results, the folder table, and size formatting.
/// - [`scanner`]: Size probe, bounded worker pool, batching aggregator, and the
///   scan coordinator.
/// - [`platform`]: Platform directory-listing command used as the fast size tier.
/// - [`cleanup`]: Best-effort bulk folder deletion.
/// - [`config`]: Tunables for a scan.
/// - [`error`]: Scan-level error type.
pub mod cleanup;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;

pub use cleanup::{delete_folders, DeleteReport};
pub use config::{ProbeConfig, ScanConfig};
pub use error::{Result, ScanError};
pub use model::{
    human_readable_size, size_to_bytes, FolderTable, SizeResult, SizeStatus, SortOrder,
    SubfolderTask,
};
pub use scanner::{CancelToken, ScanEvent, ScanHandle, ScanPhase, ScanSummary, Scanner};
