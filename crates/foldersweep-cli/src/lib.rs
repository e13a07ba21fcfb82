/// FolderSweep CLI: terminal frontend for the subfolder scanner.
///
/// All filesystem work happens in `foldersweep-core`; this crate only
/// drains scan events, keeps the folder table, renders it, and drives
/// the selection/delete flow.
pub mod app;
pub mod args;
pub mod interrupt;
pub mod report;
pub mod state;

pub use app::run;
pub use args::{Cli, OutputFormat, SortArg};
pub use interrupt::Interrupt;
pub use state::{AppPhase, AppState};
