/// Data model for a FolderSweep scan.
///
/// Re-exports the task/result types, the index-stable folder table, and
/// size formatting helpers.
pub mod folder_table;
pub mod size;
pub mod task;

pub use folder_table::{
    truncate_name, FolderRow, FolderTable, SortOrder, DEFAULT_NAME_WIDTH,
    DEFAULT_SMALL_FOLDER_THRESHOLD,
};
pub use size::{format_count, human_readable_size, size_to_bytes};
pub use task::{ScanRequest, SizeResult, SizeStatus, SubfolderTask};
