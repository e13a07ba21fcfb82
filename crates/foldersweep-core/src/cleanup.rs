/// Bulk folder deletion.
///
/// Best effort: every path is attempted, failures are counted and logged,
/// and nothing is ever returned as an error to the caller.
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of [`delete_folders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: usize,
    pub failed: usize,
    /// `(path, error message)` for each failure, in input order.
    pub failures: Vec<(PathBuf, String)>,
}

impl DeleteReport {
    pub fn message(&self) -> String {
        format!(
            "Deleted {} folder(s), {} failed",
            self.deleted, self.failed
        )
    }
}

/// Recursively delete each path. One failure never stops the rest.
pub fn delete_folders<P: AsRef<Path>>(paths: &[P]) -> DeleteReport {
    let mut report = DeleteReport::default();
    for path in paths {
        let path = path.as_ref();
        match fs::remove_dir_all(path) {
            Ok(()) => report.deleted += 1,
            Err(err) => {
                warn!("Failed to delete {}: {err}", path.display());
                report.failed += 1;
                report.failures.push((path.to_path_buf(), err.to_string()));
            }
        }
    }
    info!("{}", report.message());
    report
}
