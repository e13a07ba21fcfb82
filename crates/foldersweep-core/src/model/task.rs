/// Scan tasks and their results.
///
/// A task's `index` is the only link between it and its eventual result:
/// results arrive out of order and are routed back to their row by index.
use compact_str::CompactString;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One requested scan: the root and the generation that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub generation: u64,
}

/// A single immediate subfolder of the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfolderTask {
    /// 0-based, stable for the lifetime of one scan.
    pub index: usize,
    pub path: PathBuf,
    /// Folder name only, for display.
    pub name: CompactString,
}

impl SubfolderTask {
    pub fn new(index: usize, path: PathBuf) -> Self {
        let name = display_name(&path);
        Self { index, path, name }
    }
}

fn display_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(n) => CompactString::new(n.to_string_lossy()),
        None => CompactString::new(path.to_string_lossy()),
    }
}

/// Outcome tag for a [`SizeResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeStatus {
    /// Size reflects the folder's recursive byte total at probe time.
    Ok,
    /// Cancellation or the scan deadline preempted the probe.
    Cancelled,
    /// The folder itself could not be listed (access denied).
    Unreadable,
    /// The folder vanished, or the probe failed outright.
    Error,
}

impl SizeStatus {
    pub fn label(self) -> &'static str {
        match self {
            SizeStatus::Ok => "ok",
            SizeStatus::Cancelled => "cancelled",
            SizeStatus::Unreadable => "unreadable",
            SizeStatus::Error => "error",
        }
    }
}

/// The size of one subfolder, produced exactly once per task.
///
/// A non-`Ok` status always carries `size == 0` (a degenerate result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeResult {
    pub index: usize,
    pub size: u64,
    pub status: SizeStatus,
}

impl SizeResult {
    pub fn ok(index: usize, size: u64) -> Self {
        Self {
            index,
            size,
            status: SizeStatus::Ok,
        }
    }

    pub fn degenerate(index: usize, status: SizeStatus) -> Self {
        Self {
            index,
            size: 0,
            status,
        }
    }

    pub fn cancelled(index: usize) -> Self {
        Self::degenerate(index, SizeStatus::Cancelled)
    }

    pub fn is_ok(&self) -> bool {
        self.status == SizeStatus::Ok
    }
}
