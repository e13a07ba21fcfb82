/// Scan events: lightweight messages sent from the scan thread to the
/// frontend via a crossbeam channel.
///
/// Every event carries the generation of the scan that produced it so a
/// frontend can drop anything left over from a superseded scan.
use crate::model::{format_count, SizeResult, SubfolderTask};
use chrono::{DateTime, Local};
use std::time::Duration;

/// Lifecycle of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Listing,
    Probing,
    Completed,
    Cancelled,
    TimedOut,
    ListingFailed,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanPhase::Completed
                | ScanPhase::Cancelled
                | ScanPhase::TimedOut
                | ScanPhase::ListingFailed
        )
    }
}

/// Terminal report for a scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub phase: ScanPhase,
    /// Folders that were actually measured (any status but `Cancelled`).
    pub completed: usize,
    pub total: usize,
    pub duration: Duration,
    pub started_at: DateTime<Local>,
    /// The root had no subfolders at all.
    pub nothing_found: bool,
    /// Listing error, for `ListingFailed`.
    pub error: Option<String>,
}

impl ScanSummary {
    /// One-line, human-readable status for the end of a scan.
    pub fn message(&self) -> String {
        let done = format_count(self.completed as u64);
        let total = format_count(self.total as u64);
        match self.phase {
            ScanPhase::Completed if self.nothing_found => "No subfolders found".to_string(),
            ScanPhase::Completed => format!("Scan complete: {total} folders"),
            ScanPhase::Cancelled => format!("Scan cancelled: {done}/{total} folders measured"),
            ScanPhase::TimedOut => format!("Scan timed out: {done}/{total} folders measured"),
            ScanPhase::ListingFailed => format!(
                "Scan failed: {}",
                self.error.as_deref().unwrap_or("cannot list folder")
            ),
            ScanPhase::Idle | ScanPhase::Listing | ScanPhase::Probing => {
                format!("Scanning: {done}/{total}")
            }
        }
    }
}

/// Messages from the scan thread.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Phase change or progress text for a status line.
    Status {
        generation: u64,
        phase: ScanPhase,
        message: String,
    },
    /// Subfolders found; one row per task, results follow by index.
    Listed {
        generation: u64,
        tasks: Vec<SubfolderTask>,
    },
    /// A flushed batch of results, in no particular order.
    Results {
        generation: u64,
        batch: Vec<SizeResult>,
        /// Distinct results delivered so far, this batch included.
        delivered: usize,
        total: usize,
    },
    /// The scan is over; nothing else follows for this generation.
    Finished {
        generation: u64,
        summary: ScanSummary,
    },
}

impl ScanEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ScanEvent::Status { generation, .. }
            | ScanEvent::Listed { generation, .. }
            | ScanEvent::Results { generation, .. }
            | ScanEvent::Finished { generation, .. } => *generation,
        }
    }
}
