/// Application state management.
///
/// Centralises everything the frontend reads and writes. The scanner
/// reports over its event channel; state updates happen only in
/// `process_scan_messages()` / `wait_for_event()`, so the folder table is
/// never touched from two threads.
use foldersweep_core::model::DEFAULT_SMALL_FOLDER_THRESHOLD;
use foldersweep_core::{
    delete_folders, DeleteReport, FolderTable, ScanConfig, ScanEvent, ScanHandle, ScanPhase,
    ScanSummary, Scanner, SortOrder,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The current phase of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// Idle: nothing scanned yet, or the last scan could not start.
    Idle,
    /// Scanning: rows listed, sizes still arriving.
    Scanning,
    /// Scan over: the table holds final results.
    Results,
}

/// Maximum scan events handled per call to `process_scan_messages`.
///
/// Keeps one tick bounded when a fast scan has queued a large backlog.
pub const MAX_MESSAGES_PER_TICK: usize = 300;

/// All application state.
pub struct AppState {
    // ── Scan ───────────────────────────────────────────
    pub phase: AppPhase,
    scanner: Scanner,
    pub scan_handle: Option<ScanHandle>,
    pub scan_root: Option<PathBuf>,
    /// Distinct results delivered for the current scan.
    pub scan_delivered: usize,
    pub scan_total: usize,
    /// Latest status line.
    pub status: String,
    /// Set once the current scan has finished.
    pub summary: Option<ScanSummary>,

    // ── Results ────────────────────────────────────────
    pub table: FolderTable,
    /// Sort direction, carried over to the table of every new scan.
    sort_order: SortOrder,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl AppState {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_scanner(Scanner::new(config))
    }

    /// Build state around an existing scanner (custom probes in tests).
    pub fn with_scanner(scanner: Scanner) -> Self {
        Self {
            phase: AppPhase::Idle,
            scanner,
            scan_handle: None,
            scan_root: None,
            scan_delivered: 0,
            scan_total: 0,
            status: String::from("Ready"),
            summary: None,
            table: FolderTable::new(),
            sort_order: SortOrder::default(),
        }
    }

    /// Start scanning the subfolders of `path`.
    ///
    /// A scan already in flight is superseded. On error the state goes
    /// back to `Idle` with the error as status line.
    pub fn start_scan(&mut self, path: impl Into<PathBuf>) -> foldersweep_core::Result<()> {
        let path = path.into();
        self.phase = AppPhase::Scanning;
        self.scan_root = Some(path.clone());
        self.scan_delivered = 0;
        self.scan_total = 0;
        self.summary = None;
        self.table = FolderTable::new();
        self.table.set_sort_order(self.sort_order);
        self.status = format!("Listing {}", path.display());

        match self.scanner.start_scan(path) {
            Ok(handle) => {
                self.scan_handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.phase = AppPhase::Idle;
                self.scan_handle = None;
                self.status = err.to_string();
                Err(err)
            }
        }
    }

    /// Scan the same root again, e.g. after deleting folders from it.
    pub fn rescan(&mut self) -> foldersweep_core::Result<()> {
        match self.scan_root.clone() {
            Some(root) => self.start_scan(root),
            None => Ok(()),
        }
    }

    /// Cancel any running scan.
    pub fn cancel_scan(&mut self) {
        if let Some(ref handle) = self.scan_handle {
            self.scanner.cancel_scan(handle);
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.phase == AppPhase::Scanning
    }

    /// Process pending scan events without blocking. Called once per tick.
    ///
    /// Returns `true` if anything changed.
    pub fn process_scan_messages(&mut self) -> bool {
        if self.scan_handle.is_none() {
            return false;
        }

        let mut changed = false;
        let mut handled = 0usize;
        while handled < MAX_MESSAGES_PER_TICK {
            let Some(event) = self.scanner.try_recv() else {
                break;
            };
            handled += 1;
            changed = true;
            if self.handle_event(event) {
                break;
            }
        }
        changed
    }

    /// Block for up to `timeout` for the next scan event, then drain
    /// whatever else is queued.
    ///
    /// Returns `true` if anything changed.
    pub fn wait_for_event(&mut self, timeout: Duration) -> bool {
        if self.scan_handle.is_none() {
            return false;
        }
        match self.scanner.recv_timeout(timeout) {
            Some(event) => {
                if !self.handle_event(event) {
                    self.process_scan_messages();
                }
                true
            }
            None => {
                if self.scanner.is_scanning() {
                    return false;
                }
                // The thread sends Finished before it exits, so drain first.
                let changed = self.process_scan_messages();
                if self.phase == AppPhase::Scanning {
                    // Thread gone without a Finished event; don't spin forever.
                    warn!("Scan thread exited without reporting a result");
                    self.phase = AppPhase::Results;
                    self.scan_handle = None;
                    self.status = String::from("Scan ended unexpectedly");
                    return true;
                }
                changed
            }
        }
    }

    /// Apply one event. Returns `true` once the scan has finished.
    fn handle_event(&mut self, event: ScanEvent) -> bool {
        match event {
            ScanEvent::Status { message, phase, .. } => {
                debug!("Scan status ({phase:?}): {message}");
                self.status = message;
                false
            }
            ScanEvent::Listed { tasks, .. } => {
                self.scan_total = tasks.len();
                self.table = FolderTable::from_tasks(tasks);
                self.table.set_sort_order(self.sort_order);
                false
            }
            ScanEvent::Results {
                batch,
                delivered,
                total,
                ..
            } => {
                let accepted = self.table.apply_batch(&batch);
                if accepted < batch.len() {
                    warn!(
                        "Ignored {} result(s) with no matching row",
                        batch.len() - accepted
                    );
                }
                self.scan_delivered = delivered;
                self.scan_total = total;
                false
            }
            ScanEvent::Finished { summary, .. } => {
                info!("{} in {:.2?}", summary.message(), summary.duration);
                self.status = summary.message();
                self.phase = if summary.phase == ScanPhase::ListingFailed {
                    AppPhase::Idle
                } else {
                    AppPhase::Results
                };
                self.summary = Some(summary);
                self.scan_handle = None;
                true
            }
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
        self.table.set_sort_order(order);
    }

    pub fn toggle_sort(&mut self) -> SortOrder {
        self.set_sort_order(self.sort_order.toggled());
        self.sort_order
    }

    /// Select folders smaller than the default 20 MB threshold.
    pub fn select_small_folders(&mut self) -> usize {
        self.select_smaller_than(DEFAULT_SMALL_FOLDER_THRESHOLD)
    }

    pub fn select_smaller_than(&mut self, threshold: u64) -> usize {
        self.table.select_smaller_than(threshold)
    }

    pub fn select_all(&mut self) -> usize {
        self.table.select_all();
        self.table.selected_count()
    }

    pub fn deselect_all(&mut self) {
        self.table.deselect_all();
    }

    /// Recursively delete every selected folder.
    ///
    /// Refuses while a scan is running: results could still land on rows
    /// that are about to vanish.
    pub fn delete_selected(&mut self) -> DeleteReport {
        if self.is_scanning() {
            warn!("Delete requested while scanning; ignored");
            return DeleteReport::default();
        }
        let paths = self.table.selected_paths();
        let report = delete_folders(&paths);
        self.status = report.message();
        report
    }

    pub fn root(&self) -> Option<&Path> {
        self.scan_root.as_deref()
    }
}
