/// Scanner module: orchestrates one subfolder-size scan at a time.
///
/// A scan runs on its own background thread:
/// 1. **Listing:** enumerate the root's immediate subfolders (no recursion).
/// 2. **Probing:** hand one task per subfolder to the [`pool::WorkerPool`],
///    batch results through the [`aggregator::ResultAggregator`], and send
///    them to the frontend.
/// 3. **Finish:** report `Completed`, `Cancelled`, `TimedOut` or
///    `ListingFailed` with `measured/total` counts.
///
/// All events flow through one channel owned by the [`Scanner`]. Each
/// event is tagged with its scan generation; starting a new scan bumps the
/// generation, and the scanner drops events from older generations on
/// arrival, so a superseded scan can never leak into the current view.
pub mod aggregator;
pub mod cancel;
pub mod pool;
pub mod probe;
pub mod progress;

pub use cancel::CancelToken;
pub use progress::{ScanEvent, ScanPhase, ScanSummary};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::model::{ScanRequest, SizeResult, SizeStatus, SubfolderTask};
use aggregator::ResultAggregator;
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use pool::{PoolOutcome, WorkerPool};
use probe::{DirSizeProbe, SizeProbe};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Handle to a running or finished scan.
///
/// Cheap to clone. Cancelling is cooperative and returns immediately.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    generation: u64,
    root: PathBuf,
    cancel: CancelToken,
    /// Disconnects when the scan thread exits.
    done_rx: Receiver<()>,
}

impl ScanHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the scan thread has exited.
    pub fn is_finished(&self) -> bool {
        matches!(self.done_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block up to `timeout` for the scan thread to exit.
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(
            self.done_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Coordinates scans: owns the generation counter, the event channel,
/// and the record of the one active scan.
pub struct Scanner {
    config: ScanConfig,
    probe: Arc<dyn SizeProbe>,
    generation: AtomicU64,
    active: Mutex<Option<ScanHandle>>,
    events_tx: Sender<ScanEvent>,
    events_rx: Receiver<ScanEvent>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl Scanner {
    /// Scanner using the standard two-tier [`DirSizeProbe`].
    pub fn new(config: ScanConfig) -> Self {
        let probe = Arc::new(DirSizeProbe::new(config.probe.clone()));
        Self::with_probe(config, probe)
    }

    /// Scanner with a custom probe.
    pub fn with_probe(config: ScanConfig, probe: Arc<dyn SizeProbe>) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            probe,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Generation of the most recently started scan (0 before the first).
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start scanning the immediate subfolders of `root`.
    ///
    /// Fails synchronously if `root` is missing or not a directory. Any
    /// scan already running is cancelled first; we wait briefly for its
    /// thread, but its stale events are filtered out regardless.
    pub fn start_scan(&self, root: impl Into<PathBuf>) -> Result<ScanHandle> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ScanError::NotADirectory(root)),
            Err(_) => return Err(ScanError::InvalidPath(root)),
        }

        let pool = WorkerPool::new(self.config.max_workers)?
            .with_poll_interval(self.config.poll_interval);

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
            if previous.wait(self.config.teardown_wait) {
                debug!("Scan {} wound down", previous.generation);
            } else {
                debug!(
                    "Scan {} still winding down; its events will be discarded",
                    previous.generation
                );
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let job = ScanJob {
            request: ScanRequest {
                root: root.clone(),
                generation,
            },
            cancel: cancel.clone(),
            events: EventSink {
                generation,
                tx: self.events_tx.clone(),
            },
            probe: Arc::clone(&self.probe),
            config: self.config.clone(),
            pool,
        };

        thread::Builder::new()
            .name(format!("foldersweep-scan-{generation}"))
            .spawn(move || {
                let _done = done_tx;
                job.run();
            })
            .map_err(|source| ScanError::Spawn {
                what: "scan thread",
                source,
            })?;

        let handle = ScanHandle {
            generation,
            root,
            cancel,
            done_rx,
        };
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Request cooperative cancellation of `handle`'s scan.
    pub fn cancel_scan(&self, handle: &ScanHandle) {
        handle.cancel();
    }

    /// Cancel whatever scan is active, if any.
    pub fn cancel_active(&self) {
        if let Some(handle) = self.active.lock().as_ref() {
            handle.cancel();
        }
    }

    /// Whether the most recent scan's thread is still running.
    pub fn is_scanning(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Next event from the current scan, without blocking.
    pub fn try_recv(&self) -> Option<ScanEvent> {
        loop {
            let event = self.events_rx.try_recv().ok()?;
            if self.is_current(&event) {
                return Some(event);
            }
        }
    }

    /// Next event from the current scan, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ScanEvent> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let event = match deadline {
                Some(deadline) => self.events_rx.recv_deadline(deadline).ok()?,
                None => self.events_rx.recv().ok()?,
            };
            if self.is_current(&event) {
                return Some(event);
            }
        }
    }

    fn is_current(&self, event: &ScanEvent) -> bool {
        let current = self.current_generation();
        if event.generation() == current {
            true
        } else {
            debug!(
                "Dropping event from superseded scan {} (current {current})",
                event.generation()
            );
            false
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// Enumerate the immediate subfolders of `root` as tasks, in listing order.
///
/// Symlinks are not followed. Individual entries that cannot be read are
/// skipped; only a failure to open `root` itself is an error.
pub fn list_subfolders(root: &Path) -> io::Result<Vec<SubfolderTask>> {
    let mut tasks = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!("Skipping unreadable entry in {}: {err}", root.display());
                continue;
            }
        };
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            tasks.push(SubfolderTask::new(tasks.len(), entry.path()));
        }
    }
    Ok(tasks)
}

/// Sends events tagged with one scan's generation.
struct EventSink {
    generation: u64,
    tx: Sender<ScanEvent>,
}

impl EventSink {
    fn send(&self, event: ScanEvent) {
        // The scanner (and its receiver) may already be gone.
        let _ = self.tx.send(event);
    }

    fn status(&self, phase: ScanPhase, message: impl Into<String>) {
        self.send(ScanEvent::Status {
            generation: self.generation,
            phase,
            message: message.into(),
        });
    }
}

/// Everything the scan thread needs, moved onto it at spawn.
struct ScanJob {
    request: ScanRequest,
    cancel: CancelToken,
    events: EventSink,
    probe: Arc<dyn SizeProbe>,
    config: ScanConfig,
    pool: WorkerPool,
}

/// Per-scan bookkeeping, owned by the scan thread alone.
struct ScanState {
    tasks: Vec<SubfolderTask>,
    measured: usize,
    started: Instant,
    started_at: DateTime<Local>,
}

impl ScanState {
    fn summary(&self, phase: ScanPhase) -> ScanSummary {
        ScanSummary {
            phase,
            completed: self.measured,
            total: self.tasks.len(),
            duration: self.started.elapsed(),
            started_at: self.started_at,
            nothing_found: phase == ScanPhase::Completed && self.tasks.is_empty(),
            error: None,
        }
    }
}

impl ScanJob {
    fn run(self) {
        let root = &self.request.root;
        let generation = self.request.generation;
        info!("Starting scan {generation} of {}", root.display());

        let mut state = ScanState {
            tasks: Vec::new(),
            measured: 0,
            started: Instant::now(),
            started_at: Local::now(),
        };

        self.events.status(ScanPhase::Listing, "Listing subfolders...");
        state.tasks = match list_subfolders(root) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!("Cannot list {}: {err}", root.display());
                let mut summary = state.summary(ScanPhase::ListingFailed);
                summary.error = Some(
                    ScanError::ListingFailed {
                        path: root.clone(),
                        source: err,
                    }
                    .to_string(),
                );
                self.finish(summary);
                return;
            }
        };

        let total = state.tasks.len();
        if total == 0 {
            info!("Scan {generation}: no subfolders in {}", root.display());
            self.finish(state.summary(ScanPhase::Completed));
            return;
        }

        self.events.send(ScanEvent::Listed {
            generation,
            tasks: state.tasks.clone(),
        });
        self.events.status(
            ScanPhase::Probing,
            format!("Found {total} subfolders, measuring sizes..."),
        );

        let deadline = self.config.deadline_for(total);
        let mut aggregator = ResultAggregator::new(total);
        let mut results = self.pool.run(
            &state.tasks,
            Arc::clone(&self.probe),
            &self.cancel,
            deadline,
        );

        for result in results.by_ref() {
            if result.status != SizeStatus::Cancelled {
                state.measured += 1;
            }
            if let Some(batch) = aggregator.push(result) {
                self.send_batch(batch, &aggregator);
                self.events.status(
                    ScanPhase::Probing,
                    format!("Scanned {}/{total} folders", aggregator.completed()),
                );
            }
        }

        let rest = aggregator.finish();
        if !rest.is_empty() {
            self.send_batch(rest, &aggregator);
        }

        let phase = match results.outcome() {
            PoolOutcome::Cancelled => ScanPhase::Cancelled,
            PoolOutcome::TimedOut => ScanPhase::TimedOut,
            PoolOutcome::Completed | PoolOutcome::Running => ScanPhase::Completed,
        };
        self.finish(state.summary(phase));
    }

    fn send_batch(&self, batch: Vec<SizeResult>, aggregator: &ResultAggregator) {
        self.events.send(ScanEvent::Results {
            generation: self.request.generation,
            batch,
            delivered: aggregator.completed(),
            total: aggregator.total(),
        });
    }

    fn finish(&self, summary: ScanSummary) {
        info!(
            "Scan {} finished: {:?}, {}/{} measured in {:?}",
            self.request.generation,
            summary.phase,
            summary.completed,
            summary.total,
            summary.duration
        );
        self.events.status(summary.phase, summary.message());
        self.events.send(ScanEvent::Finished {
            generation: self.request.generation,
            summary,
        });
    }
}
