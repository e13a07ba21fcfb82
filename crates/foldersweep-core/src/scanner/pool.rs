/// Bounded worker pool that runs one size probe per subfolder.
///
/// Probes execute on a dedicated rayon pool of `max_workers` threads, so
/// the blocking filesystem and subprocess work never touches the scan
/// thread or the UI. Each worker sends its [`SizeResult`] down a channel;
/// [`PoolResults`] turns that channel into a lazy iterator that enforces
/// the overall deadline and honours cancellation.
///
/// # Completeness
///
/// Every submitted index is yielded exactly once:
/// - normal completion yields the probe's result;
/// - a panicking probe yields `Error`;
/// - cancellation or deadline expiry yields `Cancelled` for every index
///   still outstanding, after first draining results already queued.
use crate::error::Result;
use crate::model::{SizeResult, SizeStatus, SubfolderTask};
use crate::scanner::cancel::CancelToken;
use crate::scanner::probe::SizeProbe;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a pool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOutcome {
    /// Results are still being yielded.
    Running,
    /// Every task produced its own result.
    Completed,
    /// The cancel token fired; outstanding tasks were reported `Cancelled`.
    Cancelled,
    /// The overall deadline elapsed; outstanding tasks were reported `Cancelled`.
    TimedOut,
}

pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
    max_workers: usize,
    poll_interval: Duration,
}

impl WorkerPool {
    /// Build a pool with `max_workers` probe threads (at least one).
    pub fn new(max_workers: usize) -> Result<Self> {
        let max_workers = max_workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("foldersweep-probe-{i}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
            max_workers,
            poll_interval: crate::config::DEFAULT_POLL_INTERVAL,
        })
    }

    /// How often the collector wakes to check the cancel flag.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Submit every task and return the lazily-filled result stream.
    ///
    /// `deadline` is measured from this call.
    pub fn run(
        &self,
        tasks: &[SubfolderTask],
        probe: Arc<dyn SizeProbe>,
        cancel: &CancelToken,
        deadline: Duration,
    ) -> PoolResults {
        let (tx, rx) = crossbeam_channel::unbounded::<SizeResult>();

        for task in tasks {
            let tx = tx.clone();
            let probe = Arc::clone(&probe);
            let cancel = cancel.clone();
            let task = task.clone();
            self.pool.spawn(move || {
                let result = run_task(&task, probe.as_ref(), &cancel);
                // The collector may already have given up on us.
                let _ = tx.send(result);
            });
        }
        drop(tx);

        debug!(
            "Submitted {} tasks to {} workers (deadline {:?})",
            tasks.len(),
            self.max_workers,
            deadline
        );

        PoolResults {
            rx,
            pending: tasks.iter().map(|t| t.index).collect(),
            // A deadline too far out to represent is no deadline at all.
            deadline: Instant::now().checked_add(deadline),
            cancel: cancel.clone(),
            poll_interval: self.poll_interval,
            outcome: PoolOutcome::Running,
            _pool: Arc::clone(&self.pool),
        }
    }
}

/// Run one probe, honouring a cancellation that arrived before it started.
fn run_task(task: &SubfolderTask, probe: &dyn SizeProbe, cancel: &CancelToken) -> SizeResult {
    if cancel.is_cancelled() {
        return SizeResult::cancelled(task.index);
    }

    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| probe.probe(&task.path))) {
        Ok(outcome) => {
            debug!(
                "Probed {} in {:?}: {} bytes ({:?})",
                task.path.display(),
                started.elapsed(),
                outcome.size,
                outcome.status
            );
            if outcome.status == SizeStatus::Ok {
                SizeResult::ok(task.index, outcome.size)
            } else {
                SizeResult::degenerate(task.index, outcome.status)
            }
        }
        Err(_) => {
            warn!("Size probe panicked on {}", task.path.display());
            SizeResult::degenerate(task.index, SizeStatus::Error)
        }
    }
}

/// Lazy stream of results from one [`WorkerPool::run`].
///
/// Dropping it early never blocks; workers finish their current probe
/// and their results are discarded.
pub struct PoolResults {
    rx: Receiver<SizeResult>,
    pending: BTreeSet<usize>,
    deadline: Option<Instant>,
    cancel: CancelToken,
    poll_interval: Duration,
    outcome: PoolOutcome,
    /// Keeps the worker threads alive for as long as results are wanted.
    _pool: Arc<rayon::ThreadPool>,
}

impl PoolResults {
    pub fn outcome(&self) -> PoolOutcome {
        self.outcome
    }

    /// Number of indices not yet yielded.
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    fn accept(&mut self, result: SizeResult) -> Option<SizeResult> {
        if self.pending.remove(&result.index) {
            Some(result)
        } else {
            debug!("Dropping duplicate result for index {}", result.index);
            None
        }
    }

    fn stop(&mut self, outcome: PoolOutcome) {
        self.outcome = outcome;
        self.cancel.cancel();
    }
}

impl Iterator for PoolResults {
    type Item = SizeResult;

    fn next(&mut self) -> Option<SizeResult> {
        loop {
            if self.pending.is_empty() {
                if self.outcome == PoolOutcome::Running {
                    self.outcome = PoolOutcome::Completed;
                }
                return None;
            }

            if self.outcome != PoolOutcome::Running {
                // Stopped: hand out whatever already finished, then
                // synthesise `Cancelled` for the rest.
                if let Ok(result) = self.rx.try_recv() {
                    if let Some(result) = self.accept(result) {
                        return Some(result);
                    }
                    continue;
                }
                let index = self.pending.pop_first()?;
                return Some(SizeResult::cancelled(index));
            }

            if self.cancel.is_cancelled() {
                info!(
                    "Cancellation requested with {} tasks outstanding",
                    self.pending.len()
                );
                self.stop(PoolOutcome::Cancelled);
                continue;
            }

            let now = Instant::now();
            let wait = match self.deadline {
                Some(deadline) if now >= deadline => {
                    warn!(
                        "Scan deadline elapsed with {} tasks outstanding",
                        self.pending.len()
                    );
                    self.stop(PoolOutcome::TimedOut);
                    continue;
                }
                Some(deadline) => (deadline - now).min(self.poll_interval),
                None => self.poll_interval,
            };
            match self.rx.recv_timeout(wait) {
                Ok(result) => {
                    if let Some(result) = self.accept(result) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Every worker is gone yet indices are missing: a job
                    // was lost. Report each one rather than drop it.
                    let index = self.pending.pop_first()?;
                    warn!("No result was produced for index {index}");
                    return Some(SizeResult::degenerate(index, SizeStatus::Error));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::probe::ProbeOutcome;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tasks(n: usize) -> Vec<SubfolderTask> {
        (0..n)
            .map(|i| SubfolderTask::new(i, PathBuf::from(format!("/scan/d{i}"))))
            .collect()
    }

    fn sleeping_sizer(ms: u64) -> Arc<dyn SizeProbe> {
        Arc::new(move |_: &Path| {
            std::thread::sleep(Duration::from_millis(ms));
            ProbeOutcome::ok(ms)
        })
    }

    fn indices(results: &[SizeResult]) -> HashSet<usize> {
        results.iter().map(|r| r.index).collect()
    }

    #[test]
    fn test_every_index_yielded_once() {
        let pool = WorkerPool::new(4).unwrap();
        let probe: Arc<dyn SizeProbe> =
            Arc::new(|p: &Path| ProbeOutcome::ok(p.as_os_str().len() as u64));
        let cancel = CancelToken::new();
        let mut results = pool.run(&tasks(25), probe, &cancel, Duration::from_secs(30));
        let collected: Vec<SizeResult> = results.by_ref().collect();

        assert_eq!(collected.len(), 25);
        assert_eq!(indices(&collected), (0..25).collect());
        assert!(collected.iter().all(|r| r.is_ok()));
        assert_eq!(results.outcome(), PoolOutcome::Completed);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_worker_cap_is_honoured() {
        // 5 one-second tasks on 2 workers run in 3 waves.
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let start = Instant::now();
        let collected: Vec<SizeResult> = pool
            .run(&tasks(5), sleeping_sizer(1_000), &cancel, Duration::from_secs(30))
            .collect();
        let elapsed = start.elapsed();

        assert_eq!(collected.len(), 5);
        assert!(
            elapsed >= Duration::from_millis(2_900),
            "finished too fast for a cap of 2: {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_millis(4_500),
            "finished too slow for 2 parallel workers: {elapsed:?}"
        );
    }

    #[test]
    fn test_precancelled_tasks_never_probe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_probe = Arc::clone(&calls);
        let probe: Arc<dyn SizeProbe> = Arc::new(move |_: &Path| {
            calls_in_probe.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::ok(1)
        });
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut results = pool.run(&tasks(6), probe, &cancel, Duration::from_secs(30));
        let collected: Vec<SizeResult> = results.by_ref().collect();

        assert_eq!(indices(&collected), (0..6).collect());
        assert!(collected.iter().all(|r| r.status == SizeStatus::Cancelled));
        assert_eq!(results.outcome(), PoolOutcome::Cancelled);
        // Give stragglers a moment; none of them may touch the probe.
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_mid_run_reports_rest_as_cancelled() {
        let pool = WorkerPool::new(1).unwrap();
        let cancel = CancelToken::new();
        let mut results = pool.run(&tasks(4), sleeping_sizer(300), &cancel, Duration::from_secs(30));

        let first = results.next().unwrap();
        assert!(first.is_ok());
        cancel.cancel();
        let rest: Vec<SizeResult> = results.by_ref().collect();

        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|r| r.status == SizeStatus::Cancelled && r.size == 0));
        assert!(!rest.iter().any(|r| r.index == first.index));
        assert_eq!(results.outcome(), PoolOutcome::Cancelled);
    }

    #[test]
    fn test_deadline_times_out_outstanding_tasks() {
        let pool = WorkerPool::new(1).unwrap();
        let cancel = CancelToken::new();
        let start = Instant::now();
        let mut results =
            pool.run(&tasks(3), sleeping_sizer(400), &cancel, Duration::from_millis(600));
        let collected: Vec<SizeResult> = results.by_ref().collect();

        assert_eq!(collected.len(), 3);
        assert_eq!(collected.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            collected
                .iter()
                .filter(|r| r.status == SizeStatus::Cancelled)
                .count(),
            2
        );
        assert_eq!(results.outcome(), PoolOutcome::TimedOut);
        assert!(cancel.is_cancelled(), "deadline must cancel the remaining work");
        assert!(start.elapsed() < Duration::from_millis(1_100));
    }

    #[test]
    fn test_panicking_probe_maps_to_error() {
        let probe: Arc<dyn SizeProbe> = Arc::new(|p: &Path| {
            if p.ends_with("d1") {
                panic!("probe exploded");
            }
            ProbeOutcome::ok(7)
        });
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let mut collected: Vec<SizeResult> = pool
            .run(&tasks(3), probe, &cancel, Duration::from_secs(30))
            .collect();
        collected.sort_by_key(|r| r.index);

        assert_eq!(collected[0], SizeResult::ok(0, 7));
        assert_eq!(collected[1], SizeResult::degenerate(1, SizeStatus::Error));
        assert_eq!(collected[2], SizeResult::ok(2, 7));
    }

    #[test]
    fn test_degenerate_probe_outcome_zeroes_size() {
        let probe: Arc<dyn SizeProbe> = Arc::new(|_: &Path| ProbeOutcome {
            size: 99,
            status: SizeStatus::Unreadable,
        });
        let pool = WorkerPool::new(1).unwrap();
        let collected: Vec<SizeResult> = pool
            .run(&tasks(1), probe, &CancelToken::new(), Duration::from_secs(30))
            .collect();
        assert_eq!(collected, vec![SizeResult::degenerate(0, SizeStatus::Unreadable)]);
    }

    #[test]
    fn test_unrepresentable_deadline_means_no_deadline() {
        let pool = WorkerPool::new(2).unwrap();
        let mut results = pool.run(
            &tasks(3),
            sleeping_sizer(20),
            &CancelToken::new(),
            Duration::MAX,
        );
        let collected: Vec<SizeResult> = results.by_ref().collect();

        assert_eq!(indices(&collected), (0..3).collect());
        assert!(collected.iter().all(|r| r.is_ok()));
        assert_eq!(results.outcome(), PoolOutcome::Completed);
    }

    #[test]
    fn test_empty_task_list_completes() {
        let pool = WorkerPool::new(1).unwrap();
        let mut results = pool.run(&[], sleeping_sizer(1), &CancelToken::new(), Duration::from_secs(1));
        assert_eq!(results.next(), None);
        assert_eq!(results.outcome(), PoolOutcome::Completed);
    }
}
