/// Scan tunables.
///
/// Every knob has a default matching the behaviour users expect from a
/// single click on "Scan"; frontends override only what they expose.
use std::time::Duration;

/// Upper bound on probe worker threads regardless of core count.
///
/// Size probing is I/O-bound; past a small multiple of the core count
/// extra threads only add handle pressure on pathological trees.
pub const MAX_WORKER_CAP: usize = 8;

/// Floor for the overall scan deadline.
pub const MIN_DEADLINE: Duration = Duration::from_secs(60);

/// Every this-many subfolders buy one extra second of overall deadline.
pub const TASKS_PER_DEADLINE_SECOND: usize = 10;

/// Hard timeout for the platform directory-listing command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `start_scan` waits for a superseded scan thread to exit.
pub const DEFAULT_TEARDOWN_WAIT: Duration = Duration::from_millis(500);

/// How often the collector re-checks the cancel flag while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default worker count: `min(8, 2 × logical CPUs)`.
pub fn default_max_workers() -> usize {
    (num_cpus::get().max(1) * 2).min(MAX_WORKER_CAP)
}

/// Overall deadline for a scan of `total_tasks` subfolders.
///
/// `max(60 s, total / 10 s)` so huge roots get proportionally more time.
pub fn deadline_for(total_tasks: usize) -> Duration {
    let scaled = Duration::from_secs((total_tasks / TASKS_PER_DEADLINE_SECOND) as u64);
    scaled.max(MIN_DEADLINE)
}

/// Configuration for [`crate::scanner::probe::DirSizeProbe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Try the platform listing command before walking manually.
    ///
    /// Only Windows has a command whose output we parse; elsewhere the
    /// walk is both the fast and the only path.
    pub use_dir_command: bool,
    /// Kill the listing command after this long and fall back to walking.
    pub command_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            use_dir_command: cfg!(windows),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Configuration for one [`crate::scanner::Scanner`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_workers: usize,
    /// Fixed overall deadline. `None` derives it from the task count.
    pub deadline: Option<Duration>,
    pub probe: ProbeConfig,
    pub teardown_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            deadline: None,
            probe: ProbeConfig::default(),
            teardown_wait: DEFAULT_TEARDOWN_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ScanConfig {
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_teardown_wait(mut self, wait: Duration) -> Self {
        self.teardown_wait = wait;
        self
    }

    /// Effective deadline for `total_tasks` subfolders.
    pub fn deadline_for(&self, total_tasks: usize) -> Duration {
        self.deadline.unwrap_or_else(|| deadline_for(total_tasks))
    }
}
