use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative, scan-wide cancellation flag.
///
/// Clones share the flag. Workers poll it at task start; the collector
/// polls it while waiting for results. Nothing is ever interrupted
/// mid-probe.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns immediately.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
