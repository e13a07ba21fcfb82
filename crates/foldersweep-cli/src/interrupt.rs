/// Ctrl-C handling.
///
/// While a scan runs, the first Ctrl-C only asks for cancellation so the
/// pool can report outstanding folders as `Cancelled` and the partial
/// table still prints. A second Ctrl-C, or one outside a scan, exits.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Exit status for a process stopped by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Default)]
pub struct Interrupt {
    /// A scan is running and wants Ctrl-C turned into a cancel.
    armed: AtomicBool,
    requested: AtomicBool,
}

impl Interrupt {
    /// A flag with no signal handler behind it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide Ctrl-C handler.
    ///
    /// If a handler cannot be installed, Ctrl-C keeps its default
    /// behaviour and the returned flag is simply never set.
    pub fn install() -> Arc<Self> {
        let interrupt = Arc::new(Self::new());
        let handler = Arc::clone(&interrupt);
        if let Err(err) = ctrlc::set_handler(move || {
            if !handler.request() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            eprintln!("\nInterrupt received, cancelling scan (Ctrl-C again to quit)...");
        }) {
            warn!("Failed to set Ctrl-C handler: {err}");
        }
        interrupt
    }

    /// Record a Ctrl-C. Returns `false` when nothing is armed to absorb it
    /// or it was already requested, i.e. the caller should quit.
    pub fn request(&self) -> bool {
        self.armed.load(Ordering::SeqCst) && !self.requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Start absorbing Ctrl-C for a new scan.
    pub fn arm(&self) {
        self.requested.store(false, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}
