/// Subfolder size probe: measures one directory subtree.
///
/// Two tiers, mirroring the scanner's "fast path first, walk on failure"
/// strategy:
/// - **Tier 1 (listing command):** the platform `dir /s` summary, with a
///   hard timeout. Windows only; see [`crate::platform::dir_command`].
/// - **Tier 2 (manual walk):** list the folder, add up regular files, and
///   walk each child directory with `jwalk`. Entries that cannot be read
///   contribute zero instead of failing the folder.
///
/// Only a failure to list the folder itself yields a degenerate result.
use crate::config::ProbeConfig;
use crate::model::SizeStatus;
use crate::platform::dir_command_total;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// What a probe found for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub size: u64,
    pub status: SizeStatus,
}

impl ProbeOutcome {
    pub fn ok(size: u64) -> Self {
        Self {
            size,
            status: SizeStatus::Ok,
        }
    }

    pub fn failed(status: SizeStatus) -> Self {
        Self { size: 0, status }
    }
}

/// Computes the total byte size of one directory subtree.
///
/// Implementations are shared across pool workers and must not hold
/// mutable state that two concurrent probes could observe.
pub trait SizeProbe: Send + Sync {
    fn probe(&self, path: &Path) -> ProbeOutcome;
}

impl<F> SizeProbe for F
where
    F: Fn(&Path) -> ProbeOutcome + Send + Sync,
{
    fn probe(&self, path: &Path) -> ProbeOutcome {
        self(path)
    }
}

/// The production probe: listing command first (if enabled), then walk.
#[derive(Debug, Clone, Default)]
pub struct DirSizeProbe {
    config: ProbeConfig,
}

impl DirSizeProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

impl SizeProbe for DirSizeProbe {
    fn probe(&self, path: &Path) -> ProbeOutcome {
        if self.config.use_dir_command {
            if let Some(total) = dir_command_total(path, self.config.command_timeout) {
                return ProbeOutcome::ok(total);
            }
            debug!(
                "Listing command gave no total for {}; walking instead",
                path.display()
            );
        }
        walk_size(path)
    }
}

/// Tier 2: measure `path` by walking it.
pub fn walk_size(path: &Path) -> ProbeOutcome {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            let status = if err.kind() == ErrorKind::PermissionDenied {
                SizeStatus::Unreadable
            } else {
                SizeStatus::Error
            };
            warn!("Cannot read {}: {err}", path.display());
            return ProbeOutcome::failed(status);
        }
    };

    let mut total: u64 = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            if let Ok(meta) = entry.metadata() {
                total = total.saturating_add(meta.len());
            }
        } else if file_type.is_dir() {
            total = total.saturating_add(subtree_bytes(&entry.path()));
        }
        // Symlinks and special files contribute nothing.
    }
    ProbeOutcome::ok(total)
}

/// Sum of regular-file bytes under `dir`, skipping anything unreadable.
///
/// Serial on purpose: the probe already runs on one of several pool
/// workers, so nesting another thread pool per folder would only add
/// contention.
fn subtree_bytes(dir: &Path) -> u64 {
    jwalk::WalkDir::new(dir)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold(0u64, |acc, meta| acc.saturating_add(meta.len()))
}
