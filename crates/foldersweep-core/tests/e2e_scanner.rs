/// End-to-end scanner integration tests.
///
/// These run the real `Scanner` (scan thread, rayon worker pool, batching
/// and generation filtering) against temporary directory trees, and read
/// everything back through the event channel exactly as a frontend would.
use foldersweep_core::scanner::probe::{walk_size, ProbeOutcome, SizeProbe};
use foldersweep_core::{
    ScanConfig, ScanError, ScanEvent, ScanPhase, ScanSummary, Scanner, SizeResult, SizeStatus,
    SubfolderTask,
};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

/// Everything one scan reported, in arrival order.
#[derive(Default)]
struct Collected {
    tasks: Vec<SubfolderTask>,
    results: Vec<SizeResult>,
    generations: Vec<u64>,
    summary: Option<ScanSummary>,
}

impl Collected {
    fn by_name(&self) -> HashMap<String, SizeResult> {
        self.results
            .iter()
            .map(|r| (self.tasks[r.index].name.to_string(), *r))
            .collect()
    }

    fn summary(&self) -> &ScanSummary {
        self.summary.as_ref().expect("scan never finished")
    }
}

/// Pull events until `Finished`, panicking after a generous timeout.
fn drain_to_finish(scanner: &Scanner) -> Collected {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut out = Collected::default();
    loop {
        assert!(
            Instant::now() < deadline,
            "scan did not finish within 30 seconds"
        );
        let Some(event) = scanner.recv_timeout(Duration::from_millis(50)) else {
            continue;
        };
        out.generations.push(event.generation());
        match event {
            ScanEvent::Listed { tasks, .. } => out.tasks = tasks,
            ScanEvent::Results { batch, .. } => out.results.extend(batch),
            ScanEvent::Status { .. } => {}
            ScanEvent::Finished { summary, .. } => {
                out.summary = Some(summary);
                return out;
            }
        }
    }
}

fn slow_walk_sizer(delay: Duration) -> Arc<dyn SizeProbe> {
    Arc::new(move |path: &Path| -> ProbeOutcome {
        std::thread::sleep(delay);
        walk_size(path)
    })
}

fn assert_complete_index_set(c: &Collected, n: usize) {
    assert_eq!(c.results.len(), n, "exactly one result per subfolder");
    let mut seen = vec![false; n];
    for r in &c.results {
        assert!(!seen[r.index], "index {} delivered twice", r.index);
        seen[r.index] = true;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn scan_delivers_every_index_exactly_once() {
    let tmp = TempDir::new().unwrap();
    for i in 0..23 {
        let dir = tmp.path().join(format!("dir{i:02}"));
        fs::create_dir(&dir).unwrap();
        write_bytes(&dir.join("data.bin"), 100 * (i + 1));
    }
    write_bytes(&tmp.path().join("loose-file.bin"), 9_999);

    let scanner = Scanner::default();
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    assert_complete_index_set(&c, 23);
    for (name, result) in c.by_name() {
        let i: usize = name.trim_start_matches("dir").parse().unwrap();
        assert_eq!(result, SizeResult::ok(result.index, 100 * (i as u64 + 1)));
    }
    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::Completed);
    assert_eq!((summary.completed, summary.total), (23, 23));
    assert!(!summary.nothing_found);
}

#[test]
fn scan_mixed_sizes_empty_and_unreadable() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("A");
    let b = tmp.path().join("B");
    let c_dir = tmp.path().join("C");
    fs::create_dir_all(a.join("inner")).unwrap();
    fs::create_dir(&b).unwrap();
    fs::create_dir(&c_dir).unwrap();
    write_bytes(&c_dir.join("secret.bin"), 1_000);

    // 10 files, 25 MiB in total, some one level down.
    let chunk = 25 * 1024 * 1024 / 10;
    for i in 0..10 {
        let parent = if i % 2 == 0 { a.clone() } else { a.join("inner") };
        write_bytes(&parent.join(format!("f{i}.bin")), chunk);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&c_dir, fs::Permissions::from_mode(0o000)).unwrap();
    }
    // Privileged users can still read a 000 directory.
    let c_readable = fs::read_dir(&c_dir).is_ok();

    let scanner = Scanner::default();
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&c_dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    assert_complete_index_set(&c, 3);
    let by_name = c.by_name();
    assert_eq!(by_name["A"].status, SizeStatus::Ok);
    assert_eq!(by_name["A"].size, (chunk * 10) as u64);
    assert_eq!(by_name["B"].status, SizeStatus::Ok);
    assert_eq!(by_name["B"].size, 0);
    if c_readable {
        assert_eq!(by_name["C"], SizeResult::ok(by_name["C"].index, 1_000));
    } else {
        assert_eq!(by_name["C"].status, SizeStatus::Unreadable);
        assert_eq!(by_name["C"].size, 0);
    }

    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::Completed);
    assert_eq!((summary.completed, summary.total), (3, 3));
}

#[test]
fn degenerate_results_reach_the_consumer() {
    // Permissions cannot be relied on when tests run as root, so the
    // unreadable and failing folders are simulated by the sizer.
    let tmp = TempDir::new().unwrap();
    for name in ["A", "B", "C", "D"] {
        let dir = tmp.path().join(name);
        fs::create_dir(&dir).unwrap();
        write_bytes(&dir.join("data.bin"), 500);
    }
    let sizer: Arc<dyn SizeProbe> = Arc::new(|path: &Path| -> ProbeOutcome {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("C") => ProbeOutcome::failed(SizeStatus::Unreadable),
            Some("D") => ProbeOutcome::failed(SizeStatus::Error),
            _ => walk_size(path),
        }
    });

    let scanner = Scanner::with_probe(ScanConfig::default(), sizer);
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    assert_complete_index_set(&c, 4);
    let by_name = c.by_name();
    assert_eq!(by_name["A"], SizeResult::ok(by_name["A"].index, 500));
    assert_eq!(by_name["B"], SizeResult::ok(by_name["B"].index, 500));
    assert_eq!(
        by_name["C"],
        SizeResult::degenerate(by_name["C"].index, SizeStatus::Unreadable)
    );
    assert_eq!(
        by_name["D"],
        SizeResult::degenerate(by_name["D"].index, SizeStatus::Error)
    );

    // Degenerate folders still count as measured.
    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::Completed);
    assert_eq!((summary.completed, summary.total), (4, 4));
}

#[test]
fn huge_deadline_behaves_as_no_deadline() {
    let tmp = TempDir::new().unwrap();
    for i in 0..3 {
        let dir = tmp.path().join(format!("d{i}"));
        fs::create_dir(&dir).unwrap();
        write_bytes(&dir.join("data.bin"), 10);
    }

    let config = ScanConfig::default().with_deadline(Duration::MAX);
    let scanner = Scanner::with_probe(config, slow_walk_sizer(Duration::from_millis(10)));
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    assert_complete_index_set(&c, 3);
    assert!(c.results.iter().all(|r| r.is_ok()));
    assert_eq!(c.summary().phase, ScanPhase::Completed);
}

#[test]
fn scan_without_subfolders_reports_nothing_found() {
    let tmp = TempDir::new().unwrap();
    write_bytes(&tmp.path().join("only-a-file.txt"), 10);

    let scanner = Scanner::default();
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    assert!(c.tasks.is_empty());
    assert!(c.results.is_empty());
    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::Completed);
    assert!(summary.nothing_found);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.message(), "No subfolders found");
}

#[test]
fn start_scan_fails_fast_on_missing_root() {
    let tmp = TempDir::new().unwrap();
    let scanner = Scanner::default();
    let err = scanner.start_scan(tmp.path().join("not-here")).unwrap_err();
    assert!(matches!(err, ScanError::InvalidPath(_)));
    assert!(scanner.recv_timeout(Duration::from_millis(100)).is_none());
}

#[cfg(unix)]
#[test]
fn unlistable_root_ends_in_listing_failed() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("locked");
    fs::create_dir_all(root.join("child")).unwrap();
    fs::set_permissions(&root, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&root).is_ok() {
        // Running privileged; nothing to assert.
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let scanner = Scanner::default();
    scanner.start_scan(&root).unwrap();
    let c = drain_to_finish(&scanner);
    fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::ListingFailed);
    assert!(summary.error.as_deref().unwrap().contains("Cannot list subfolders"));
    assert!(c.results.is_empty());
}

#[test]
fn cancel_reports_remaining_folders_as_cancelled() {
    let tmp = TempDir::new().unwrap();
    for i in 0..8 {
        fs::create_dir(tmp.path().join(format!("d{i}"))).unwrap();
    }

    let scanner = Scanner::with_probe(
        ScanConfig::default().with_max_workers(1),
        slow_walk_sizer(Duration::from_millis(250)),
    );
    let handle = scanner.start_scan(tmp.path()).unwrap();

    // Cancel as soon as the rows exist.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        assert!(Instant::now() < deadline, "never saw the listing");
        if let Some(ScanEvent::Listed { .. }) = scanner.recv_timeout(Duration::from_millis(50)) {
            break;
        }
    }
    scanner.cancel_scan(&handle);
    let c = drain_to_finish(&scanner);

    assert_eq!(c.results.len(), 8, "cancelled folders are still reported");
    let cancelled = c
        .results
        .iter()
        .filter(|r| r.status == SizeStatus::Cancelled)
        .count();
    assert!(cancelled >= 6, "only {cancelled} cancelled");
    assert!(c.results.iter().all(|r| r.status != SizeStatus::Cancelled || r.size == 0));

    let summary = c.summary();
    assert_eq!(summary.phase, ScanPhase::Cancelled);
    assert_eq!(summary.completed, 8 - cancelled);
    assert_eq!(summary.total, 8);
    assert!(handle.wait(Duration::from_secs(5)));
}

#[test]
fn deadline_ends_scan_as_timed_out() {
    let tmp = TempDir::new().unwrap();
    for i in 0..3 {
        fs::create_dir(tmp.path().join(format!("d{i}"))).unwrap();
    }

    let scanner = Scanner::with_probe(
        ScanConfig::default()
            .with_max_workers(1)
            .with_deadline(Duration::from_millis(300)),
        slow_walk_sizer(Duration::from_secs(2)),
    );
    let start = Instant::now();
    scanner.start_scan(tmp.path()).unwrap();
    let c = drain_to_finish(&scanner);

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_complete_index_set(&c, 3);
    assert!(c.results.iter().all(|r| r.status == SizeStatus::Cancelled));
    assert_eq!(c.summary().phase, ScanPhase::TimedOut);
    assert_eq!(c.summary().completed, 0);
}

#[test]
fn new_scan_supersedes_old_one_without_leaking_events() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for i in 0..6 {
        fs::create_dir(first.path().join(format!("old{i}"))).unwrap();
    }
    for i in 0..2 {
        fs::create_dir(second.path().join(format!("new{i}"))).unwrap();
    }

    let scanner = Scanner::with_probe(
        ScanConfig::default().with_max_workers(2),
        slow_walk_sizer(Duration::from_millis(200)),
    );
    let old = scanner.start_scan(first.path()).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let new = scanner.start_scan(second.path()).unwrap();

    assert!(old.is_cancelled(), "starting a scan must cancel the previous one");
    assert_eq!(new.generation(), old.generation() + 1);
    assert_eq!(scanner.current_generation(), new.generation());

    let c = drain_to_finish(&scanner);
    assert!(c.generations.iter().all(|&g| g == new.generation()));
    assert_eq!(c.tasks.len(), 2);
    assert!(c.tasks.iter().all(|t| t.path.starts_with(second.path())));
    assert_complete_index_set(&c, 2);
    assert_eq!(c.summary().phase, ScanPhase::Completed);

    // Nothing from the old scan trickles in afterwards either.
    assert!(old.wait(Duration::from_secs(5)));
    assert!(scanner.recv_timeout(Duration::from_millis(200)).is_none());
}
