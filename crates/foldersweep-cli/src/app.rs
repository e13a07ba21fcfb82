/// Top-level CLI flow: scan, show, select, optionally delete and rescan.
use crate::args::{Cli, OutputFormat};
use crate::interrupt::Interrupt;
use crate::report;
use crate::state::{AppPhase, AppState};
use anyhow::{bail, Context};
use foldersweep_core::human_readable_size;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// How long one wait for scan events may block before re-checking.
const TICK: Duration = Duration::from_millis(100);

/// Run the CLI to completion.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut state = AppState::new(cli.scan_config());
    state.set_sort_order(cli.sort.into());
    let interrupt = Interrupt::install();

    scan_to_completion(&mut state, &cli.path, &interrupt)?;
    apply_selection(&mut state, &cli);
    print_results(&state, cli.format)?;

    if !cli.delete {
        return Ok(());
    }
    if interrupt.is_requested() {
        eprintln!("Scan was interrupted; nothing deleted");
        return Ok(());
    }

    let selected = state.table.selected_count();
    if selected == 0 {
        eprintln!("No folders selected; nothing to delete");
        return Ok(());
    }
    if !cli.yes && !confirm_delete(&state, io::stdin().lock())? {
        eprintln!("Deletion cancelled");
        return Ok(());
    }

    let report = state.delete_selected();
    eprintln!("{}", report.message());
    for (path, err) in &report.failures {
        eprintln!("  {}: {err}", path.display());
    }

    if report.deleted > 0 {
        info!("Rescanning {} after deletion", cli.path.display());
        scan_to_completion(&mut state, &cli.path, &interrupt)?;
        print_results(&state, cli.format)?;
    }

    if report.failed > 0 {
        bail!("{} folder(s) could not be deleted", report.failed);
    }
    Ok(())
}

/// Start a scan of `root` and pump events until it finishes, echoing
/// status changes to stderr.
///
/// A Ctrl-C recorded on `interrupt` cancels the scan; the call still
/// returns normally once the cancelled scan has reported.
pub fn scan_to_completion(
    state: &mut AppState,
    root: &Path,
    interrupt: &Interrupt,
) -> anyhow::Result<()> {
    state
        .start_scan(root)
        .with_context(|| format!("Cannot scan {}", root.display()))?;

    interrupt.arm();
    let mut cancelling = false;
    let mut last_status = String::new();
    while state.is_scanning() {
        if !cancelling && interrupt.is_requested() {
            warn!("Scan interrupted by user");
            state.cancel_scan();
            cancelling = true;
        }
        state.wait_for_event(TICK);
        if state.status != last_status {
            eprintln!("{}", state.status);
            last_status.clone_from(&state.status);
        }
    }
    interrupt.disarm();

    if state.phase == AppPhase::Idle {
        // Listing failed after the scan thread started.
        bail!("{}", state.status);
    }
    Ok(())
}

fn apply_selection(state: &mut AppState, cli: &Cli) {
    let picked = if cli.select_all {
        state.select_all()
    } else if let Some(threshold) = cli.select_below {
        state.select_smaller_than(threshold)
    } else {
        return;
    };
    info!("Selected {picked} folder(s)");
}

fn print_results(state: &AppState, format: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => {
            write!(out, "{}", report::render_table(&state.table))?;
            writeln!(
                out,
                "{}",
                report::render_footer(&state.table, state.summary.as_ref())
            )?;
        }
        OutputFormat::Json => {
            let doc = report::scan_report(
                state.root(),
                &state.table,
                state.summary.as_ref(),
                &state.status,
            );
            report::write_json(&mut out, &doc)?;
        }
        OutputFormat::Csv => report::write_csv(&mut out, &state.table)?,
    }
    out.flush()?;
    Ok(())
}

/// List what is about to go and ask for a yes on `input`.
pub fn confirm_delete<R: BufRead>(state: &AppState, mut input: R) -> anyhow::Result<bool> {
    let paths = state.table.selected_paths();
    let bytes: u64 = state
        .table
        .rows()
        .filter(|r| r.selected)
        .map(|r| r.sort_size())
        .sum();

    let mut err = io::stderr().lock();
    writeln!(err, "About to permanently delete:")?;
    for path in &paths {
        writeln!(err, "  {}", path.display())?;
    }
    write!(
        err,
        "Delete {} folder(s) ({})? This cannot be undone. [y/N] ",
        paths.len(),
        human_readable_size(bytes)
    )?;
    err.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
