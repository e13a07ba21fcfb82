/// Result rendering: the terminal table plus JSON/CSV export.
///
/// Every format walks `FolderTable::sorted_view()`, so output order always
/// matches the chosen sort direction.
use chrono::{DateTime, Local};
use compact_str::CompactString;
use foldersweep_core::model::{truncate_name, DEFAULT_NAME_WIDTH};
use foldersweep_core::{human_readable_size, FolderTable, ScanSummary, SizeResult, SizeStatus};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Width of the size column in the terminal table.
const SIZE_WIDTH: usize = 12;

/// One exported row.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub index: usize,
    pub name: CompactString,
    pub path: PathBuf,
    /// `None` until a result has arrived.
    pub size: Option<u64>,
    pub size_human: String,
    pub status: &'static str,
    pub selected: bool,
}

/// Whole-scan JSON document.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub root: Option<&'a Path>,
    pub scanned_at: Option<DateTime<Local>>,
    pub status: String,
    pub total_size: u64,
    pub total_size_human: String,
    pub selected: usize,
    pub folders: Vec<ReportRow>,
}

/// Text for the size column: a formatted size, or why there is none.
pub fn size_cell(result: Option<SizeResult>) -> String {
    match result {
        None => String::from("scanning..."),
        Some(r) if r.status == SizeStatus::Ok => human_readable_size(r.size),
        Some(r) => r.status.label().to_string(),
    }
}

/// Rows in display order.
pub fn report_rows(table: &FolderTable) -> Vec<ReportRow> {
    table
        .sorted_view()
        .into_iter()
        .filter_map(|i| table.row(i))
        .map(|row| ReportRow {
            index: row.task.index,
            name: row.task.name.clone(),
            path: row.task.path.clone(),
            size: row.result.map(|r| r.size),
            size_human: size_cell(row.result),
            status: row.result.map(|r| r.status.label()).unwrap_or("pending"),
            selected: row.selected,
        })
        .collect()
}

/// Render the folder table for a terminal.
pub fn render_table(table: &FolderTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "    {:<name$}  {:>size$}",
        "Folder",
        format!("Size {}", table.sort_order().arrow()),
        name = DEFAULT_NAME_WIDTH,
        size = SIZE_WIDTH,
    );
    for i in table.sorted_view() {
        let Some(row) = table.row(i) else { continue };
        let mark = if row.selected { "[x]" } else { "[ ]" };
        let _ = writeln!(
            out,
            "{mark} {:<name$}  {:>size$}",
            truncate_name(&row.task.name, DEFAULT_NAME_WIDTH),
            size_cell(row.result),
            name = DEFAULT_NAME_WIDTH,
            size = SIZE_WIDTH,
        );
    }
    out
}

/// Footer under the table: scan status, totals, and selection.
pub fn render_footer(table: &FolderTable, summary: Option<&ScanSummary>) -> String {
    let mut out = String::new();
    if let Some(summary) = summary {
        let _ = writeln!(
            out,
            "{} ({:.1}s, started {})",
            summary.message(),
            summary.duration.as_secs_f64(),
            summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    let _ = write!(
        out,
        "Total: {}  |  Selected: {}/{}",
        human_readable_size(table.total_size()),
        table.selected_count(),
        table.len(),
    );
    out
}

pub fn scan_report<'a>(
    root: Option<&'a Path>,
    table: &FolderTable,
    summary: Option<&ScanSummary>,
    status: &str,
) -> ScanReport<'a> {
    ScanReport {
        root,
        scanned_at: summary.map(|s| s.started_at),
        status: status.to_string(),
        total_size: table.total_size(),
        total_size_human: human_readable_size(table.total_size()),
        selected: table.selected_count(),
        folders: report_rows(table),
    }
}

/// Write the scan as pretty-printed JSON.
pub fn write_json<W: Write>(mut writer: W, report: &ScanReport<'_>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Write one CSV record per folder, with a header row.
pub fn write_csv<W: Write>(writer: W, table: &FolderTable) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in report_rows(table) {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}
