/// Index-stable table of scanned subfolders.
///
/// Rows live in arena order (task index == position) and are never moved.
/// Results land by index as they arrive; sorting produces a derived list
/// of indices so in-flight results can never be routed to the wrong row.
use super::task::{SizeResult, SizeStatus, SubfolderTask};
use std::path::PathBuf;

/// Folders below this size are picked by "select small folders".
pub const DEFAULT_SMALL_FOLDER_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Default display width for folder names.
pub const DEFAULT_NAME_WIDTH: usize = 30;

/// Direction of the size-sorted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    /// Arrow shown next to the size column header.
    pub fn arrow(self) -> &'static str {
        match self {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        }
    }
}

/// A borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct FolderRow<'a> {
    pub task: &'a SubfolderTask,
    /// `None` while the size is still being computed.
    pub result: Option<SizeResult>,
    pub selected: bool,
}

impl FolderRow<'_> {
    /// Size used for ordering; pending and degenerate rows sort as 0.
    pub fn sort_size(&self) -> u64 {
        self.result.map(|r| r.size).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FolderTable {
    tasks: Vec<SubfolderTask>,
    results: Vec<Option<SizeResult>>,
    selected: Vec<bool>,
    order: SortOrder,
}

impl FolderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from freshly enumerated tasks.
    ///
    /// Tasks are placed by their own index, so the input order does not
    /// matter as long as indices are `0..n` without gaps.
    pub fn from_tasks(mut tasks: Vec<SubfolderTask>) -> Self {
        tasks.sort_by_key(|t| t.index);
        debug_assert!(
            tasks.iter().enumerate().all(|(i, t)| t.index == i),
            "task indices must be 0..n"
        );
        let n = tasks.len();
        Self {
            tasks,
            results: vec![None; n],
            selected: vec![false; n],
            order: SortOrder::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Record a result. Returns `false` for an index this table does not
    /// have (e.g. a stale result from a previous scan's table).
    /// A later result for the same index replaces the earlier one.
    pub fn apply(&mut self, result: SizeResult) -> bool {
        match self.results.get_mut(result.index) {
            Some(slot) => {
                *slot = Some(result);
                true
            }
            None => false,
        }
    }

    /// Record a batch, returning how many results were accepted.
    pub fn apply_batch(&mut self, batch: &[SizeResult]) -> usize {
        batch.iter().filter(|&&r| self.apply(r)).count()
    }

    pub fn row(&self, index: usize) -> Option<FolderRow<'_>> {
        let task = self.tasks.get(index)?;
        Some(FolderRow {
            task,
            result: self.results[index],
            selected: self.selected[index],
        })
    }

    /// Rows in index (enumeration) order.
    pub fn rows(&self) -> impl Iterator<Item = FolderRow<'_>> {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    pub fn result(&self, index: usize) -> Option<SizeResult> {
        self.results.get(index).copied().flatten()
    }

    /// Number of rows that have a result of any status.
    pub fn resolved_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }

    /// Sum of all `Ok` sizes.
    pub fn total_size(&self) -> u64 {
        self.results
            .iter()
            .flatten()
            .filter(|r| r.is_ok())
            .map(|r| r.size)
            .sum()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.order = order;
    }

    pub fn toggle_sort(&mut self) -> SortOrder {
        self.order = self.order.toggled();
        self.order
    }

    /// Row indices ordered by size in the current direction.
    ///
    /// Ties keep enumeration order in both directions.
    pub fn sorted_view(&self) -> Vec<usize> {
        let mut view: Vec<usize> = (0..self.len()).collect();
        let size_of = |i: usize| self.results[i].map(|r| r.size).unwrap_or(0);
        match self.order {
            SortOrder::Ascending => view.sort_by_key(|&i| (size_of(i), i)),
            SortOrder::Descending => {
                view.sort_by(|&a, &b| size_of(b).cmp(&size_of(a)).then(a.cmp(&b)))
            }
        }
        view
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) {
        if let Some(slot) = self.selected.get_mut(index) {
            *slot = selected;
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(slot) = self.selected.get_mut(index) {
            *slot = !*slot;
        }
    }

    pub fn select_all(&mut self) {
        self.selected.iter_mut().for_each(|s| *s = true);
    }

    pub fn deselect_all(&mut self) {
        self.selected.iter_mut().for_each(|s| *s = false);
    }

    /// Select every folder whose measured size is below `threshold` and
    /// deselect the rest. Folders without an `Ok` size are never picked:
    /// a zero from an unreadable folder says nothing about its real size.
    ///
    /// Returns the number of selected rows.
    pub fn select_smaller_than(&mut self, threshold: u64) -> usize {
        for (slot, result) in self.selected.iter_mut().zip(&self.results) {
            *slot = matches!(
                result,
                Some(SizeResult { size, status: SizeStatus::Ok, .. }) if *size < threshold
            );
        }
        self.selected_count()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Paths of selected rows, in index order.
    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.tasks
            .iter()
            .zip(&self.selected)
            .filter(|(_, &s)| s)
            .map(|(t, _)| t.path.clone())
            .collect()
    }
}

/// Shorten a folder name for display, keeping its head and tail.
///
/// `truncate_name("a_really_long_folder_name_here", 11) == "a_re...here"`.
/// The result never exceeds `max_len` characters.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    if max_len < 5 {
        // No room for head, "..." and tail; keep the head only.
        return chars[..max_len].iter().collect();
    }
    let half = max_len.saturating_sub(3) / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head}...{tail}")
}
