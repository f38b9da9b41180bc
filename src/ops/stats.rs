use serde::Serialize;

use crate::model::item::Item;

use super::cascade::subtree_end;

/// Checkbox counts for some span of a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckStats {
    pub total: usize,
    pub checked: usize,
}

impl CheckStats {
    /// Checked share, 0-100. Zero when there are no checkboxes.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.checked as f64 / self.total as f64 * 100.0
    }

    fn count<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut stats = CheckStats::default();
        for item in items.into_iter().filter(|item| item.is_checkbox()) {
            stats.total += 1;
            if item.checked {
                stats.checked += 1;
            }
        }
        stats
    }
}

/// Every checkbox in the document
pub fn totals(items: &[Item]) -> CheckStats {
    CheckStats::count(items)
}

/// Checkboxes after the header at `index`, up to the next header of the same
/// or a shallower level.
pub fn header_stats(items: &[Item], index: usize) -> CheckStats {
    let header = &items[index];
    if !header.is_header() {
        return CheckStats::default();
    }
    let end = section_end(items, index);
    CheckStats::count(&items[index + 1..end])
}

/// Checkboxes nested under the checkbox at `index` (the same span cascade-down walks).
pub fn child_stats(items: &[Item], index: usize) -> CheckStats {
    if !items[index].is_checkbox() {
        return CheckStats::default();
    }
    CheckStats::count(&items[index + 1..subtree_end(items, index)])
}

/// Index one past a header's section: the next header at the same or a
/// shallower level, or the end.
pub fn section_end(items: &[Item], index: usize) -> usize {
    let level = items[index].header_level;
    items[index + 1..]
        .iter()
        .position(|item| item.is_header() && item.header_level <= level)
        .map_or(items.len(), |offset| index + 1 + offset)
}
