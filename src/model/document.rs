use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::item::Item;
use crate::ops::cascade;
use crate::ops::history::{CheckHistory, CheckRecord};
use crate::ops::outline::{self, NextUp};
use crate::ops::reconcile::Reconciled;
use crate::ops::stats::{self, CheckStats};

/// Encoding the source text was read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Markdown,
    Rtf,
}

/// One opened checklist file: its items, header expansion, and checkbox history.
#[derive(Debug)]
pub struct Document {
    /// Display name (file name of the source)
    pub filename: String,
    /// Absolute path of the source, if loaded from disk
    pub path: Option<PathBuf>,
    /// Text the items were parsed from
    pub source: String,
    pub format: SourceFormat,
    pub last_accessed: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// The file changed on disk since it was loaded
    pub has_external_changes: bool,

    items: Vec<Item>,
    expanded_headers: HashSet<String>,
    last_checked: Option<String>,
    history: CheckHistory,
}

impl Document {
    /// In-memory document with every header expanded.
    pub fn new(filename: impl Into<String>, items: Vec<Item>) -> Self {
        let mut doc = Document {
            filename: filename.into(),
            path: None,
            source: String::new(),
            format: SourceFormat::Markdown,
            last_accessed: Utc::now(),
            last_checked_at: None,
            has_external_changes: false,
            items,
            expanded_headers: HashSet::new(),
            last_checked: None,
            history: CheckHistory::new(),
        };
        doc.expand_all();
        doc
    }

    /// Document built from a reconciled parse. With no restored expansion
    /// state, every header starts expanded.
    pub fn from_reconciled(filename: impl Into<String>, reconciled: Reconciled) -> Self {
        let mut doc = Document::new(filename, Vec::new());
        doc.apply_reconciled(reconciled);
        doc
    }

    pub fn with_source(mut self, path: PathBuf, source: String, format: SourceFormat) -> Self {
        self.path = Some(path);
        self.source = source;
        self.format = format;
        self
    }

    /// Swap in a freshly reloaded parse. History is kept: reconciled items
    /// keep their IDs, and records for IDs that vanished are skipped on undo.
    pub fn replace_content(&mut self, reconciled: Reconciled, source: String, format: SourceFormat) {
        self.apply_reconciled(reconciled);
        self.source = source;
        self.format = format;
        self.has_external_changes = false;
    }

    fn apply_reconciled(&mut self, reconciled: Reconciled) {
        self.items = reconciled.items;
        self.expanded_headers = reconciled.expanded_headers;
        if self.expanded_headers.is_empty() {
            self.expand_all();
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn last_checked_id(&self) -> Option<&str> {
        self.last_checked.as_deref()
    }

    // -----------------------------------------------------------------------
    // Checkbox mutation
    // -----------------------------------------------------------------------

    /// Set a checkbox, cascading to its subtree and (when checking) to parents
    /// whose children are now all checked. Returns false when `id` is not a
    /// checkbox; nothing changes in that case.
    pub fn set_checked(&mut self, id: &str, value: bool) -> bool {
        let previous_last_checked = self.last_checked.clone();
        let Some(changes) = cascade::apply_check(&mut self.items, id, value) else {
            return false;
        };
        if value {
            self.last_checked = Some(id.to_string());
            self.last_checked_at = Some(Utc::now());
        }
        self.history.push(CheckRecord {
            changes,
            previous_last_checked,
        });
        true
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.items, &mut self.last_checked)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.items, &mut self.last_checked)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_len()
    }

    // -----------------------------------------------------------------------
    // Header expansion
    // -----------------------------------------------------------------------

    pub fn expanded_headers(&self) -> &HashSet<String> {
        &self.expanded_headers
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded_headers.contains(id)
    }

    /// Flip a header between expanded and collapsed. Returns false when `id`
    /// is not a header.
    pub fn toggle_header(&mut self, id: &str) -> bool {
        if !self.item(id).is_some_and(Item::is_header) {
            return false;
        }
        if !self.expanded_headers.remove(id) {
            self.expanded_headers.insert(id.to_string());
        }
        true
    }

    pub fn expand_all(&mut self) {
        self.expanded_headers = self
            .items
            .iter()
            .filter(|item| item.is_header())
            .map(|item| item.id.clone())
            .collect();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn checkbox_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|item| item.is_checkbox()).collect()
    }

    pub fn checked_items(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.is_checkbox() && item.checked)
            .collect()
    }

    pub fn unchecked_items(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.is_checkbox() && !item.checked)
            .collect()
    }

    pub fn totals(&self) -> CheckStats {
        stats::totals(&self.items)
    }

    /// Checked share of all checkboxes, 0-100 (0 with no checkboxes)
    pub fn completion_percentage(&self) -> f64 {
        self.totals().percentage()
    }

    /// Checkboxes under a header, up to the next header at the same or a
    /// shallower level. Zero for anything that isn't a header.
    pub fn header_stats(&self, id: &str) -> CheckStats {
        self.index_of(id)
            .map(|index| stats::header_stats(&self.items, index))
            .unwrap_or_default()
    }

    /// Checkboxes nested under a checkbox. Zero for anything else.
    pub fn child_stats(&self, id: &str) -> CheckStats {
        self.index_of(id)
            .map(|index| stats::child_stats(&self.items, index))
            .unwrap_or_default()
    }

    /// Items not hidden under a collapsed header
    pub fn visible_items(&self) -> Vec<&Item> {
        outline::visible_items(&self.items, &self.expanded_headers)
    }

    /// Last completed checkbox and the next `count` open ones
    pub fn next_items(&self, count: usize) -> NextUp<'_> {
        outline::next_items(&self.items, self.last_checked.as_deref(), count)
    }
}
