use crate::model::item::Item;

use super::cascade::CheckChange;

/// Maximum number of undo records kept per document
pub const HISTORY_LIMIT: usize = 10;

/// One undoable checkbox action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRecord {
    /// Every checkbox the action touched, with the state to restore
    pub changes: Vec<CheckChange>,
    /// "Last checked" pointer to restore
    pub previous_last_checked: Option<String>,
}

impl CheckRecord {
    /// Apply the recorded states and return the record that reverses this one.
    /// IDs that no longer exist are skipped; no cascade runs.
    fn apply(self, items: &mut [Item], last_checked: &mut Option<String>) -> CheckRecord {
        let mut inverse = Vec::with_capacity(self.changes.len());
        for change in &self.changes {
            if let Some(item) = items.iter().find(|item| item.id == change.id) {
                inverse.push(CheckChange {
                    id: change.id.clone(),
                    was_checked: item.checked,
                });
            }
        }
        for change in self.changes {
            if let Some(index) = items.iter().position(|item| item.id == change.id) {
                items[index] = items[index].with_checked(change.was_checked);
            }
        }
        let inverse_last = std::mem::replace(last_checked, self.previous_last_checked);
        CheckRecord {
            changes: inverse,
            previous_last_checked: inverse_last,
        }
    }
}

/// Bounded undo/redo stacks of checkbox actions
#[derive(Debug, Default)]
pub struct CheckHistory {
    undo: Vec<CheckRecord>,
    redo: Vec<CheckRecord>,
}

impl CheckHistory {
    pub fn new() -> Self {
        CheckHistory {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record a new action. Clears the redo stack.
    pub fn push(&mut self, record: CheckRecord) {
        push_bounded(&mut self.undo, record);
        self.redo.clear();
    }

    /// Revert the latest action. Returns false when there is nothing to undo.
    pub fn undo(&mut self, items: &mut [Item], last_checked: &mut Option<String>) -> bool {
        let Some(record) = self.undo.pop() else {
            return false;
        };
        let inverse = record.apply(items, last_checked);
        push_bounded(&mut self.redo, inverse);
        true
    }

    /// Re-apply the latest undone action.
    pub fn redo(&mut self, items: &mut [Item], last_checked: &mut Option<String>) -> bool {
        let Some(record) = self.redo.pop() else {
            return false;
        };
        let inverse = record.apply(items, last_checked);
        push_bounded(&mut self.undo, inverse);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}

fn push_bounded(stack: &mut Vec<CheckRecord>, record: CheckRecord) {
    stack.push(record);
    if stack.len() > HISTORY_LIMIT {
        stack.drain(..stack.len() - HISTORY_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, was_checked: bool) -> CheckRecord {
        CheckRecord {
            changes: vec![CheckChange {
                id: id.to_string(),
                was_checked,
            }],
            previous_last_checked: None,
        }
    }

    #[test]
    fn push_drops_oldest_past_limit() {
        let mut history = CheckHistory::new();
        for i in 0..HISTORY_LIMIT + 3 {
            history.push(record(&format!("id{}", i), false));
        }
        assert_eq!(history.undo_len(), HISTORY_LIMIT);
        assert_eq!(history.undo[0].changes[0].id, "id3");
    }

    #[test]
    fn undo_skips_vanished_ids() {
        let mut items = vec![Item::checkbox("a", true, 0, 0)];
        let id = items[0].id.clone();
        let mut history = CheckHistory::new();
        history.push(CheckRecord {
            changes: vec![
                CheckChange {
                    id: id.clone(),
                    was_checked: false,
                },
                CheckChange {
                    id: "gone".into(),
                    was_checked: false,
                },
            ],
            previous_last_checked: Some("earlier".into()),
        });

        let mut last = Some(id.clone());
        assert!(history.undo(&mut items, &mut last));
        assert!(!items[0].checked);
        assert_eq!(last.as_deref(), Some("earlier"));
        assert_eq!(history.redo[0].changes.len(), 1);
        assert_eq!(history.redo[0].previous_last_checked, Some(id));
    }

    #[test]
    fn empty_history_is_noop() {
        let mut history = CheckHistory::default();
        let mut items = Vec::new();
        let mut last = None;
        assert!(!history.undo(&mut items, &mut last));
        assert!(!history.redo(&mut items, &mut last));
    }
}
