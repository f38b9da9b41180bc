use crate::model::item::Item;

/// One checkbox touched by an action, with the state it had before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckChange {
    pub id: String,
    pub was_checked: bool,
}

impl CheckChange {
    fn record(item: &Item) -> Self {
        CheckChange {
            id: item.id.clone(),
            was_checked: item.checked,
        }
    }
}

/// Index one past the last item nested under `index`: the first following item
/// whose indentation is not deeper, or the end of the sequence.
pub fn subtree_end(items: &[Item], index: usize) -> usize {
    let indentation = items[index].indentation;
    items[index + 1..]
        .iter()
        .position(|item| item.indentation <= indentation)
        .map_or(items.len(), |offset| index + 1 + offset)
}

/// Nearest preceding checkbox with strictly smaller indentation.
pub fn parent_checkbox(items: &[Item], index: usize) -> Option<usize> {
    let indentation = items[index].indentation;
    items[..index]
        .iter()
        .rposition(|item| item.is_checkbox() && item.indentation < indentation)
}

/// Set checkbox `id` to `value` and cascade.
///
/// Down: every checkbox in the subtree takes `value`. Up (checking only): a
/// parent whose checkboxes at the child's indentation are now all checked gets
/// checked too, repeating towards the root. Returns the touched checkboxes with
/// their previous states, or `None` when `id` is missing or not a checkbox.
pub fn apply_check(items: &mut [Item], id: &str, value: bool) -> Option<Vec<CheckChange>> {
    let index = items.iter().position(|item| item.id == id)?;
    if !items[index].is_checkbox() {
        return None;
    }

    let mut changes = vec![CheckChange::record(&items[index])];
    items[index] = items[index].with_checked(value);

    cascade_down(items, index, value, &mut changes);
    if value {
        cascade_up(items, index, &mut changes);
    }
    Some(changes)
}

fn cascade_down(items: &mut [Item], index: usize, value: bool, changes: &mut Vec<CheckChange>) {
    let end = subtree_end(items, index);
    for i in index + 1..end {
        if items[i].is_checkbox() && items[i].checked != value {
            changes.push(CheckChange::record(&items[i]));
            items[i] = items[i].with_checked(value);
        }
    }
}

fn cascade_up(items: &mut [Item], index: usize, changes: &mut Vec<CheckChange>) {
    let mut child = index;
    while let Some(parent) = parent_checkbox(items, child) {
        let child_indentation = items[child].indentation;
        let end = subtree_end(items, parent);
        let all_checked = items[parent + 1..end]
            .iter()
            .filter(|item| item.is_checkbox() && item.indentation == child_indentation)
            .all(|item| item.checked);

        if !all_checked || items[parent].checked {
            return;
        }
        changes.push(CheckChange::record(&items[parent]));
        items[parent] = items[parent].with_checked(true);
        child = parent;
    }
}
