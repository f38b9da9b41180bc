use std::collections::HashSet;

use crate::model::item::Item;

use super::stats::section_end;

/// The "what now" view of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUp<'a> {
    /// Most recently completed checkbox
    pub last_completed: Option<&'a Item>,
    /// Header above the first open checkbox (if any), then the open checkboxes
    pub upcoming: Vec<&'a Item>,
}

/// Items not hidden by a collapsed header. A collapsed header stays visible
/// and hides everything up to the next header of the same or a shallower level.
pub fn visible_items<'a>(items: &'a [Item], expanded: &HashSet<String>) -> Vec<&'a Item> {
    let mut visible = Vec::with_capacity(items.len());
    let mut index = 0;
    while index < items.len() {
        let item = &items[index];
        visible.push(item);
        if item.is_header() && !expanded.contains(&item.id) {
            index = section_end(items, index);
        } else {
            index += 1;
        }
    }
    visible
}

/// Last completed checkbox plus the next `count` unchecked ones.
///
/// The last completed item is `last_checked` while it is still checked,
/// otherwise the last checked checkbox in document order.
pub fn next_items<'a>(items: &'a [Item], last_checked: Option<&str>, count: usize) -> NextUp<'a> {
    let last_completed = last_checked
        .and_then(|id| items.iter().find(|item| item.id == id && item.checked))
        .or_else(|| {
            items
                .iter()
                .rev()
                .find(|item| item.is_checkbox() && item.checked)
        });

    let mut upcoming = Vec::new();
    let Some(first_open) = items
        .iter()
        .position(|item| item.is_checkbox() && !item.checked)
    else {
        return NextUp {
            last_completed,
            upcoming,
        };
    };

    if let Some(header) = items[..first_open].iter().rev().find(|item| item.is_header()) {
        upcoming.push(header);
    }
    upcoming.extend(
        items
            .iter()
            .filter(|item| item.is_checkbox() && !item.checked)
            .take(count),
    );
    NextUp {
        last_completed,
        upcoming,
    }
}
