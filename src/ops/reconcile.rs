use std::collections::HashSet;

use tracing::debug;

use crate::model::config::MatchingConfig;
use crate::model::item::Item;
use crate::model::snapshot::{SavedItem, SavedSnapshot};

use super::similarity::similarity;

/// A fresh parse merged with what a snapshot remembers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub items: Vec<Item>,
    /// Snapshot headers that still exist and should stay expanded
    pub expanded_headers: HashSet<String>,
    /// How many items took over an earlier identity
    pub reused: usize,
}

/// Recover earlier identities and states for a freshly parsed item list.
///
/// Each new item is matched against the snapshot's item descriptors with the
/// same kind, indentation and header level. An exact text match wins outright;
/// otherwise the best `similarity - position drift penalty` is taken if it
/// reaches the threshold. A matched item keeps the old ID and the checked
/// state recorded for it; everything else comes from the new parse. Snapshot
/// descriptors are consumed, so no old identity is handed out twice.
///
/// Snapshots without descriptors only restore states whose freshly generated
/// ID appears verbatim in the snapshot.
pub fn reconcile(
    new_items: Vec<Item>,
    snapshot: Option<&SavedSnapshot>,
    policy: &MatchingConfig,
) -> Reconciled {
    let Some(snapshot) = snapshot else {
        return Reconciled {
            items: new_items,
            expanded_headers: HashSet::new(),
            reused: 0,
        };
    };
    match &snapshot.items {
        Some(old_items) => reconcile_descriptors(new_items, snapshot, old_items, policy),
        None => reconcile_exact_ids(new_items, snapshot),
    }
}

fn reconcile_descriptors(
    new_items: Vec<Item>,
    snapshot: &SavedSnapshot,
    old_items: &[SavedItem],
    policy: &MatchingConfig,
) -> Reconciled {
    let mut consumed = vec![false; old_items.len()];
    let mut reused_ids = HashSet::new();
    let mut items = Vec::with_capacity(new_items.len());

    for item in new_items {
        match best_match(&item, old_items, &consumed, policy) {
            Some((index, score)) if score >= policy.threshold => {
                consumed[index] = true;
                let old = &old_items[index];
                let checked = snapshot
                    .checkbox_states
                    .get(&old.id)
                    .copied()
                    .unwrap_or(item.checked);
                debug!(old = %old.id, new = %item.id, score, "matched item");
                reused_ids.insert(old.id.clone());
                items.push(item.with_id(old.id.clone()).with_checked(checked));
            }
            _ => items.push(item),
        }
    }

    let expanded_headers = snapshot
        .expanded_headers
        .iter()
        .filter(|id| reused_ids.contains(*id))
        .cloned()
        .collect();

    debug!(
        reused = reused_ids.len(),
        total = items.len(),
        "reconciled against snapshot"
    );
    Reconciled {
        items,
        expanded_headers,
        reused: reused_ids.len(),
    }
}

fn reconcile_exact_ids(new_items: Vec<Item>, snapshot: &SavedSnapshot) -> Reconciled {
    let mut reused = 0;
    let items: Vec<Item> = new_items
        .into_iter()
        .map(|item| match snapshot.checkbox_states.get(&item.id) {
            Some(&checked) if item.is_checkbox() => {
                reused += 1;
                item.with_checked(checked)
            }
            _ => item,
        })
        .collect();

    let current: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
    let expanded_headers = snapshot
        .expanded_headers
        .iter()
        .filter(|id| current.contains(id.as_str()))
        .cloned()
        .collect();

    debug!(reused, "reconciled against legacy snapshot");
    Reconciled {
        items,
        expanded_headers,
        reused,
    }
}

/// Best unconsumed structural candidate and its score. Ties keep the earliest
/// candidate.
fn best_match(
    item: &Item,
    old_items: &[SavedItem],
    consumed: &[bool],
    policy: &MatchingConfig,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, old) in old_items.iter().enumerate() {
        if consumed[index]
            || old.kind != item.kind
            || old.indentation != item.indentation
            || old.header_level != item.header_level
        {
            continue;
        }
        if old.text == item.text {
            return Some((index, 1.0));
        }
        let score = similarity(&item.text, &old.text)
            - position_penalty(item.position, old.position, policy);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best
}

fn position_penalty(new: usize, old: usize, policy: &MatchingConfig) -> f64 {
    (new.abs_diff(old) as f64 * policy.position_penalty).min(policy.max_position_penalty)
}
