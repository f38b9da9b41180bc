use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::config::SortKey;

/// One row of the project list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub path: PathBuf,
    /// Completion percentage, `None` when the file could not be loaded
    pub progress: Option<f64>,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Order projects by `key`. Entries with no value for the key (never accessed,
/// unreadable file) sort after everything else in either direction; ties fall
/// back to the name.
pub fn sort_projects(projects: &mut [ProjectSummary], key: SortKey, ascending: bool) {
    projects.sort_by(|a, b| {
        let primary = match key {
            SortKey::Name => directed(cmp_names(a, b), ascending),
            SortKey::Progress => cmp_missing_last(a.progress, b.progress, ascending, |x, y| {
                x.total_cmp(y)
            }),
            SortKey::LastAccessed => {
                cmp_missing_last(a.last_accessed, b.last_accessed, ascending, |x, y| x.cmp(y))
            }
        };
        primary.then_with(|| cmp_names(a, b))
    });
}

fn cmp_names(a: &ProjectSummary, b: &ProjectSummary) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.path.cmp(&b.path))
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

fn cmp_missing_last<T>(
    a: Option<T>,
    b: Option<T>,
    ascending: bool,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(cmp(&x, &y), ascending),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
