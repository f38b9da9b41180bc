use serde::Serialize;

use crate::model::document::{Document, SourceFormat};
use crate::model::item::{Item, ItemKind};
use crate::ops::outline::NextUp;
use crate::ops::project_ops::ProjectSummary;
use crate::ops::stats::CheckStats;
use crate::util::text::{pad_to_width, progress_bar, truncate_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub position: usize,
    pub id: String,
    pub kind: ItemKind,
    pub text: String,
    pub indentation: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    /// Checkboxes under a header, or nested under a checkbox
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<CheckStats>,
}

#[derive(Serialize)]
pub struct DocumentJson {
    pub file: String,
    pub path: Option<String>,
    pub format: SourceFormat,
    pub total: usize,
    pub checked: usize,
    pub percentage: f64,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct HeaderStatsJson {
    pub id: String,
    pub text: String,
    pub level: usize,
    pub total: usize,
    pub checked: usize,
    pub percentage: f64,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub file: String,
    pub total: usize,
    pub checked: usize,
    pub percentage: f64,
    pub headers: Vec<HeaderStatsJson>,
}

#[derive(Serialize)]
pub struct NextJson {
    pub last_completed: Option<ItemJson>,
    pub upcoming: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct ChangeJson {
    pub file: String,
    pub changed: Vec<String>,
    pub percentage: f64,
    pub saved: String,
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub name: String,
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn item_to_json(doc: &Document, item: &Item) -> ItemJson {
    let progress = match item.kind {
        ItemKind::Header => Some(doc.header_stats(&item.id)),
        ItemKind::Checkbox => Some(doc.child_stats(&item.id)).filter(|s| s.total > 0),
        ItemKind::Text => None,
    };
    ItemJson {
        position: item.position,
        id: item.id.clone(),
        kind: item.kind,
        text: item.text.clone(),
        indentation: item.indentation,
        level: item.is_header().then_some(item.header_level),
        checked: item.is_checkbox().then_some(item.checked),
        due: item.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        expanded: item.is_header().then(|| doc.is_expanded(&item.id)),
        progress,
    }
}

pub fn document_to_json(doc: &Document, items: &[&Item]) -> DocumentJson {
    let totals = doc.totals();
    DocumentJson {
        file: doc.filename.clone(),
        path: doc.path.as_ref().map(|p| p.display().to_string()),
        format: doc.format,
        total: totals.total,
        checked: totals.checked,
        percentage: totals.percentage(),
        items: items.iter().map(|item| item_to_json(doc, item)).collect(),
    }
}

pub fn stats_to_json(doc: &Document) -> StatsJson {
    let totals = doc.totals();
    StatsJson {
        file: doc.filename.clone(),
        total: totals.total,
        checked: totals.checked,
        percentage: totals.percentage(),
        headers: doc
            .items()
            .iter()
            .filter(|item| item.is_header())
            .map(|item| {
                let stats = doc.header_stats(&item.id);
                HeaderStatsJson {
                    id: item.id.clone(),
                    text: item.text.clone(),
                    level: item.header_level,
                    total: stats.total,
                    checked: stats.checked,
                    percentage: stats.percentage(),
                }
            })
            .collect(),
    }
}

pub fn next_to_json(doc: &Document, next: &NextUp<'_>) -> NextJson {
    NextJson {
        last_completed: next.last_completed.map(|item| item_to_json(doc, item)),
        upcoming: next
            .upcoming
            .iter()
            .map(|item| item_to_json(doc, item))
            .collect(),
    }
}

pub fn project_to_json(summary: &ProjectSummary) -> ProjectJson {
    ProjectJson {
        name: summary.name.clone(),
        path: summary.path.display().to_string(),
        exists: summary.path.exists(),
        progress: summary.progress,
        last_accessed: summary.last_accessed.map(|dt| dt.to_rfc3339()),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Widest item text before it is cut
const MAX_TEXT_WIDTH: usize = 72;

/// One line of `tally show`: `  3  - [x] text  (2/3)`
pub fn format_item_line(doc: &Document, item: &Item) -> String {
    let indent = " ".repeat(item.indentation.saturating_sub(header_indent(item)));
    let text = truncate_to_width(&item.text, MAX_TEXT_WIDTH);
    let body = match item.kind {
        ItemKind::Header => {
            let marker = if doc.is_expanded(&item.id) { "v" } else { ">" };
            let stats = doc.header_stats(&item.id);
            format!(
                "{} {} {}  ({}/{})",
                marker,
                "#".repeat(item.header_level),
                text,
                stats.checked,
                stats.total
            )
        }
        ItemKind::Checkbox => {
            let mut line = format!("{}- [{}] {}", indent, if item.checked { 'x' } else { ' ' }, text);
            if let Some(date) = item.due_date {
                line.push_str(&format!("  (due {})", date.format("%Y-%m-%d")));
            }
            let children = doc.child_stats(&item.id);
            if children.total > 0 {
                line.push_str(&format!("  ({}/{})", children.checked, children.total));
            }
            line
        }
        ItemKind::Text => format!("{}{}", indent, text),
    };
    format!("{:>4}  {}", item.position, body)
}

/// Headers sit at column 0 regardless of level
fn header_indent(item: &Item) -> usize {
    if item.is_header() { item.indentation } else { 0 }
}

/// `plan.md  [#####-----]  50.0%  (3/6)`
pub fn format_summary(doc: &Document) -> String {
    let totals = doc.totals();
    format!(
        "{}  {}  {:.1}%  ({}/{})",
        doc.filename,
        progress_bar(totals.percentage(), 20),
        totals.percentage(),
        totals.checked,
        totals.total
    )
}

/// Column-aligned header statistics
pub fn format_header_stats(doc: &Document) -> Vec<String> {
    let headers: Vec<&Item> = doc.items().iter().filter(|i| i.is_header()).collect();
    let name_w = headers
        .iter()
        .map(|h| crate::util::text::display_width(&h.text) + 2 * (h.header_level - 1))
        .max()
        .unwrap_or(0)
        .min(MAX_TEXT_WIDTH);
    headers
        .iter()
        .map(|header| {
            let stats = doc.header_stats(&header.id);
            let label = format!(
                "{}{}",
                "  ".repeat(header.header_level - 1),
                truncate_to_width(&header.text, MAX_TEXT_WIDTH)
            );
            format!(
                "  {}  {}  {:>5.1}%  ({}/{})",
                pad_to_width(&label, name_w),
                progress_bar(stats.percentage(), 10),
                stats.percentage(),
                stats.checked,
                stats.total
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn doc(text: &str) -> Document {
        Document::new("plan.md", parse(text))
    }

    #[test]
    fn item_lines() {
        let mut d = doc("# Plan\n- [x] a\n  - [ ] b due:2025-05-01\nnote");
        let lines: Vec<String> = d.items().iter().map(|i| format_item_line(&d, i)).collect();
        assert_eq!(
            lines,
            vec![
                "   0  v # Plan  (1/2)",
                "   1  - [x] a  (0/1)",
                "   2    - [ ] b  (due 2025-05-01)",
                "   3  note",
            ]
        );

        let header = d.items()[0].id.clone();
        d.toggle_header(&header);
        assert!(format_item_line(&d, &d.items()[0]).contains("> # Plan"));
    }

    #[test]
    fn summary_line() {
        let d = doc("- [x] a\n- [ ] b");
        assert_eq!(format_summary(&d), "plan.md  [##########----------]  50.0%  (1/2)");
    }

    #[test]
    fn json_fields_by_kind() {
        let d = doc("# H\n- [ ] a\n  - [x] b\nplain");
        let json = serde_json::to_value(document_to_json(&d, &d.visible_items())).unwrap();
        let items = json["items"].as_array().unwrap();
        assert_eq!(items[0]["level"], 1);
        assert_eq!(items[0]["expanded"], true);
        assert_eq!(items[0]["progress"]["total"], 2);
        assert_eq!(items[1]["checked"], false);
        assert_eq!(items[1]["progress"]["checked"], 1);
        assert!(items[2].get("progress").is_none());
        assert!(items[3].get("checked").is_none());
        assert_eq!(json["percentage"], 50.0);
    }
}
