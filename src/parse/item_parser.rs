use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::item::{Item, ItemKind};

/// Deepest header level; longer `#` runs are clamped to it
pub const MAX_HEADER_LEVEL: usize = 6;

static DUE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdue:(\d{4}-\d{2}-\d{2})\b").expect("valid due-date regex")
});

/// Parse markdown text into a flat, ordered list of items.
///
/// Blank lines are dropped and take no position. Every item remembers the
/// physical line it came from so that write-back can touch just that line.
pub fn parse(text: &str) -> Vec<Item> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut items = Vec::new();

    for (line_idx, line) in text.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let position = items.len();
        let item = parse_line(line, trimmed, position).with_source_line(line_idx);
        items.push(item);
    }

    items
}

fn parse_line(line: &str, trimmed: &str, position: usize) -> Item {
    if trimmed.starts_with('#') {
        let hashes = trimmed.len() - trimmed.trim_start_matches('#').len();
        let rest = &trimmed[hashes..];
        let text = rest.strip_prefix(' ').unwrap_or(rest);
        return Item::header(text, hashes.min(MAX_HEADER_LEVEL), position);
    }

    let indentation = count_indent(line);
    if let Some((marker, checked)) = checkbox_marker(line) {
        // Label starts after "x]"
        let label = line[marker + 2..].trim();
        let (text, due_date) = extract_due_date(label);
        return Item::new(ItemKind::Checkbox, text, 0, checked, indentation, position)
            .with_due_date(due_date);
    }

    Item::text(trimmed, indentation, position)
}

/// Locate the state character of a `- [ ]`, `- [x]` or `- [X]` line.
///
/// Returns its byte offset in `line` and whether it marks the box as checked.
pub fn checkbox_marker(line: &str) -> Option<(usize, bool)> {
    let start = line.len() - line.trim_start().len();
    let rest = line[start..].strip_prefix("- [")?;
    let mut chars = rest.chars();
    let checked = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    if chars.next()? != ']' {
        return None;
    }
    Some((start + 3, checked))
}

/// Leading whitespace width, tabs counting as four columns.
pub fn count_indent(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Pull the last well-formed `due:YYYY-MM-DD` token out of a label.
///
/// Tokens that are not real calendar dates stay in the text.
fn extract_due_date(label: &str) -> (String, Option<NaiveDate>) {
    let found = DUE_DATE.captures_iter(label).filter_map(|caps| {
        let whole = caps.get(0)?;
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
        Some((whole.range(), date))
    });

    match found.last() {
        Some((range, date)) => {
            let before = label[..range.start].trim_end();
            let after = label[range.end..].trim_start();
            let text = match (before.is_empty(), after.is_empty()) {
                (true, _) => after.to_string(),
                (_, true) => before.to_string(),
                _ => format!("{} {}", before, after),
            };
            (text, Some(date))
        }
        None => (label.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(items: &[Item]) -> Vec<(ItemKind, &str, usize, usize, bool)> {
        items
            .iter()
            .map(|i| (i.kind, i.text.as_str(), i.header_level, i.indentation, i.checked))
            .collect()
    }

    #[test]
    fn parses_headers_checkboxes_and_text() {
        let items = parse("# Plan\n\n- [ ] one\n  - [x] two\n\tnote\n### Deep");
        assert_eq!(
            kinds(&items),
            vec![
                (ItemKind::Header, "Plan", 1, 1, false),
                (ItemKind::Checkbox, "one", 0, 0, false),
                (ItemKind::Checkbox, "two", 0, 2, true),
                (ItemKind::Text, "note", 0, 4, false),
                (ItemKind::Header, "Deep", 3, 3, false),
            ]
        );
    }

    #[test]
    fn blank_lines_take_no_position() {
        let items = parse("\n\n- [ ] a\n   \n\n- [ ] b\n");
        assert_eq!(items[0].position, 0);
        assert_eq!(items[1].position, 1);
        assert_eq!(items[0].source_line, Some(2));
        assert_eq!(items[1].source_line, Some(5));
    }

    #[test]
    fn header_levels_clamp_and_strip_one_space() {
        let items = parse("######## Too deep\n##  two spaces\n#tight");
        assert_eq!(items[0].header_level, 6);
        assert_eq!(items[0].text, "Too deep");
        assert_eq!(items[1].text, " two spaces");
        assert_eq!(items[2].text, "tight");
        assert_eq!(items[2].header_level, 1);
    }

    #[test]
    fn checkbox_forms() {
        let items = parse("- [X] upper\n- [x] lower\n- [ ]\n- [-] other\n-[ ] tight");
        assert!(items[0].checked);
        assert!(items[1].checked);
        assert_eq!(items[2].kind, ItemKind::Checkbox);
        assert_eq!(items[2].text, "");
        assert_eq!(items[3].kind, ItemKind::Text);
        assert_eq!(items[3].text, "- [-] other");
        assert_eq!(items[4].kind, ItemKind::Text);
    }

    #[test]
    fn due_date_is_extracted() {
        let items = parse("- [ ] Pay rent due:2025-03-01\n- [ ] due:2025-01-02 file taxes");
        assert_eq!(items[0].text, "Pay rent");
        assert_eq!(items[0].due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(items[1].text, "file taxes");
        assert_eq!(items[1].due_date, NaiveDate::from_ymd_opt(2025, 1, 2));
    }

    #[test]
    fn malformed_due_date_stays_in_text() {
        let items = parse("- [ ] Impossible due:2025-13-40\n- [ ] overdue:2025-01-01");
        assert_eq!(items[0].text, "Impossible due:2025-13-40");
        assert_eq!(items[0].due_date, None);
        assert_eq!(items[1].text, "overdue:2025-01-01");
        assert_eq!(items[1].due_date, None);
    }

    #[test]
    fn last_valid_due_date_wins() {
        let items = parse("- [ ] a due:2025-01-01 b due:2025-02-02 c due:2025-99-99");
        assert_eq!(items[0].due_date, NaiveDate::from_ymd_opt(2025, 2, 2));
        assert_eq!(items[0].text, "a due:2025-01-01 b c due:2025-99-99");
    }

    #[test]
    fn due_date_only_on_checkboxes() {
        let items = parse("Note due:2025-03-01");
        assert_eq!(items[0].kind, ItemKind::Text);
        assert_eq!(items[0].text, "Note due:2025-03-01");
        assert_eq!(items[0].due_date, None);
    }

    #[test]
    fn crlf_and_bom_are_ignored() {
        let items = parse("\u{feff}# Title\r\n- [x] done\r\n");
        assert_eq!(items[0].text, "Title");
        assert_eq!(items[1].text, "done");
        assert!(items[1].checked);
    }

    #[test]
    fn reparse_gives_identical_ids() {
        let text = "# A\n- [ ] one\n  - [ ] two\nplain";
        let a: Vec<String> = parse(text).into_iter().map(|i| i.id).collect();
        let b: Vec<String> = parse(text).into_iter().map(|i| i.id).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn marker_offset() {
        assert_eq!(checkbox_marker("  - [x] a"), Some((5, true)));
        assert_eq!(checkbox_marker("- [ ]"), Some((3, false)));
        assert_eq!(checkbox_marker("- [y] a"), None);
        assert_eq!(checkbox_marker("* [ ] a"), None);
    }
}
