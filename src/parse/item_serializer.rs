use crate::model::item::{Item, ItemKind};

use super::item_parser::checkbox_marker;

/// Canonical markdown for an item list, the inverse of `parse`.
pub fn reconstruct(items: &[Item]) -> String {
    items
        .iter()
        .map(serialize_item)
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_item(item: &Item) -> String {
    match item.kind {
        ItemKind::Header => format!("{} {}", "#".repeat(item.header_level), item.text),
        ItemKind::Checkbox => {
            let mut line = format!(
                "{}- [{}] {}",
                " ".repeat(item.indentation),
                if item.checked { 'x' } else { ' ' },
                item.text
            );
            if let Some(date) = item.due_date {
                line.push_str(&format!(" due:{}", date.format("%Y-%m-%d")));
            }
            line
        }
        ItemKind::Text => format!("{}{}", " ".repeat(item.indentation), item.text),
    }
}

/// Rewrite checkbox markers in `source` to match `items`.
///
/// Only the state character of checkbox lines whose state differs is touched;
/// everything else is emitted verbatim. Items without a `source_line`, or whose
/// line is no longer a checkbox, are ignored.
pub fn apply_checkbox_states(source: &str, items: &[Item]) -> String {
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();

    for item in items.iter().filter(|i| i.is_checkbox()) {
        let Some(line) = item.source_line.and_then(|idx| lines.get_mut(idx)) else {
            continue;
        };
        let Some((marker, checked)) = checkbox_marker(line.trim_start_matches('\u{feff}')) else {
            continue;
        };
        if checked == item.checked {
            continue;
        }
        let offset = marker + (line.len() - line.trim_start_matches('\u{feff}').len());
        let replacement = if item.checked { "x" } else { " " };
        line.replace_range(offset..offset + 1, replacement);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_output() {
        let items = parse(
            "#   Plan\n\n- [X] Done thing\n    - [ ] Sub due:2025-04-01\n\tloose note\n## Later",
        );
        insta::assert_snapshot!(reconstruct(&items), @r"
        #   Plan
        - [x] Done thing
            - [ ] Sub due:2025-04-01
            loose note
        ## Later
        ");
    }

    #[test]
    fn empty_list_is_empty_text() {
        assert_eq!(reconstruct(&[]), "");
    }

    #[test]
    fn apply_flips_only_changed_markers() {
        let source = "# Plan\n\n- [ ] a\n  - [X] b\n\n- [ ] c\n";
        let items: Vec<Item> = parse(source)
            .into_iter()
            .map(|item| match item.text.as_str() {
                "a" => item.with_checked(true),
                "b" => item.with_checked(false),
                _ => item,
            })
            .collect();
        assert_eq!(
            apply_checkbox_states(source, &items),
            "# Plan\n\n- [x] a\n  - [ ] b\n\n- [ ] c\n"
        );
    }

    #[test]
    fn apply_keeps_unchanged_uppercase_marker() {
        let source = "- [X] kept\r\n- [ ] flipped\r\n";
        let mut items = parse(source);
        items[1] = items[1].with_checked(true);
        assert_eq!(
            apply_checkbox_states(source, &items),
            "- [X] kept\r\n- [x] flipped\r\n"
        );
    }

    #[test]
    fn apply_handles_bom_on_first_line() {
        let source = "\u{feff}- [ ] first";
        let items: Vec<Item> = parse(source).iter().map(|i| i.with_checked(true)).collect();
        assert_eq!(apply_checkbox_states(source, &items), "\u{feff}- [x] first");
    }

    #[test]
    fn apply_ignores_lines_that_changed_shape() {
        let items: Vec<Item> = parse("- [ ] a").iter().map(|i| i.with_checked(true)).collect();
        assert_eq!(apply_checkbox_states("plain text", &items), "plain text");
        assert_eq!(apply_checkbox_states("", &items), "");
    }
}
