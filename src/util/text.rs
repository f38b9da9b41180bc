use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

/// Truncate to fit within `max_cells`, ending in `…` when anything was cut.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = display_width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    result
}

/// Left-align `s` in a column `cells` wide (wide characters counted as 2).
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let width = display_width(s);
    format!("{}{}", s, " ".repeat(cells.saturating_sub(width)))
}

/// `[#####-----]`-style bar, `cells` wide between the brackets.
pub fn progress_bar(percentage: f64, cells: usize) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * cells as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(cells - filled))
}
