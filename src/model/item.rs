use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::stable_id;

/// What a parsed line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Header,
    Checkbox,
    Text,
}

impl ItemKind {
    /// Lowercase name, also the prefix of every stable ID
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Header => "header",
            ItemKind::Checkbox => "checkbox",
            ItemKind::Text => "text",
        }
    }
}

/// One non-blank markdown line with a content-derived identity.
///
/// Items are values: state changes produce a new `Item` carrying the same `id`.
/// Hierarchy is implicit in `indentation` (an item belongs to the nearest
/// preceding item with strictly smaller indentation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    /// Line content with markup removed
    pub text: String,
    /// 1-6 for headers, 0 otherwise
    pub header_level: usize,
    /// Only meaningful for checkboxes
    pub checked: bool,
    /// Leading whitespace (tab = 4), or the level for headers
    pub indentation: usize,
    /// Index among non-blank lines; a tie-break signal, not identity
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    // --- Source tracking ---
    /// Physical line (0-indexed) in the text this item was parsed from
    #[serde(skip)]
    pub source_line: Option<usize>,
}

impl Item {
    /// Build an item and derive its ID from the structural fields.
    pub fn new(
        kind: ItemKind,
        text: String,
        header_level: usize,
        checked: bool,
        indentation: usize,
        position: usize,
    ) -> Self {
        let id = stable_id(kind, &text, header_level, indentation, position);
        Item {
            id,
            kind,
            text,
            header_level,
            checked: checked && kind == ItemKind::Checkbox,
            indentation,
            position,
            due_date: None,
            source_line: None,
        }
    }

    /// A header's indentation is its level.
    pub fn header(text: impl Into<String>, level: usize, position: usize) -> Self {
        let level = level.clamp(1, 6);
        Item::new(ItemKind::Header, text.into(), level, false, level, position)
    }

    pub fn checkbox(
        text: impl Into<String>,
        checked: bool,
        indentation: usize,
        position: usize,
    ) -> Self {
        Item::new(
            ItemKind::Checkbox,
            text.into(),
            0,
            checked,
            indentation,
            position,
        )
    }

    pub fn text(text: impl Into<String>, indentation: usize, position: usize) -> Self {
        Item::new(ItemKind::Text, text.into(), 0, false, indentation, position)
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_source_line(mut self, line: usize) -> Self {
        self.source_line = Some(line);
        self
    }

    /// Adopt an earlier identity (reconciliation).
    pub fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    /// Copy of this item with a new checked state and the same ID.
    pub fn with_checked(&self, checked: bool) -> Item {
        Item {
            checked: checked && self.kind == ItemKind::Checkbox,
            ..self.clone()
        }
    }

    pub fn is_checkbox(&self) -> bool {
        self.kind == ItemKind::Checkbox
    }

    pub fn is_header(&self) -> bool {
        self.kind == ItemKind::Header
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.text == other.text
            && self.header_level == other.header_level
            && self.checked == other.checked
            && self.indentation == other.indentation
            && self.position == other.position
            && self.due_date == other.due_date
    }
}

impl Eq for Item {}
