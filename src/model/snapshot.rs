use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::document::Document;
use super::item::{Item, ItemKind};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference
/// date of numeric `savedAt` values in older records.
const REFERENCE_DATE_OFFSET: i64 = 978_307_200;

/// Lightweight item descriptor captured at save time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "level")]
    pub header_level: usize,
    #[serde(default, alias = "indentationLevel")]
    pub indentation: usize,
    #[serde(default)]
    pub position: usize,
}

impl From<&Item> for SavedItem {
    fn from(item: &Item) -> Self {
        SavedItem {
            id: item.id.clone(),
            kind: item.kind,
            text: item.text.clone(),
            header_level: item.header_level,
            indentation: item.indentation,
            position: item.position,
        }
    }
}

/// Persisted progress for one tracked file (written to `<key>.progress.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSnapshot {
    #[serde(default)]
    pub filename: String,
    #[serde(default, deserialize_with = "saved_at")]
    pub saved_at: DateTime<Utc>,
    /// Checkbox ID to checked state, in document order
    #[serde(default, deserialize_with = "lenient")]
    pub checkbox_states: IndexMap<String, bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub expanded_headers: BTreeSet<String>,
    /// Absent in legacy records, which fall back to exact-ID matching
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<Vec<SavedItem>>,
}

impl SavedSnapshot {
    /// Capture the current state of a document.
    pub fn capture(doc: &Document) -> Self {
        let items = doc.items();
        SavedSnapshot {
            filename: doc.filename.clone(),
            saved_at: Utc::now(),
            checkbox_states: items
                .iter()
                .filter(|item| item.is_checkbox())
                .map(|item| (item.id.clone(), item.checked))
                .collect(),
            expanded_headers: doc.expanded_headers().iter().cloned().collect(),
            items: Some(items.iter().map(SavedItem::from).collect()),
        }
    }
}

/// Decode a field, falling back to its default when the value is malformed.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Rfc3339(DateTime<Utc>),
    ReferenceSeconds(f64),
}

/// `savedAt` is an RFC 3339 string, or seconds since 2001-01-01 in older records.
fn saved_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let timestamp = match serde_json::from_value::<RawTimestamp>(value) {
        Ok(RawTimestamp::Rfc3339(at)) => at,
        Ok(RawTimestamp::ReferenceSeconds(secs)) => from_reference_seconds(secs).unwrap_or_default(),
        Err(_) => DateTime::default(),
    };
    Ok(timestamp)
}

/// Seconds since 2001-01-01 as a timestamp; `None` when out of range.
fn from_reference_seconds(secs: f64) -> Option<DateTime<Utc>> {
    let millis = (secs * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    let millis = (millis as i64).checked_add(REFERENCE_DATE_OFFSET * 1000)?;
    DateTime::from_timestamp_millis(millis)
}
