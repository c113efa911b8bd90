//! Normalized option model for searchable selection fields.
//!
//! Remote endpoints return arbitrarily shaped records; `SearchOption` is
//! the normalized unit every source resolves to. The default transform in
//! this module handles the common record shapes, and callers with unusual
//! payloads supply their own [`OptionTransform`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of an option, unique within a single source.
///
/// Endpoints disagree on id types (numeric database keys vs string codes),
/// so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionId::Number(n) => write!(f, "{}", n),
            OptionId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for OptionId {
    fn from(n: i64) -> Self {
        OptionId::Number(n)
    }
}

impl From<&str> for OptionId {
    fn from(s: &str) -> Self {
        OptionId::Text(s.to_string())
    }
}

impl From<String> for OptionId {
    fn from(s: String) -> Self {
        OptionId::Text(s)
    }
}

/// A single selectable option produced by a search source.
///
/// Immutable once produced. Selection equality is by `id` alone: two
/// options with the same id refer to the same underlying record even if
/// their labels were re-fetched in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOption {
    pub id: OptionId,
    pub label: String,
    /// The raw record this option was produced from.
    #[serde(default)]
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl PartialEq for SearchOption {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SearchOption {}

impl SearchOption {
    pub fn new(id: impl Into<OptionId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: Value::Null,
            description: None,
            category: None,
            disabled: false,
        }
    }

    /// Build an option from one raw record, falling back to the record's
    /// position in the payload when it carries no usable id.
    fn from_record(record: &Value, index: usize) -> Self {
        let id = match record.get("id") {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(n) => OptionId::Number(n),
                None => OptionId::Number(index as i64),
            },
            Some(Value::String(s)) => OptionId::Text(s.clone()),
            _ => OptionId::Number(index as i64),
        };

        let string_field = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| record.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        };

        Self {
            id,
            label: string_field(&["name", "label", "title"])
                .unwrap_or_else(|| record.to_string()),
            description: string_field(&["description", "email"]),
            category: string_field(&["category", "type"]),
            disabled: record
                .get("disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            value: record.clone(),
        }
    }
}

/// Transform from a raw response payload to options.
///
/// Receives the payload exactly as the endpoint returned it; a custom
/// transform owns envelope handling as well as per-record mapping.
pub type OptionTransform = Arc<dyn Fn(&Value) -> Vec<SearchOption> + Send + Sync>;

/// Records of a payload that is either a bare array or a `{ "data": [...] }`
/// envelope. Anything else yields no records.
fn record_array(raw: &Value) -> &[Value] {
    match raw {
        Value::Array(records) => records,
        Value::Object(map) => map
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Default payload transform: unwrap the envelope and map each record
/// through the common field fallbacks (`id`, `name`/`label`/`title`,
/// `description`/`email`, `category`/`type`).
pub fn default_transform(raw: &Value) -> Vec<SearchOption> {
    record_array(raw)
        .iter()
        .enumerate()
        .map(|(index, record)| SearchOption::from_record(record, index))
        .collect()
}
