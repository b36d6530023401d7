//! Opaque document payload tree and the tagged field-value union.
//!
//! Snapshots, row data, and column mappings are explicitly open-ended —
//! no compile-time schema can describe every label a vision model might
//! return. [`DocValue`] models that openness as a small JSON-shaped tree
//! that preserves insertion order, which `column_order` fidelity depends
//! on.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A node in an opaque, order-preserving document payload tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    Array(Vec<DocValue>),
    Map(IndexMap<String, DocValue>),
}

impl DocValue {
    pub fn as_map(&self) -> Option<&IndexMap<String, DocValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get<'a>(&'a self, key: &str) -> Option<&'a DocValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Exactly one dominant typed slot among text/number/date/bool, the
/// systems-language replacement for four parallel nullable columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Date(chrono::NaiveDate),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Derive a `FieldValue` from a raw `DocValue` leaf, attempting date
    /// parsing for plausible text before falling back to `Text`.
    pub fn from_doc_value(v: &DocValue) -> Self {
        match v {
            DocValue::Null => Self::Null,
            DocValue::Bool(b) => Self::Bool(*b),
            DocValue::Number(n) => Self::Number(*n),
            DocValue::Text(s) => parse_date_loose(s)
                .map(Self::Date)
                .unwrap_or_else(|| Self::Text(s.clone())),
            DocValue::Array(_) | DocValue::Map(_) => Self::Null,
        }
    }
}

fn parse_date_loose(s: &str) -> Option<chrono::NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];
    FORMATS
        .iter()
        .find_map(|f| chrono::NaiveDate::parse_from_str(s.trim(), f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_prefers_date_over_text_when_parseable() {
        let v = DocValue::Text("2025-03-25".to_string());
        assert_eq!(
            FieldValue::from_doc_value(&v),
            FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2025, 3, 25).unwrap())
        );
    }

    #[test]
    fn field_value_falls_back_to_text_for_non_dates() {
        let v = DocValue::Text("ТОВ ТЕХНО".to_string());
        assert_eq!(FieldValue::from_doc_value(&v), FieldValue::Text("ТОВ ТЕХНО".to_string()));
    }

    #[test]
    fn doc_value_map_preserves_insertion_order() {
        let mut m = IndexMap::new();
        m.insert("no".to_string(), DocValue::Text("№".to_string()));
        m.insert("tovar".to_string(), DocValue::Text("Товар".to_string()));
        let v = DocValue::Map(m);
        let keys: Vec<&str> = v.as_map().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["no", "tovar"]);
    }
}
