//! Merges vision-mode outputs, derives canonical table column order,
//! normalizes numeric text, and reshapes signatures/other_fields into
//! stable list-of-records forms.

use crate::value::DocValue;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Merge `header` and `items` payloads from `detailed` mode. Header keys
/// take precedence on conflict at the top level; `table_data` is taken
/// from `items` when present.
pub fn merge_payloads(header: DocValue, items: DocValue) -> DocValue {
    let mut merged = match header {
        DocValue::Map(m) => m,
        _ => IndexMap::new(),
    };

    if let DocValue::Map(items_map) = items {
        for (key, value) in items_map {
            merged.entry(key).or_insert(value);
        }
    }

    DocValue::Map(merged)
}

/// Compute the canonical column order for a table section.
///
/// Precedence: an explicit `column_order` array in the payload, then the
/// insertion order of `column_mapping` keys, then the insertion order of
/// the first row's keys. Any row key absent from the chosen order is
/// appended at the end — never dropped.
pub fn column_order(
    declared_order: Option<&[DocValue]>,
    column_mapping: Option<&IndexMap<String, DocValue>>,
    rows: &[DocValue],
) -> Vec<String> {
    let mut order: Vec<String> = if let Some(declared) = declared_order.filter(|d| !d.is_empty()) {
        declared.iter().filter_map(|v| v.as_text().map(str::to_string)).collect()
    } else if let Some(mapping) = column_mapping.filter(|m| !m.is_empty()) {
        mapping.keys().cloned().collect()
    } else {
        rows.first()
            .and_then(DocValue::as_map)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    };

    let mut seen: std::collections::HashSet<String> = order.iter().cloned().collect();
    for row in rows {
        if let Some(map) = row.as_map() {
            for key in map.keys() {
                if !seen.contains(key.as_str()) {
                    seen.insert(key.clone());
                    order.push(key.clone());
                }
            }
        }
    }

    order
}

/// Parsed numeric text, preserving the original string alongside the
/// parsed value so downstream formatters can choose either.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNumber {
    pub original: String,
    pub parsed: Option<Decimal>,
}

/// Normalize a numeric-looking string, tolerating thousands separators
/// and either `,` or `.` as the decimal marker.
///
/// Disambiguation rule: the last-occurring punctuation mark is treated as
/// the decimal marker if it is followed by 1-2 digits and is not part of
/// a repeated group; all other occurrences of `.`/`,` are stripped as
/// thousands separators.
pub fn normalize_number(raw: &str) -> NormalizedNumber {
    let original = raw.to_string();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedNumber { original, parsed: None };
    }

    let negative = trimmed.starts_with('-');
    let digits_and_seps: String = trimmed.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();
    if digits_and_seps.is_empty() {
        return NormalizedNumber { original, parsed: None };
    }

    let last_dot = digits_and_seps.rfind('.');
    let last_comma = digits_and_seps.rfind(',');

    let decimal_pos = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(d), None) => Some(d),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(digits_and_seps.len() + 1);
    match decimal_pos {
        Some(pos) => {
            let tail_len = digits_and_seps.len() - pos - 1;
            // A trailing group of exactly 3 digits after the mark, with no
            // other separators downstream, reads as a thousands group, not
            // a decimal fraction (e.g. "1.234" with no further marker).
            let looks_like_thousands_group = tail_len == 3
                && digits_and_seps[..pos].chars().all(|c| c.is_ascii_digit())
                && last_dot.is_some()
                && last_comma.is_none()
                && digits_and_seps.matches(|c| c == '.' || c == ',').count() == 1
                && !digits_and_seps[..pos].is_empty()
                && digits_and_seps[..pos].len() <= 3;

            if looks_like_thousands_group {
                for c in digits_and_seps.chars() {
                    if c.is_ascii_digit() {
                        normalized.push(c);
                    }
                }
            } else {
                for c in digits_and_seps[..pos].chars() {
                    if c.is_ascii_digit() {
                        normalized.push(c);
                    }
                }
                normalized.push('.');
                normalized.push_str(&digits_and_seps[pos + 1..]);
            }
        }
        None => normalized.push_str(&digits_and_seps),
    }

    if negative {
        normalized.insert(0, '-');
    }

    let parsed = Decimal::from_str(&normalized).ok();
    NormalizedNumber { original, parsed }
}

/// One reshaped signature record.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureRecord {
    pub index: u32,
    pub payload: DocValue,
}

/// Re-shape a `signatures` array into an explicitly indexed list.
pub fn reshape_signatures(value: Option<&DocValue>) -> Vec<SignatureRecord> {
    value
        .and_then(DocValue::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, payload)| SignatureRecord { index: i as u32, payload: payload.clone() })
                .collect()
        })
        .unwrap_or_default()
}

/// One reshaped `other_fields` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherFieldRecord {
    pub label: String,
    pub value: DocValue,
    pub key: Option<String>,
}

/// Re-shape `other_fields` so every entry carries `{label, value, key?}`,
/// tolerating the common `{label, value}` or `{name, value}` shapes a
/// vision model may emit.
pub fn reshape_other_fields(value: Option<&DocValue>) -> Vec<OtherFieldRecord> {
    value
        .and_then(DocValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let map = item.as_map()?;
                    let label = map
                        .get("label")
                        .or_else(|| map.get("name"))
                        .and_then(DocValue::as_text)
                        .map(str::to_string)?;
                    let val = map.get("value").cloned().unwrap_or(DocValue::Null);
                    let key = map.get("key").and_then(DocValue::as_text).map(str::to_string);
                    Some(OtherFieldRecord { label, value: val, key })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, DocValue)]) -> IndexMap<String, DocValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn merge_prefers_header_on_conflict() {
        let header = DocValue::Map(map(&[("total", DocValue::Text("100".into()))]));
        let items = DocValue::Map(map(&[
            ("total", DocValue::Text("999".into())),
            ("table_data", DocValue::Text("rows".into())),
        ]));
        let merged = merge_payloads(header, items);
        assert_eq!(merged.get("total").unwrap().as_text(), Some("100"));
        assert_eq!(merged.get("table_data").unwrap().as_text(), Some("rows"));
    }

    #[test]
    fn column_order_uses_declared_array_first() {
        let declared = vec![DocValue::Text("b".into()), DocValue::Text("a".into())];
        let mapping = map(&[("a", DocValue::Text("A".into())), ("b", DocValue::Text("B".into()))]);
        let order = column_order(Some(&declared), Some(&mapping), &[]);
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn column_order_falls_back_to_mapping_then_first_row() {
        let mapping = map(&[("no", DocValue::Text("№".into())), ("tovar", DocValue::Text("Товар".into()))]);
        let order = column_order(None, Some(&mapping), &[]);
        assert_eq!(order, vec!["no", "tovar"]);

        let rows = vec![DocValue::Map(map(&[("x", DocValue::Null), ("y", DocValue::Null)]))];
        let order2 = column_order(None, None, &rows);
        assert_eq!(order2, vec!["x", "y"]);
    }

    #[test]
    fn column_order_never_drops_extra_row_keys() {
        let mapping = map(&[("a", DocValue::Null)]);
        let rows = vec![DocValue::Map(map(&[("a", DocValue::Null), ("b", DocValue::Null)]))];
        let order = column_order(None, Some(&mapping), &rows);
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn normalize_number_handles_european_format() {
        let n = normalize_number("1.234,56");
        assert_eq!(n.parsed, Some(Decimal::from_str("1234.56").unwrap()));
    }

    #[test]
    fn normalize_number_handles_us_format() {
        let n = normalize_number("1,234.56");
        assert_eq!(n.parsed, Some(Decimal::from_str("1234.56").unwrap()));
    }

    #[test]
    fn normalize_number_handles_bare_decimal() {
        let n = normalize_number("21919.97");
        assert_eq!(n.parsed, Some(Decimal::from_str("21919.97").unwrap()));
    }

    #[test]
    fn normalize_number_idempotent_on_plain_integer() {
        let n = normalize_number("37483556");
        assert_eq!(n.parsed, Some(Decimal::from_str("37483556").unwrap()));
    }

    #[test]
    fn normalize_number_reads_lone_dot_as_thousands_group() {
        let n = normalize_number("1.234");
        assert_eq!(n.parsed, Some(Decimal::from_str("1234").unwrap()));
    }

    #[test]
    fn normalize_number_reads_lone_dot_with_two_lead_digits_as_thousands_group() {
        let n = normalize_number("12.345");
        assert_eq!(n.parsed, Some(Decimal::from_str("12345").unwrap()));
    }

    #[test]
    fn normalize_number_reads_four_digit_lead_as_decimal_fraction() {
        let n = normalize_number("1234.567");
        assert_eq!(n.parsed, Some(Decimal::from_str("1234.567").unwrap()));
    }

    #[test]
    fn reshape_signatures_assigns_sequential_index() {
        let arr = DocValue::Array(vec![DocValue::Null, DocValue::Null]);
        let sigs = reshape_signatures(Some(&arr));
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[1].index, 1);
    }

    #[test]
    fn reshape_other_fields_extracts_label_value_key() {
        let arr = DocValue::Array(vec![DocValue::Map(map(&[
            ("label", DocValue::Text("Додаткова інформація".into())),
            ("value", DocValue::Text("Термінова доставка".into())),
        ]))]);
        let fields = reshape_other_fields(Some(&arr));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "Додаткова інформація");
        assert_eq!(fields[0].key, None);
    }
}
