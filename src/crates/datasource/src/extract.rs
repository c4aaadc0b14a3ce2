//! Text extraction from structured records.
//!
//! Objects yield the first of `content`, `text`, `body`, `message`; objects
//! without any of them are pretty-printed. Collections apply the same rule
//! per item and join the results with a blank line.

use serde_json::{Map, Value};

/// Field names probed, in priority order.
pub const CONTENT_FIELDS: [&str; 4] = ["content", "text", "body", "message"];

/// Separator between items of a collection.
pub const ITEM_SEPARATOR: &str = "\n\n";

/// Extract text from any JSON value.
pub fn extract_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(extract_item)
            .collect::<Vec<_>>()
            .join(ITEM_SEPARATOR),
        other => extract_item(other),
    }
}

/// Extract text from a list of records (rows, documents, items).
pub fn extract_records(records: Vec<Map<String, Value>>) -> String {
    records
        .into_iter()
        .map(|record| extract_item(&Value::Object(record)))
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR)
}

fn extract_item(value: &Value) -> String {
    match value {
        Value::Object(map) => CONTENT_FIELDS
            .iter()
            .find_map(|field| map.get(*field))
            .map(value_to_string)
            .unwrap_or_else(|| {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }),
        other => value_to_string(other),
    }
}

/// Strings verbatim, everything else in its JSON form.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_priority() {
        let value = json!({"message": "m", "text": "t", "title": "x"});
        assert_eq!(extract_text(&value), "t");
    }

    #[test]
    fn test_non_string_field_uses_json_form() {
        assert_eq!(extract_text(&json!({"body": 42})), "42");
    }

    #[test]
    fn test_object_without_fields_is_pretty_printed() {
        let value = json!({"title": "Doc"});
        assert_eq!(extract_text(&value), "{\n  \"title\": \"Doc\"\n}");
    }

    #[test]
    fn test_collection_joined_with_blank_line() {
        let value = json!([{"content": "a"}, "b", {"text": "c"}]);
        assert_eq!(extract_text(&value), "a\n\nb\n\nc");
    }

    #[test]
    fn test_records() {
        let mut row = Map::new();
        row.insert("id".to_string(), json!(1));
        row.insert("body".to_string(), json!("hello"));
        assert_eq!(extract_records(vec![row.clone(), row]), "hello\n\nhello");
        assert_eq!(extract_records(Vec::new()), "");
    }

    #[test]
    fn test_scalar() {
        assert_eq!(extract_text(&json!("plain")), "plain");
        assert_eq!(extract_text(&json!(1.5)), "1.5");
    }
}
