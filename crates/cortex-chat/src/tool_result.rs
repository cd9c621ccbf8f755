//! Field extraction shared by the accumulator and the summary extractor.
//!
//! Tool results arrive either flat (`{"sql": ..}`), with a nested `json`
//! object, or as a `content` list whose entries carry `json` objects.

use serde_json::{Map, Value};

use crate::summary::Citation;

/// Keys whose presence marks verification metadata.
pub const VERIFICATION_KEYS: [&str; 5] = [
    "verification",
    "validated",
    "query_verified",
    "verified_query_used",
    "query_validation",
];

const VERIFIED_WORDS: [&str; 6] = ["true", "yes", "verified", "validated", "valid", "passed"];
const NESTED_FLAG_KEYS: [&str; 5] = [
    "verified",
    "validated",
    "is_verified",
    "valid",
    "verified_query_used",
];

/// The payload itself followed by every nested `json` object, in order.
pub fn layers(payload: &Value) -> Vec<&Value> {
    let mut out = vec![payload];
    if let Some(json) = payload.get("json").filter(|v| v.is_object()) {
        out.push(json);
    }
    if let Some(entries) = payload.get("content").and_then(Value::as_array) {
        out.extend(
            entries
                .iter()
                .filter_map(|entry| entry.get("json"))
                .filter(|v| v.is_object()),
        );
    }
    out
}

/// Merges verification keys into `info`. Returns true if any of them signals
/// that a verified query was used.
pub fn merge_verification(payload: &Value, info: &mut Map<String, Value>) -> bool {
    let mut verified = false;
    for layer in layers(payload) {
        for key in VERIFICATION_KEYS {
            let Some(value) = layer.get(key).filter(|v| !v.is_null()) else {
                continue;
            };
            verified |= signals_verified(key, value);
            info.insert(key.to_string(), value.clone());
        }
    }
    verified
}

/// Decides whether a verification value means "verified".
///
/// `verified_query_used` is populated with the matched reference query when
/// one was used, so any non-empty value counts there.
pub fn signals_verified(key: &str, value: &Value) -> bool {
    if key == "verified_query_used" {
        return match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.trim().is_empty() && !s.eq_ignore_ascii_case("false"),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        };
    }
    truthy(value)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            VERIFIED_WORDS.contains(&s.as_str())
        }
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Object(map) => {
            NESTED_FLAG_KEYS
                .iter()
                .any(|k| map.get(*k).is_some_and(truthy))
                || map.get("status").is_some_and(truthy)
        }
        Value::Array(_) | Value::Null => false,
    }
}

/// `sql` string fields across all layers.
pub fn sql_statements(payload: &Value) -> Vec<String> {
    layers(payload)
        .into_iter()
        .filter_map(|layer| layer.get("sql").and_then(Value::as_str))
        .map(str::trim)
        .filter(|sql| !sql.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Search results across all layers, as citations.
pub fn citations(payload: &Value) -> Vec<Citation> {
    let mut out = Vec::new();
    for layer in layers(payload) {
        let results = layer
            .get("searchResults")
            .or_else(|| layer.get("search_results"))
            .and_then(Value::as_array);
        for result in results.into_iter().flatten() {
            if let Some(citation) = citation(result) {
                out.push(citation);
            }
        }
    }
    out
}

fn citation(result: &Value) -> Option<Citation> {
    let object = result.as_object()?;
    let text = object
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let doc_id = ["doc_id", "relative_path", "id"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_str))
        .map(ToOwned::to_owned);
    if text.is_empty() && doc_id.is_none() {
        return None;
    }
    Some(Citation {
        source_id: object.get("source_id").and_then(Value::as_i64),
        doc_id,
        title: object
            .get("doc_title")
            .or_else(|| object.get("title"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        text,
    })
}
