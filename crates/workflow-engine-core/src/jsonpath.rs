//! Dotted/bracketed JSON-path helper (component B).
//!
//! No external jsonpath crate is pulled in — the grammar this system needs
//! is a simple sequence of `.key` and `[index]` segments, so it is
//! hand-written the way the grammar's small enough to warrant.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z_][A-Za-z0-9_]*)|\[(\d+)\]").unwrap());

/// Read a value addressable by `path` (e.g. `$.foo.bar[0]`) from `doc`.
/// Missing paths yield `Value::Null`, never an error.
pub fn extract(doc: &Value, path: &str) -> Value {
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut current = doc;
    for cap in SEGMENT.captures_iter(path) {
        let next = if let Some(key) = cap.get(1) {
            current.get(key.as_str())
        } else if let Some(idx) = cap.get(2) {
            idx.as_str()
                .parse::<usize>()
                .ok()
                .and_then(|i| current.get(i))
        } else {
            None
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Is `leaf` itself a JSON-path reference (as opposed to a literal value)?
fn is_reference(leaf: &str) -> bool {
    leaf.starts_with('$')
}

/// Walk `params`, replacing each string leaf that is a JSON-path reference
/// with the value extracted from `doc`; non-reference leaves pass through
/// unchanged.
pub fn resolve(params: &Value, doc: &Value) -> Value {
    match params {
        Value::String(s) if is_reference(s) => extract(doc, s),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, doc)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, doc)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_reads_nested_and_indexed_values() {
        let doc = json!({"foo": "bar", "list": [1, 2, {"r": 42}]});
        assert_eq!(extract(&doc, "$.foo"), json!("bar"));
        assert_eq!(extract(&doc, "$.list[2].r"), json!(42));
    }

    #[test]
    fn extract_missing_path_is_null() {
        let doc = json!({"foo": "bar"});
        assert_eq!(extract(&doc, "$.missing.deep"), Value::Null);
    }

    #[test]
    fn resolve_replaces_only_reference_leaves() {
        let doc = json!({"foo": "bar"});
        let params = json!({"q": "$.foo", "literal": "unchanged", "n": 3});
        let resolved = resolve(&params, &doc);
        assert_eq!(resolved["q"], json!("bar"));
        assert_eq!(resolved["literal"], json!("unchanged"));
        assert_eq!(resolved["n"], json!(3));
    }
}
