//! Markdown rendering of heterogeneous finding data
//!
//! Detector findings carry free-form values. The review site displays them
//! as text, so collection values collapse into human-readable markdown while
//! scalars pass through unchanged: lists become bulleted text, mappings
//! become `key: value` lines.

use serde_json::Value;

/// Render a value for upload
///
/// Scalars are returned as-is; arrays and objects are replaced by their
/// rendered text form.
pub fn as_markdown(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(render(value)),
        other => other.clone(),
    }
}

/// Render a whole data map for upload, value by value
pub fn as_markdown_map(
    data: &serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    data.iter()
        .map(|(key, value)| (key.clone(), as_markdown(value)))
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("* {}", render(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}: \n{}", key, render(value)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
