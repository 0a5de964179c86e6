//! Lenient field access over provider payloads.
//!
//! A missing or mistyped field falls back to a default and never fails the
//! item: the worst case is an item rendered with empty text.

use interfaces::ContentKind;
use serde_json::Value;
use tracing::debug;

/// Non-empty string field.
pub fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Identifier that providers send either as a number or a string.
pub fn native_id(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Namespaced id, degrading to a random one when the source gives no
/// stable identifier. Random ids do not survive reloads.
pub fn item_id(kind: ContentKind, native: Option<String>) -> String {
    match native {
        Some(native) => kind.item_id(&native),
        None => {
            let fallback = uuid::Uuid::new_v4().to_string();
            debug!("{} item without a stable identifier, using {}", kind, fallback);
            kind.item_id(&fallback)
        }
    }
}

/// The array under `key`, or nothing when the payload has another shape.
pub fn entries<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}
