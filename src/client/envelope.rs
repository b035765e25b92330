//! Response envelope handling.
//!
//! The API answers in several shapes: bare entities, bare arrays,
//! `{success, data}` envelopes and `{success, <key>, message}` for creates.
//! Everything is funnelled through [`normalize`] before decoding.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ClientError;

/// Unwrap a `{success, data}` envelope.
///
/// A body with a boolean `success` yields its `data` when present and
/// non-null, otherwise the whole body. Any other body is returned as-is.
pub fn normalize(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
            let has_data = map.get("data").is_some_and(|d| !d.is_null());
            if has_data {
                map.remove("data").unwrap_or(Value::Null)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

/// Normalize, then take the entity stored under `key` if there is one.
pub fn extract_keyed(body: Value, key: &str) -> Value {
    match normalize(body) {
        Value::Object(mut map) if map.get(key).is_some_and(|v| !v.is_null()) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(value)?)
}

/// User-facing message carried by an error body, if any.
///
/// `error` wins over `message`; an `error` object contributes its own
/// `message` field.
pub fn error_message(body: &Value) -> Option<String> {
    let from_error = match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    from_error
        .or_else(|| body.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
}

/// Server revision attached to an enveloped response.
pub fn revision_id(body: &Value) -> Option<i64> {
    body.get("revisionId").and_then(Value::as_i64)
}
