//! Value normalization: coercing arbitrary collaborator data to safe,
//! length-bounded text.
//!
//! Collaborators (the exception introspector in particular) hand over
//! values of unknown shape and provenance - local variables, constructor
//! arguments, raw byte strings. [`to_text`] recursively coerces them into
//! plain [`serde_json::Value`] text, and [`shorten`] bounds every text
//! leaf to [`MAX_TEXT_LEN`] characters. The two compose: normalize to
//! text first, then shorten the decoded result - the truncation pass is
//! never applied to raw, undecoded input.

use serde_json::{Map, Value};

/// Placeholder substituted for byte strings that are not valid UTF-8.
pub const DECODING_PLACEHOLDER: &str = "(error decoding value)";

/// Marker appended to truncated text values.
pub const TRUNCATION_MARKER: &str = "...";

/// Maximum length (in characters) of a text leaf after [`shorten`].
pub const MAX_TEXT_LEN: usize = 500;

/// An arbitrary value as handed over by a collaborator.
///
/// This is the crate's boundary type for "whatever the runtime had in
/// hand": frame locals, exception constructor arguments, request extras.
/// Raw bytes are carried as-is; decoding happens during normalization so
/// a bad value degrades to a placeholder instead of failing the capture.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A byte string of unknown encoding; may not be valid UTF-8.
    Bytes(Vec<u8>),
    List(Vec<RawValue>),
    Map(Vec<(RawValue, RawValue)>),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Int(n)
    }
}

/// Recursively coerce a raw value to transport-safe text.
///
/// Maps recurse into their values with keys coerced to text; lists
/// recurse element-wise into a new ordered sequence; scalars become
/// text. Byte strings that fail UTF-8 decoding substitute
/// [`DECODING_PLACEHOLDER`]; non-finite floats cannot be rendered as a
/// number and fall back to their type name.
pub fn to_text(value: &RawValue) -> Value {
    match value {
        RawValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, val) in entries {
                map.insert(key_text(key), to_text(val));
            }
            Value::Object(map)
        }
        RawValue::List(items) => Value::Array(items.iter().map(to_text).collect()),
        scalar => Value::String(scalar_text(scalar)),
    }
}

/// Coerce a scalar to its text form.
fn scalar_text(value: &RawValue) -> String {
    match value {
        RawValue::Null => "null".to_string(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Int(n) => n.to_string(),
        RawValue::Float(f) => {
            if f.is_finite() {
                f.to_string()
            } else {
                // NaN and infinities have no portable text form.
                "float".to_string()
            }
        }
        RawValue::Text(s) => s.clone(),
        RawValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => DECODING_PLACEHOLDER.to_string(),
        },
        RawValue::List(_) | RawValue::Map(_) => {
            // Structural values used where a scalar is expected (map keys)
            // render as their compact JSON form.
            to_text(value).to_string()
        }
    }
}

/// Text form of a map key.
fn key_text(key: &RawValue) -> String {
    scalar_text(key)
}

/// Recursively truncate text leaves longer than [`MAX_TEXT_LEN`]
/// characters, appending [`TRUNCATION_MARKER`].
///
/// Structure is preserved; only string leaves are touched. Truncation
/// counts characters, not bytes, so multi-byte text is never split
/// mid-codepoint.
pub fn shorten(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(shorten_text(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(shorten).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, shorten(v))).collect())
        }
        other => other,
    }
}

fn shorten_text(s: String) -> String {
    if s.chars().count() <= MAX_TEXT_LEN {
        return s;
    }
    let mut truncated: String = s.chars().take(MAX_TEXT_LEN).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
