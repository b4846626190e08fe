//! Helpers for the JSON-like documents carried by examples.
//!
//! Scripts, inputs and expected outputs are held as [`serde_json::Value`].
//! Comparison goes through [`documents_equal`] rather than `==` because
//! interpreters are free to print `3.0` where the book wrote `3`.

use serde_json::{Map, Number, Value};

/// Structural equality of two documents.
///
/// * objects are equal when they have the same key set and every member is
///   equal; member order is irrelevant.
/// * arrays are equal when they have the same length and are pairwise equal
///   in order.
/// * numbers are compared by value, so integer and float spellings of the
///   same number match.
/// * documents of different kinds are never equal.
pub fn documents_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| documents_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => objects_equal(a, b),
        _ => false,
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, x)| b.get(key).is_some_and(|y| documents_equal(x, y)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (integer_value(a), integer_value(b)) {
        (Some(x), Some(y)) => x == y,
        (Some(x), None) => float_matches_integer(b, x),
        (None, Some(y)) => float_matches_integer(a, y),
        (None, None) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn integer_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// A float equals an integer only when it is integral and converts back to
/// exactly that integer.
fn float_matches_integer(float: &Number, integer: i128) -> bool {
    match float.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 2f64.powi(127) => f as i128 == integer,
        _ => false,
    }
}

/// Whether a document counts as "no data".
///
/// Null, `{}`, `[]` and `""` are empty. An empty input is never written to
/// disk and never passed to the interpreter.
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Normalize a script given either as a structured document or as text.
///
/// Text that parses as JSON becomes that document; anything else is kept
/// verbatim as a string document.
pub fn normalize_script(raw: Value) -> Value {
    match raw {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// Pretty JSON with two-space indentation, as written to every `.json` file.
pub fn to_pretty_json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Single-line rendering used in reports and pages: `{"op": "add"}` style.
pub fn to_compact_json(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(to_compact_json).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), to_compact_json(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        scalar => scalar.to_string(),
    }
}
