//! Canonical JSON serialization
//!
//! The checksum embedded in an ASL payload is only reproducible if every
//! party serializes the same record to the same bytes. The writer here does
//! that explicitly instead of relying on the map type's iteration order:
//!
//! - object keys are sorted by ordinal (byte-value) comparison, ascending,
//!   at every nesting level
//! - arrays keep the caller's element order
//! - no insignificant whitespace
//! - strings use standard JSON escaping
//! - integral floats inside ±2^53 render as integers, other floats in their
//!   shortest round-trip form
//! - output is UTF-8 without a byte-order mark

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Maximum nesting depth accepted by the canonical writer.
pub const MAX_DEPTH: usize = 64;

/// 2^53, the largest float range in which every integer is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("nesting depth {depth} exceeds limit {MAX_DEPTH}")]
    MaxDepthExceeded { depth: usize },

    #[error("value cannot be represented as JSON: {message}")]
    Unrepresentable { message: String },
}

impl From<serde_json::Error> for CanonicalError {
    fn from(err: serde_json::Error) -> Self {
        CanonicalError::Unrepresentable {
            message: err.to_string(),
        }
    }
}

/// Serialize a JSON value to its canonical text form.
pub fn canonicalize(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

/// Serialize a JSON value to canonical UTF-8 bytes (no BOM).
pub fn canonicalize_to_bytes(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    canonicalize(value).map(String::into_bytes)
}

/// Project any serializable value to JSON and canonicalize it.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value)?;
    canonicalize(&value)
}

/// Re-canonicalize a JSON document given as text.
pub fn canonicalize_str(json: &str) -> Result<String, CanonicalError> {
    let value: Value = serde_json::from_str(json)?;
    canonicalize(&value)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), CanonicalError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalError::MaxDepthExceeded { depth });
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => write_number(out, number),
        Value::String(text) => write_string(out, text)?,
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map, depth)?,
    }
    Ok(())
}

fn write_object(
    out: &mut String,
    map: &Map<String, Value>,
    depth: usize,
) -> Result<(), CanonicalError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_unstable_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    out.push('{');
    for (index, (key, value)) in entries.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_string(out, key)?;
        out.push(':');
        write_value(out, value, depth + 1)?;
    }
    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, text: &str) -> Result<(), CanonicalError> {
    out.push_str(&serde_json::to_string(text)?);
    Ok(())
}

fn write_number(out: &mut String, number: &Number) {
    if number.is_i64() || number.is_u64() {
        out.push_str(&number.to_string());
        return;
    }

    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < MAX_SAFE_INTEGER => {
            // Exact: |float| < 2^53 and integral.
            out.push_str(&(float as i64).to_string());
        }
        _ => out.push_str(&number.to_string()),
    }
}
