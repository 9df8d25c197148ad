//! Normalization of raw flow payloads.
//!
//! Flow fields reach the library in whatever shape the persistence layer
//! stored them: a native JSON object, a JSON document held as text, or nothing
//! at all. [`normalize_flow`] turns each of these into a [`MonetaryFlow`] and
//! never fails; anything it cannot read becomes an empty flow, and the
//! injected [`FlowDiagnostics`] is told why.

use crate::schema::{MonetaryFlow, NumericPolicy};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A flow field exactly as it was loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFlow {
    /// Absent, `null` or `undefined`.
    Missing,
    /// Serialized JSON text.
    Text(String),
    /// An already-decoded JSON value. A `Value::String` is treated as text.
    Value(Value),
}

impl From<Value> for RawFlow {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawFlow::Missing,
            Value::String(text) => RawFlow::Text(text),
            other => RawFlow::Value(other),
        }
    }
}

impl From<&Value> for RawFlow {
    fn from(value: &Value) -> Self {
        RawFlow::from(value.clone())
    }
}

impl From<&str> for RawFlow {
    fn from(text: &str) -> Self {
        RawFlow::Text(text.to_string())
    }
}

impl From<String> for RawFlow {
    fn from(text: String) -> Self {
        RawFlow::Text(text)
    }
}

impl<T: Into<RawFlow>> From<Option<T>> for RawFlow {
    fn from(raw: Option<T>) -> Self {
        raw.map(Into::into).unwrap_or(RawFlow::Missing)
    }
}

impl From<&MonetaryFlow> for RawFlow {
    fn from(flow: &MonetaryFlow) -> Self {
        RawFlow::Value(flow.to_json_value())
    }
}

impl From<BTreeMap<String, f64>> for RawFlow {
    fn from(entries: BTreeMap<String, f64>) -> Self {
        RawFlow::Value(Value::Object(
            entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        ))
    }
}

/// Receives the conditions normalization recovers from.
///
/// Implementations decide where the information goes; normalization itself
/// never logs directly.
pub trait FlowDiagnostics {
    /// Text input that is not valid JSON.
    fn malformed_text(&self, raw: &str, error: &serde_json::Error);

    /// Input that decoded to something other than a JSON object.
    fn unexpected_shape(&self, found: &'static str) {
        let _ = found;
    }

    /// An entry whose value could not be read as an amount and was counted as 0.
    fn non_numeric_value(&self, key: &str, value: &Value) {
        let _ = (key, value);
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl FlowDiagnostics for LogDiagnostics {
    fn malformed_text(&self, raw: &str, error: &serde_json::Error) {
        warn!(
            "Discarding malformed flow payload ({} bytes): {}",
            raw.len(),
            error
        );
    }

    fn unexpected_shape(&self, found: &'static str) {
        warn!("Flow payload is a JSON {} instead of an object, treating as empty", found);
    }

    fn non_numeric_value(&self, key: &str, value: &Value) {
        debug!("Flow entry '{}' has non-numeric value {}, counting as 0", key, value);
    }
}

/// Discards every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentDiagnostics;

impl FlowDiagnostics for SilentDiagnostics {
    fn malformed_text(&self, _raw: &str, _error: &serde_json::Error) {}
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads one entry value under `policy`, `None` when it does not count as an amount.
pub fn read_amount(value: &Value, policy: NumericPolicy) -> Option<f64> {
    match (value, policy) {
        (Value::Number(n), _) => n.as_f64().filter(|v| v.is_finite()),
        (Value::String(s), NumericPolicy::CoerceNumericStrings) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        _ => None,
    }
}

fn normalize_object(
    object: &Map<String, Value>,
    policy: NumericPolicy,
    diagnostics: &dyn FlowDiagnostics,
) -> MonetaryFlow {
    let mut flow = MonetaryFlow::new();
    for (key, value) in object {
        let amount = read_amount(value, policy).unwrap_or_else(|| {
            diagnostics.non_numeric_value(key, value);
            0.0
        });
        flow.insert(key.as_str(), amount);
    }
    flow
}

fn normalize_value(
    value: &Value,
    policy: NumericPolicy,
    diagnostics: &dyn FlowDiagnostics,
) -> MonetaryFlow {
    match value {
        Value::Object(object) => normalize_object(object, policy, diagnostics),
        Value::Null => MonetaryFlow::new(),
        other => {
            diagnostics.unexpected_shape(shape_name(other));
            MonetaryFlow::new()
        }
    }
}

/// Turns any raw flow into a [`MonetaryFlow`]. Never fails.
///
/// - missing input or empty text gives an empty flow;
/// - text is parsed as JSON, and a parse failure gives an empty flow;
/// - a decoded value that is not an object gives an empty flow;
/// - every object key is kept, with values that are not amounts set to 0.
///
/// Duplicate keys in JSON text resolve to the last occurrence.
pub fn normalize_flow(
    raw: &RawFlow,
    policy: NumericPolicy,
    diagnostics: &dyn FlowDiagnostics,
) -> MonetaryFlow {
    match raw {
        RawFlow::Missing => MonetaryFlow::new(),
        RawFlow::Text(text) if text.is_empty() => MonetaryFlow::new(),
        RawFlow::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => normalize_value(&value, policy, diagnostics),
            Err(e) => {
                diagnostics.malformed_text(text, &e);
                MonetaryFlow::new()
            }
        },
        RawFlow::Value(value) => normalize_value(value, policy, diagnostics),
    }
}
