//! Field normalisation at the store boundary.
//!
//! Stored records were written by several generations of clients, so the
//! same field can arrive as `true` or `"true"`, a timestamp as an integer or
//! a float, and an unset string as `""` or `null`. These deserialisers fold
//! each into a single typed representation so the rest of the crate never
//! sees the alternatives.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `true`, `"true"` and non-zero numbers are true; everything else is false.
pub fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(truthy(&value))
}

/// Only an explicit `false` (or `"false"`) switches a flag off.
///
/// Feature flags and `siteEnabled` treat absence as enabled.
pub fn enabled_unless_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(!matches!(value, Value::Bool(false)) && value.as_str() != Some("false"))
}

/// Empty strings and `null` become `None`.
pub fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Epoch milliseconds from an integer, a float or a numeric string.
pub fn epoch_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

/// Truthiness used for flags stored by older clients.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}
