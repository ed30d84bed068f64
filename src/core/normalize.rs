//! Canonical strings and lists out of heterogeneous record-store values.
//!
//! A logical field may arrive as a native list (linked/rollup fields) or as a
//! comma-joined string depending on how the base is set up, so readers here
//! accept both shapes and never fail: bad input degrades to `""` or `[]`.

use serde_json::Value;
use std::collections::HashMap;

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => join_non_empty(items),
        // 協作者 / 連結物件通常帶有 name
        Value::Object(obj) => match obj.get("name") {
            Some(Value::String(name)) => name.trim().to_string(),
            _ => value.to_string(),
        },
    }
}

fn join_non_empty(items: &[Value]) -> String {
    items
        .iter()
        .map(stringify)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn scalar_of(fields: &HashMap<String, Value>, key: &str, default: &str) -> String {
    match fields.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(value) => stringify(value),
    }
}

pub fn list_of(fields: &HashMap<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        Some(other) => {
            let token = stringify(other);
            if token.is_empty() {
                Vec::new()
            } else {
                vec![token]
            }
        }
    }
}

/// Percent for display.
///
/// Numbers in `[0, 1]` are taken as fractions and scaled by 100; anything else
/// numeric is assumed to already be a percentage. A genuine score below 1% is
/// indistinguishable from a fraction here. Strings with an explicit `%` suffix
/// are never scaled.
pub fn format_percent(value: Option<&Value>) -> String {
    let (number, explicit_percent) = match value {
        Some(Value::Number(n)) => (n.as_f64(), false),
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(stripped) => (stripped.trim().parse::<f64>().ok(), true),
                None => (s.parse::<f64>().ok(), false),
            }
        }
        Some(Value::Array(items)) => return format_percent(items.first()),
        _ => (None, false),
    };

    match number {
        Some(n) if n.is_finite() => {
            let scaled = if !explicit_percent && (0.0..=1.0).contains(&n) {
                n * 100.0
            } else {
                n
            };
            format_decimal(scaled)
        }
        _ => String::new(),
    }
}

/// One decimal place, without a trailing `.0`.
pub fn format_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}
