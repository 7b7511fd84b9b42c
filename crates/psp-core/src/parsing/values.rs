use crate::error::PspError;
use crate::layout::schema::{CoercionPolicy, ValueKind};
use crate::model::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Cell texts that stand for "no value" in a numeric column.
const EMPTY_MARKERS: [&str; 5] = ["", "-", "n/a", "null", "nan"];

/// Coerce a cell according to the declared kind of its column.
pub fn coerce(cell: Option<&str>, kind: ValueKind, policy: CoercionPolicy) -> Option<Value> {
    match kind {
        ValueKind::Number => coerce_number(cell?, policy),
        ValueKind::Text => coerce_text(cell?),
    }
}

/// Parse a numeric cell.
///
/// Handles formats like:
/// - "1,234.5" -> 1234.5
/// - "-12" -> -12
/// - "14:30" -> null (a time of day is not a quantity)
/// - "-" -> null, or the text "-" under `keep_dash`
/// - "N/A", "nan", "null", "" -> null
pub fn coerce_number(cell: &str, policy: CoercionPolicy) -> Option<Value> {
    let s = cell.trim();

    if policy == CoercionPolicy::KeepDash && (s == "-" || s == "--") {
        return Some(Value::Text(s.to_string()));
    }

    if s.contains(':') {
        tracing::debug!(cell = s, "time-like value in numeric column");
        return None;
    }

    let s = s.replace(',', "");
    let lowered = s.to_lowercase();
    if EMPTY_MARKERS.contains(&lowered.as_str()) {
        return None;
    }

    match parse_decimal(&s) {
        Ok(d) => Some(Value::Number(d)),
        Err(e) => {
            tracing::debug!("{e}");
            None
        }
    }
}

/// Trimmed text, or null when nothing is left.
pub fn coerce_text(cell: &str) -> Option<Value> {
    let s = cell.trim();
    if s.is_empty() {
        None
    } else {
        Some(Value::Text(s.to_string()))
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, PspError> {
    Decimal::from_str(s)
        .map_err(|e| PspError::Extraction(format!("invalid number '{}': {}", s, e)))
}
