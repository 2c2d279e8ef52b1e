//! Value coercion between raw cell text and typed values.
//!
//! Two independent directions:
//!
//! - **read**: [`coerce`] turns the text of a cell into a [`Value`], either
//!   by inference (empty hint, used for [`Row`](crate::Row) destinations) or
//!   by dispatching on the field's declared type name.
//! - **write**: [`to_literal`] renders a [`Value`] as an SQL literal that is
//!   embedded directly in statement text.
//!
//! The two are not inverses. Booleans are written as bare `true`/`false`
//! but read back as `true` only from the text `"1"`, and the inferred
//! timestamp path only accepts years after 1900 while the hinted path
//! accepts any year above zero.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::error::CoerceError;
use crate::value::{RawCell, Timestamp, Value};

/// Layout of the fallback timestamp format, `yyyy-MM-dd HH:mm:ss`.
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Earliest year (exclusive) accepted by the inferred timestamp path.
const INFERRED_MIN_YEAR: i32 = 1900;

/// Earliest year (exclusive) accepted by the hinted timestamp path.
const HINTED_MIN_YEAR: i32 = 0;

/// Normalizes a wire cell to text. NULLs and undecodable bytes become `""`.
pub fn normalize_cell(cell: RawCell) -> String {
    match cell {
        RawCell::Null => String::new(),
        RawCell::Integer(v) => v.to_string(),
        RawCell::Real(v) => v.to_string(),
        RawCell::Text(bytes) | RawCell::Blob(bytes) => String::from_utf8(bytes).unwrap_or_default(),
    }
}

/// Converts raw cell text into a typed value.
///
/// With an empty `hint` the type is inferred, in order: `"0"` is integer
/// zero, `""` stays empty text, a non-zero number is a float, then an
/// RFC 3339 timestamp, then a `yyyy-MM-dd HH:mm:ss` timestamp after 1900,
/// and anything else is kept as text.
///
/// With a hint, the lowercase prefix selects the conversion: `float32` /
/// `float64`, `int*` (but not `interface`), `time*`, `bool*` (true only for
/// `"1"`), or text. Empty raw text yields the zero value of the hinted type.
///
/// # Errors
///
/// Returns [`CoerceError::Invalid`] when hinted numeric or timestamp text
/// cannot be parsed.
///
/// # Examples
///
/// ```
/// use rowmap_core::{Value, coerce};
///
/// assert_eq!(coerce("0", "").unwrap(), Value::Int(0));
/// assert_eq!(coerce("3.1400", "").unwrap(), Value::Float(3.14));
/// assert_eq!(coerce("1", "bool").unwrap(), Value::Bool(true));
/// ```
pub fn coerce(raw: &str, hint: &str) -> Result<Value, CoerceError> {
    if hint.is_empty() {
        return Ok(infer(raw));
    }

    let hint = hint.to_lowercase();
    if hint.starts_with("float32") || hint.starts_with("float64") {
        if raw.is_empty() {
            return Ok(Value::Float(0.0));
        }
        parse_float(raw)
            .map(Value::Float)
            .ok_or_else(|| invalid("float", raw))
    } else if hint.starts_with("int") && !hint.starts_with("interface") {
        if raw.is_empty() {
            return Ok(Value::Int(0));
        }
        parse_int(raw)
            .map(Value::Int)
            .ok_or_else(|| invalid("integer", raw))
    } else if hint.starts_with("time") {
        if raw.is_empty() {
            return Ok(Value::Timestamp(zero_timestamp()));
        }
        parse_rfc3339(raw)
            .or_else(|| parse_layout(raw).filter(|dt| dt.year() > HINTED_MIN_YEAR))
            .map(Value::Timestamp)
            .ok_or_else(|| invalid("timestamp", raw))
    } else if hint.starts_with("bool") {
        Ok(Value::Bool(raw == "1"))
    } else {
        Ok(Value::Text(raw.to_string()))
    }
}

fn infer(raw: &str) -> Value {
    if raw == "0" {
        return Value::Int(0);
    }
    if raw.is_empty() {
        return Value::Text(String::new());
    }
    if let Some(f) = parse_float(raw).filter(|f| *f != 0.0) {
        return Value::Float(f);
    }
    if let Some(dt) = parse_rfc3339(raw) {
        return Value::Timestamp(dt);
    }
    if let Some(dt) = parse_layout(raw).filter(|dt| dt.year() > INFERRED_MIN_YEAR) {
        return Value::Timestamp(dt);
    }
    Value::Text(raw.to_string())
}

/// Parses a float and rounds it to 4 decimals.
fn parse_float(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .map(|f| (f * 10_000.0).round() / 10_000.0)
}

/// Parses an integer, accepting decimal text by rounding it.
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    })
}

fn parse_rfc3339(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_layout(raw: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(raw, DATETIME_LAYOUT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// `0001-01-01 00:00:00 UTC`, the value of an empty hinted timestamp.
pub fn zero_timestamp() -> Timestamp {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

fn invalid(kind: &'static str, raw: &str) -> CoerceError {
    CoerceError::Invalid {
        kind,
        raw: raw.to_string(),
    }
}

/// Renders a value as an SQL literal.
///
/// Integers are plain digits, floats have six decimals, timestamps are
/// quoted `'yyyy-MM-dd HH:mm:ss'`, booleans are the bare tokens `true` and
/// `false`, and text is single-quoted with embedded quotes doubled.
/// [`Value::Other`] is rendered as quoted JSON.
///
/// # Examples
///
/// ```
/// use rowmap_core::{Value, to_literal};
///
/// assert_eq!(to_literal(&Value::Float(20.37)), "20.370000");
/// assert_eq!(to_literal(&Value::from("O'Brien")), "'O''Brien'");
/// ```
pub fn to_literal(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format!("{v:.6}"),
        Value::Timestamp(v) => format!("'{}'", v.format(DATETIME_LAYOUT)),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Text(v) => quote(v),
        Value::Other(v) => quote(&v.to_string()),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
