//! Typed reads from raw JSON objects.
//!
//! Absent and `null` fields read as the zero value of their type. Anything
//! else that does not fit is reported as malformed.

use crate::error::AnalyticsError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

pub(crate) type Object = Map<String, Value>;

/// Short name of a JSON value's type, for error messages.
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn object<'a>(value: &'a Value, field: &str) -> Result<&'a Object, AnalyticsError> {
    value
        .as_object()
        .ok_or_else(|| AnalyticsError::malformed(field, format!("expected an object, got {}", kind(value))))
}

/// A non-negative integer count. Integral floats such as `5.0` are accepted.
pub(crate) fn count(obj: &Object, field: &str) -> Result<u64, AnalyticsError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| {
                AnalyticsError::malformed(field, format!("expected a non-negative integer, got {}", n))
            }),
        Some(other) => Err(AnalyticsError::malformed(
            field,
            format!("expected a number, got {}", kind(other)),
        )),
    }
}

/// Converts through the number's shortest textual form so `3456.78` stays
/// exactly `3456.78` instead of picking up binary float noise.
fn number_to_decimal(n: &Number, field: &str) -> Result<Decimal, AnalyticsError> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| AnalyticsError::malformed(field, format!("number {} out of range: {}", text, e)))
}

pub(crate) fn decimal(obj: &Object, field: &str) -> Result<Decimal, AnalyticsError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(value) => required_decimal(value, field),
    }
}

pub(crate) fn required_decimal(value: &Value, field: &str) -> Result<Decimal, AnalyticsError> {
    match value {
        Value::Number(n) => number_to_decimal(n, field),
        other => Err(AnalyticsError::malformed(
            field,
            format!("expected a number, got {}", kind(other)),
        )),
    }
}

pub(crate) fn text(obj: &Object, field: &str) -> Result<String, AnalyticsError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AnalyticsError::malformed(
            field,
            format!("expected a string, got {}", kind(other)),
        )),
    }
}

/// An array field; absent or `null` reads as empty.
pub(crate) fn array<'a>(obj: &'a Object, field: &str) -> Result<&'a [Value], AnalyticsError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(AnalyticsError::malformed(
            field,
            format!("expected an array, got {}", kind(other)),
        )),
    }
}

/// A mandatory `YYYY-MM-DD` date.
pub(crate) fn date(obj: &Object, field: &str) -> Result<NaiveDate, AnalyticsError> {
    match obj.get(field) {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| AnalyticsError::malformed(field, format!("invalid date '{}': {}", s, e))),
        Some(other) => Err(AnalyticsError::malformed(
            field,
            format!("expected a date string, got {}", kind(other)),
        )),
        None => Err(AnalyticsError::malformed(field, "missing")),
    }
}
