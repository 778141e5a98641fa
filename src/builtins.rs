//! Ready-made parsers and validators
//!
//! Parsers are best-effort: they return `None` when the value cannot be
//! converted, leaving the type check to report the mismatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::error::{BoxError, Result, SchemaError};
use crate::field::{FieldContext, Parser, Validator};
use crate::value::Value;

/// Failures raised by the built-in validators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("{path}: `{value}` does not match /{pattern}/")]
    PatternMismatch { path: String, value: String, pattern: String },

    #[error("{path}: value must not be empty")]
    Empty { path: String },

    #[error("{path}: expected text, got {actual}")]
    NotText { path: String, actual: String },
}

// i64 range as floats; the upper bound 2^63 itself is out of range
const I64_LOW: f64 = -9_223_372_036_854_775_808.0;
const I64_HIGH: f64 = 9_223_372_036_854_775_808.0;

/// Integers from numeric strings, whole floats and booleans
pub fn to_int() -> Parser {
    Arc::new(|value: &Value| match value {
        Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Int),
        Value::Float(f) if f.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(f) => Some(Value::Int(*f as i64)),
        Value::Bool(b) => Some(Value::Int(i64::from(*b))),
        _ => None,
    })
}

/// Floats from numeric strings and integers
pub fn to_float() -> Parser {
    Arc::new(|value: &Value| match value {
        Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Float),
        Value::Int(i) => Some(Value::Float(*i as f64)),
        _ => None,
    })
}

/// Display form of any scalar
pub fn to_str() -> Parser {
    Arc::new(|value: &Value| match value {
        Value::Null | Value::List(_) | Value::Map(_) | Value::Record(_) => None,
        Value::Bytes(bytes) => String::from_utf8(bytes.clone()).ok().map(Value::Str),
        other => Some(Value::Str(other.to_string())),
    })
}

/// Timestamps from RFC 3339 strings and unix seconds
pub fn to_datetime() -> Parser {
    Arc::new(|value: &Value| match value {
        Value::Str(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0).map(Value::DateTime),
        _ => None,
    })
}

/// Look up a built-in parser by name
pub fn parser(name: &str) -> Option<Parser> {
    match name {
        "to_int" => Some(to_int()),
        "to_float" => Some(to_float()),
        "to_str" => Some(to_str()),
        "to_datetime" => Some(to_datetime()),
        _ => None,
    }
}

/// Reject strings that do not match `pattern` anywhere.
///
/// Anchor the pattern to require a full match.
pub fn matches(pattern: &str) -> Result<Validator> {
    let regex =
        Regex::new(pattern).map_err(|e| SchemaError::definition(format!("invalid pattern `{}`: {}", pattern, e)))?;

    Ok(Arc::new(move |ctx: &FieldContext<'_>, value: Value| -> std::result::Result<Value, BoxError> {
        let path = format!("{}#{}", ctx.schema, ctx.field);
        let Value::Str(s) = &value else {
            return Err(RuleViolation::NotText {
                path,
                actual: value.kind(),
            }
            .into());
        };
        if !regex.is_match(s) {
            return Err(RuleViolation::PatternMismatch {
                path,
                value: s.clone(),
                pattern: regex.as_str().to_string(),
            }
            .into());
        }
        Ok(value)
    }))
}

/// Reject empty strings, byte strings, lists and maps
pub fn non_empty() -> Validator {
    Arc::new(|ctx: &FieldContext<'_>, value: Value| -> std::result::Result<Value, BoxError> {
        match value.length() {
            Some(0) => Err(RuleViolation::Empty {
                path: format!("{}#{}", ctx.schema, ctx.field),
            }
            .into()),
            _ => Ok(value),
        }
    })
}
