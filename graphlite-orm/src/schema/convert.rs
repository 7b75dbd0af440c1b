// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property type coercion
//!
//! Stores report property values in their own representation (integers for
//! whole floats, strings for timestamps, ...). Values read from a node are
//! coerced to the declared [`PropertyType`] before reaching an entity
//! constructor; values written keep their representation.

use super::metadata::PropertyType;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Coerce a stored value to the declared property type
///
/// `Null` always passes through; required-ness is checked by the mapper.
pub fn coerce(value: Value, ty: &PropertyType) -> OrmResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        PropertyType::Any => Ok(value),
        PropertyType::String => to_string(value),
        PropertyType::Integer => to_integer(value),
        PropertyType::Float => to_float(value),
        PropertyType::Boolean => to_boolean(value),
        PropertyType::DateTime => to_datetime(value),
        PropertyType::List(inner) => match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| coerce(item, inner))
                .collect::<OrmResult<Vec<_>>>()
                .map(Value::List),
            other => Ok(Value::List(vec![coerce(other, inner)?])),
        },
    }
}

fn conversion_error(value: &Value, target: &str) -> OrmError {
    OrmError::Mapping(format!(
        "cannot convert {} ({}) to {}",
        value.type_name(),
        value,
        target
    ))
}

fn to_string(value: Value) -> OrmResult<Value> {
    match value {
        Value::String(_) => Ok(value),
        Value::Integer(i) => Ok(Value::String(i.to_string())),
        Value::Float(f) => Ok(Value::String(f.to_string())),
        Value::Boolean(b) => Ok(Value::String(b.to_string())),
        Value::DateTime(dt) => Ok(Value::String(dt.to_rfc3339())),
        other => Err(conversion_error(&other, "String")),
    }
}

fn to_integer(value: Value) -> OrmResult<Value> {
    match value {
        Value::Integer(_) => Ok(value),
        // i64::MAX as f64 rounds up to 2^63, which is out of range
        Value::Float(f)
            if f.is_finite()
                && f.fract() == 0.0
                && f >= i64::MIN as f64
                && f < i64::MAX as f64 =>
        {
            Ok(Value::Integer(f as i64))
        }
        Value::Boolean(b) => Ok(Value::Integer(i64::from(b))),
        Value::String(ref s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| conversion_error(&value, "Integer")),
        other => Err(conversion_error(&other, "Integer")),
    }
}

fn to_float(value: Value) -> OrmResult<Value> {
    match value {
        Value::Float(_) => Ok(value),
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        Value::String(ref s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| conversion_error(&value, "Float")),
        other => Err(conversion_error(&other, "Float")),
    }
}

fn to_boolean(value: Value) -> OrmResult<Value> {
    match value {
        Value::Boolean(_) => Ok(value),
        Value::Integer(0) => Ok(Value::Boolean(false)),
        Value::Integer(1) => Ok(Value::Boolean(true)),
        Value::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(conversion_error(&value, "Boolean")),
        },
        other => Err(conversion_error(&other, "Boolean")),
    }
}

fn to_datetime(value: Value) -> OrmResult<Value> {
    match value {
        Value::DateTime(_) => Ok(value),
        // Unix seconds
        Value::Integer(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(Value::DateTime)
            .ok_or_else(|| conversion_error(&value, "DateTime")),
        Value::String(ref s) => parse_datetime(s)
            .map(Value::DateTime)
            .ok_or_else(|| conversion_error(&value, "DateTime")),
        other => Err(conversion_error(&other, "DateTime")),
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
