//! Built-in type handlers.

use super::{Modifiers, TypeFamily, TypeHandler};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

fn mismatch<T>(handler: &str, value: &Value) -> OrmResult<T> {
    Err(OrmError::validation(format!(
        "{handler} handler cannot convert a {} value",
        value.kind()
    )))
}

/// Booleans are stored as `0` / `1` integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolHandler;

impl TypeHandler for BoolHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Boolean
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.boolean.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Null => Ok(Value::Null),
            other => mismatch("bool", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Null => Ok(Value::Null),
            other => mismatch("bool", other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntHandler;

impl TypeHandler for IntHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.integer.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Int(_) | Value::Null => Ok(value.clone()),
            other => mismatch("int", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        self.serialize(value)
    }
}

/// Real numbers: floating point by default, fixed-point when a precision or
/// currency modifier is present (explicit precision first).
#[derive(Debug, Clone, Copy, Default)]
pub struct RealHandler;

impl TypeHandler for RealHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn storage_type(&self, dialect: &Dialect, modifiers: &Modifiers) -> String {
        match modifiers.decimal_precision() {
            Some(p) => format!("DECIMAL({}, {})", p.total, p.fractional),
            None => dialect.types.real.to_string(),
        }
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Real(r) if !r.is_finite() => Err(OrmError::validation(format!(
                "non-finite real {r} cannot be stored"
            ))),
            Value::Real(_) | Value::Null => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Real(*i as f64)),
            other => mismatch("real", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Real(_) | Value::Null => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Real(*i as f64)),
            other => mismatch("real", other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextHandler;

impl TypeHandler for TextHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Text
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.text.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Text(_) | Value::Null => Ok(value.clone()),
            other => mismatch("text", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        self.serialize(value)
    }
}

/// Reference to another row's identity: an integer id where `0` means "none".
#[derive(Debug, Clone, Copy, Default)]
pub struct RefHandler;

impl TypeHandler for RefHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.integer.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Int(0) | Value::Null => Ok(Value::Null),
            Value::Int(_) => Ok(value.clone()),
            other => mismatch("ref", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Int(_) | Value::Null => Ok(value.clone()),
            other => mismatch("ref", other),
        }
    }
}

/// UUIDs travel as their hyphenated text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidHandler;

impl TypeHandler for UuidHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Identifier
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.uuid.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Uuid(u) => Ok(Value::Text(u.hyphenated().to_string())),
            Value::Text(_) | Value::Null => Ok(value.clone()),
            other => mismatch("uuid", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Text(s) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|e| OrmError::validation(format!("invalid uuid '{s}': {e}"))),
            Value::Uuid(_) | Value::Null => Ok(value.clone()),
            other => mismatch("uuid", other),
        }
    }
}

/// Timestamps travel as RFC 3339 text in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampHandler;

impl TypeHandler for TimestampHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Temporal
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.timestamp.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Timestamp(t) => Ok(Value::Text(t.to_rfc3339_opts(SecondsFormat::Micros, true))),
            Value::Text(_) | Value::Null => Ok(value.clone()),
            other => mismatch("timestamp", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|e| OrmError::validation(format!("invalid timestamp '{s}': {e}"))),
            Value::Timestamp(_) | Value::Null => Ok(value.clone()),
            other => mismatch("timestamp", other),
        }
    }
}

/// JSON documents travel as serialized text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

impl TypeHandler for JsonHandler {
    fn family(&self) -> TypeFamily {
        TypeFamily::Document
    }

    fn storage_type(&self, dialect: &Dialect, _modifiers: &Modifiers) -> String {
        dialect.types.json.to_string()
    }

    fn serialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Json(serde_json::Value::Null) | Value::Null => Ok(Value::Null),
            Value::Json(j) => serde_json::to_string(j)
                .map(Value::Text)
                .map_err(|e| OrmError::validation(format!("json serialization failed: {e}"))),
            Value::Text(_) => Ok(value.clone()),
            other => mismatch("json", other),
        }
    }

    fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Text(s) => serde_json::from_str(s)
                .map(Value::Json)
                .map_err(|e| OrmError::validation(format!("invalid json document: {e}"))),
            Value::Json(_) | Value::Null => Ok(value.clone()),
            other => mismatch("json", other),
        }
    }
}
