//! Logical field values and the Rust type mapping behind them.

use crate::error::{OrmError, OrmResult};
use crate::types::SemanticType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A logical value held by a record field, a literal, or a parameter binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this value is its type's zero-equivalent.
    ///
    /// An unset field and a field explicitly set to `0`, `""` or `false` are
    /// indistinguishable here; the compiler treats both as "unset".
    pub fn is_default(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Real(r) => *r == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Uuid(u) => u.is_nil(),
            Value::Timestamp(t) => *t == DateTime::<Utc>::default(),
            Value::Json(j) => j.is_null(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Maps a Rust field type onto a semantic type and its logical [`Value`].
///
/// Implemented for the primitive types records are usually made of. The
/// `Record` derive relies on it to describe and read fields.
pub trait FieldType: Sized {
    /// Semantic type used to pick a type handler.
    fn semantic_type() -> SemanticType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> OrmResult<Self>;
}

fn unexpected<T>(expected: &str, got: &Value) -> OrmResult<T> {
    Err(OrmError::validation(format!(
        "expected {expected} value, got {}",
        got.kind()
    )))
}

macro_rules! impl_int_field_type {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                fn semantic_type() -> SemanticType {
                    SemanticType::Int
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> OrmResult<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|e| {
                            OrmError::validation(format!(
                                "{i} out of range for {}: {e}",
                                stringify!($ty)
                            ))
                        }),
                        other => unexpected("int", &other),
                    }
                }
            }
        )*
    };
}

impl_int_field_type!(i16, i32, i64, u16, u32);

impl FieldType for bool {
    fn semantic_type() -> SemanticType {
        SemanticType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => unexpected("bool", &other),
        }
    }
}

impl FieldType for f64 {
    fn semantic_type() -> SemanticType {
        SemanticType::Real
    }

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Int(i) => Ok(i as f64),
            other => unexpected("real", &other),
        }
    }
}

impl FieldType for f32 {
    fn semantic_type() -> SemanticType {
        SemanticType::Real
    }

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|r| r as f32)
    }
}

impl FieldType for String {
    fn semantic_type() -> SemanticType {
        SemanticType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => unexpected("text", &other),
        }
    }
}

impl FieldType for Uuid {
    fn semantic_type() -> SemanticType {
        SemanticType::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            other => unexpected("uuid", &other),
        }
    }
}

impl FieldType for DateTime<Utc> {
    fn semantic_type() -> SemanticType {
        SemanticType::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            other => unexpected("timestamp", &other),
        }
    }
}

impl FieldType for serde_json::Value {
    fn semantic_type() -> SemanticType {
        SemanticType::Json
    }

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Null => Ok(serde_json::Value::Null),
            other => unexpected("json", &other),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn semantic_type() -> SemanticType {
        T::semantic_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}
