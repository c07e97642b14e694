//! # Heap-Owned Value Representation
//!
//! `OwnedValue` owns its data and is used for in-memory result sets (see
//! `MemoryProducer`) and for values read back out of a window.
//!
//! ## Conversion
//!
//! ```ignore
//! // Value -> OwnedValue (always works, may allocate)
//! let owned: OwnedValue = (&value).into();
//!
//! // OwnedValue -> Value (borrows from owned)
//! let borrowed: Value<'_> = owned.to_value();
//! ```

use std::borrow::Cow;

use super::{FieldType, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum OwnedValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl<'a> From<&Value<'a>> for OwnedValue {
    fn from(v: &Value<'a>) -> Self {
        match v {
            Value::Null => OwnedValue::Null,
            Value::Int(i) => OwnedValue::Int(*i),
            Value::Float(f) => OwnedValue::Float(*f),
            Value::Text(s) => OwnedValue::Text(s.to_string()),
            Value::Blob(b) => OwnedValue::Blob(b.to_vec()),
        }
    }
}

impl<'a> From<Value<'a>> for OwnedValue {
    fn from(v: Value<'a>) -> Self {
        OwnedValue::from(&v)
    }
}

impl From<i64> for OwnedValue {
    fn from(v: i64) -> Self {
        OwnedValue::Int(v)
    }
}

impl From<f64> for OwnedValue {
    fn from(v: f64) -> Self {
        OwnedValue::Float(v)
    }
}

impl From<&str> for OwnedValue {
    fn from(v: &str) -> Self {
        OwnedValue::Text(v.to_string())
    }
}

impl From<String> for OwnedValue {
    fn from(v: String) -> Self {
        OwnedValue::Text(v)
    }
}

impl From<Vec<u8>> for OwnedValue {
    fn from(v: Vec<u8>) -> Self {
        OwnedValue::Blob(v)
    }
}

impl OwnedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, OwnedValue::Null)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            OwnedValue::Null => FieldType::Null,
            OwnedValue::Int(_) => FieldType::Integer,
            OwnedValue::Float(_) => FieldType::Float,
            OwnedValue::Text(_) => FieldType::String,
            OwnedValue::Blob(_) => FieldType::Blob,
        }
    }

    /// Converts to a borrowed Value.
    pub fn to_value(&self) -> Value<'_> {
        match self {
            OwnedValue::Null => Value::Null,
            OwnedValue::Int(i) => Value::Int(*i),
            OwnedValue::Float(f) => Value::Float(*f),
            OwnedValue::Text(s) => Value::Text(Cow::Borrowed(s.as_str())),
            OwnedValue::Blob(b) => Value::Blob(Cow::Borrowed(b.as_slice())),
        }
    }
}
