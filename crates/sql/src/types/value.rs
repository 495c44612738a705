//! Typed SQL values produced from raw fields and by expression evaluation

use crate::types::DataType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A row of values, one per output or source column
pub type Row = Vec<Value>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    // Integer types
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    // Float types
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(String),
    // Date/Time types
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Bytea(Vec<u8>),
}

impl Value {
    /// Create a string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is any integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::I8(_) | Value::I16(_) | Value::I32(_) | Value::I64(_)
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || matches!(self, Value::Decimal(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Time(_) | Value::Timestamp(_))
    }

    /// The type of this value, or None for NULL.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Bool,
            Value::I8(_) => DataType::I8,
            Value::I16(_) => DataType::I16,
            Value::I32(_) => DataType::I32,
            Value::I64(_) => DataType::I64,
            Value::F32(_) => DataType::F32,
            Value::F64(_) => DataType::F64,
            Value::Decimal(_) => DataType::Decimal,
            Value::Str(_) => DataType::Str,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Bytea(_) => DataType::Bytea,
        })
    }

    /// Widens any integer to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Decimal(d) => d.to_string().parse().ok(),
            Value::Str(s) => s.trim().parse().ok(),
            v => v.to_i64().map(|i| i as f64),
        }
    }

    /// Interprets the value as a decimal number. Strings are parsed, which is
    /// what lets `'10' > 9` compare numerically.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::F32(v) => Decimal::from_f32(*v),
            Value::F64(v) => Decimal::from_f64(*v),
            Value::Str(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            }
            v => v.to_i64().map(Decimal::from),
        }
    }

    /// Truthiness used by WHERE and HAVING: only TRUE passes.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// The textual form used by LIKE, concatenation and string functions.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Str(s) => Some(s.clone()),
            Value::Bytea(b) => Some(String::from_utf8_lossy(b).into_owned()),
            v => Some(v.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I8(i) => write!(f, "{}", i),
            Value::I16(i) => write!(f, "{}", i),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::Bytea(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

/// Equality by value for all types, including Null and NaN, so that values
/// can be used as group keys and DISTINCT set members. SQL semantics for NULL
/// are applied by expression evaluation, not here.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::I8(l), Value::I8(r)) => l == r,
            (Value::I16(l), Value::I16(r)) => l == r,
            (Value::I32(l), Value::I32(r)) => l == r,
            (Value::I64(l), Value::I64(r)) => l == r,
            (Value::F32(l), Value::F32(r)) => f32_bits(*l) == f32_bits(*r),
            (Value::F64(l), Value::F64(r)) => f64_bits(*l) == f64_bits(*r),
            (Value::Decimal(l), Value::Decimal(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Date(l), Value::Date(r)) => l == r,
            (Value::Time(l), Value::Time(r)) => l == r,
            (Value::Timestamp(l), Value::Timestamp(r)) => l == r,
            (Value::Bytea(l), Value::Bytea(r)) => l == r,
            (_, _) => false,
        }
    }
}

impl Eq for Value {}

// Bit patterns with -0.0 folded into 0.0.
fn f32_bits(f: f32) -> u32 {
    if f == 0.0 {
        0.0f32.to_bits()
    } else {
        f.to_bits()
    }
}

fn f64_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::F32(v) => f32_bits(*v).hash(state),
            Value::F64(v) => f64_bits(*v).hash(state),
            // Decimal's Hash is consistent with its Eq across scales
            Value::Decimal(v) => v.hash(state),
            Value::Str(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::Bytea(v) => v.hash(state),
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
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}
