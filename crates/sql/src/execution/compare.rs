//! Value comparison
//!
//! Relational comparison never fails. Values are compared by their natural
//! ordering when they belong to the same family, temporal values against
//! strings by parsing the string with the table's converter, and anything else
//! as decimal numbers. When none of these apply the values are incomparable.

use crate::types::{Converter, Value};
use std::cmp::Ordering;

/// Compares two values, returning None when either is NULL or they are
/// incomparable.
pub fn compare(left: &Value, right: &Value, converter: &Converter) -> Option<Ordering> {
    if left.is_null() || right.is_null() {
        return None;
    }
    if let Some(ordering) = natural_order(left, right) {
        return Some(ordering);
    }
    match (left, right) {
        (temporal, Value::Str(s)) if temporal.is_temporal() => {
            let parsed = converter.coerce_like(s, temporal)?;
            natural_order(temporal, &parsed)
        }
        (Value::Str(s), temporal) if temporal.is_temporal() => {
            let parsed = converter.coerce_like(s, temporal)?;
            natural_order(&parsed, temporal)
        }
        _ => {
            let (l, r) = (left.to_decimal()?, right.to_decimal()?);
            Some(l.cmp(&r))
        }
    }
}

/// Ordering of mutually comparable values.
fn natural_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        (Value::Bytea(l), Value::Bytea(r)) => Some(l.cmp(r)),
        (Value::Date(l), Value::Date(r)) => Some(l.cmp(r)),
        (Value::Time(l), Value::Time(r)) => Some(l.cmp(r)),
        (Value::Timestamp(l), Value::Timestamp(r)) => Some(l.cmp(r)),
        (Value::Date(l), Value::Timestamp(r)) => Some(l.and_time(Default::default()).cmp(r)),
        (Value::Timestamp(l), Value::Date(r)) => Some(l.cmp(&r.and_time(Default::default()))),
        (l, r) if l.is_integer() && r.is_integer() => Some(l.to_i64()?.cmp(&r.to_i64()?)),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            if l.is_float() || r.is_float() {
                l.to_f64()?.partial_cmp(&r.to_f64()?)
            } else {
                Some(l.to_decimal()?.cmp(&r.to_decimal()?))
            }
        }
        _ => None,
    }
}

/// Total order used by ORDER BY: NULLs sort first, incomparable values are
/// treated as equal so that a stable sort keeps their input order.
pub fn sort_order(left: &Value, right: &Value, converter: &Converter) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(left, right, converter).unwrap_or(Ordering::Equal),
    }
}
