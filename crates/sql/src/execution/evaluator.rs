//! Expression evaluation
//!
//! Evaluates planned expressions against an [`Environment`]: the current row,
//! the bound parameters, the aggregate values of the current group and the
//! converter used for temporal comparisons.

use super::compare::compare;
use super::like::like;
use crate::error::{Error, Result};
use crate::types::{Converter, Expression, ScalarFunction, Value};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

/// Everything an expression can refer to during evaluation.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub row: &'a [Value],
    pub params: &'a [Value],
    pub aggregates: &'a [Value],
    pub converter: &'a Converter,
}

impl<'a> Environment<'a> {
    pub fn new(row: &'a [Value], params: &'a [Value], converter: &'a Converter) -> Self {
        Self {
            row,
            params,
            aggregates: &[],
            converter,
        }
    }

    pub fn with_aggregates(self, aggregates: &'a [Value]) -> Self {
        Self { aggregates, ..self }
    }

    pub fn with_row(self, row: &'a [Value]) -> Self {
        Self { row, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl Arithmetic {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
        }
    }
}

/// Evaluates an expression.
pub fn evaluate(expr: &Expression, env: &Environment) -> Result<Value> {
    use Expression::*;
    Ok(match expr {
        Constant(value) => value.clone(),
        Column(i) => env.row.get(*i).cloned().ok_or_else(|| {
            Error::ExecutionError(format!("column index {} out of bounds", i))
        })?,
        Parameter(i) => env
            .params
            .get(*i)
            .cloned()
            .ok_or(Error::UnboundParameter(*i + 1))?,
        Aggregate(id) => env.aggregates.get(*id).cloned().ok_or_else(|| {
            Error::ExecutionError(format!("aggregate {} evaluated outside of a group", id))
        })?,

        And(lhs, rhs) => {
            let (l, r) = (evaluate(lhs, env)?, evaluate(rhs, env)?);
            match (truth(&l)?, truth(&r)?) {
                (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            }
        }
        Or(lhs, rhs) => {
            let (l, r) = (evaluate(lhs, env)?, evaluate(rhs, env)?);
            match (truth(&l)?, truth(&r)?) {
                (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            }
        }
        Not(expr) => match truth(&evaluate(expr, env)?)? {
            Some(b) => Value::Bool(!b),
            None => Value::Null,
        },

        Equal(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_eq)?,
        NotEqual(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_ne)?,
        GreaterThan(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_gt)?,
        GreaterThanOrEqual(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_ge)?,
        LessThan(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_lt)?,
        LessThanOrEqual(lhs, rhs) => comparison(lhs, rhs, env, Ordering::is_le)?,
        IsNull(expr, negated) => Value::Bool(evaluate(expr, env)?.is_null() != *negated),

        Add(lhs, rhs) => arithmetic(Arithmetic::Add, lhs, rhs, env)?,
        Subtract(lhs, rhs) => arithmetic(Arithmetic::Subtract, lhs, rhs, env)?,
        Multiply(lhs, rhs) => arithmetic(Arithmetic::Multiply, lhs, rhs, env)?,
        Divide(lhs, rhs) => arithmetic(Arithmetic::Divide, lhs, rhs, env)?,
        Remainder(lhs, rhs) => arithmetic(Arithmetic::Remainder, lhs, rhs, env)?,
        Identity(expr) => coerce_numeric(&evaluate(expr, env)?).unwrap_or(Value::Null),
        Negate(expr) => negate(&evaluate(expr, env)?)?,
        Concat(lhs, rhs) => {
            let (l, r) = (evaluate(lhs, env)?, evaluate(rhs, env)?);
            match (l.to_text(), r.to_text()) {
                (Some(l), Some(r)) => Value::Str(l + &r),
                _ => Value::Null,
            }
        }

        Like(lhs, pattern, negated) => {
            let (value, pattern) = (evaluate(lhs, env)?, evaluate(pattern, env)?);
            if value.is_null() || pattern.is_null() {
                Value::Bool(false)
            } else {
                Value::Bool(like(&value, &pattern)? != *negated)
            }
        }
        InList(expr, list, negated) => {
            let value = evaluate(expr, env)?;
            if value.is_null() {
                return Ok(Value::Bool(false));
            }
            let mut found = false;
            for item in list {
                let item = evaluate(item, env)?;
                if compare(&value, &item, env.converter) == Some(Ordering::Equal) {
                    found = true;
                }
            }
            Value::Bool(found != *negated)
        }
        Between(expr, low, high, negated) => {
            let value = evaluate(expr, env)?;
            let (low, high) = (evaluate(low, env)?, evaluate(high, env)?);
            match (
                compare(&value, &low, env.converter),
                compare(&value, &high, env.converter),
            ) {
                (Some(lo), Some(hi)) => Value::Bool((lo.is_ge() && hi.is_le()) != *negated),
                _ => Value::Bool(false),
            }
        }

        Function(function, args) => call_function(*function, args, env)?,
    })
}

/// Evaluates a predicate; only TRUE passes.
pub fn evaluate_predicate(expr: &Expression, env: &Environment) -> Result<bool> {
    Ok(evaluate(expr, env)?.is_true())
}

/// Interprets a value as a boolean for logical operators.
fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(Error::InvalidValue(format!(
            "expected a boolean, found {}",
            other
        ))),
    }
}

/// Relational comparisons are FALSE when either side is NULL or the values are
/// incomparable.
fn comparison(
    lhs: &Expression,
    rhs: &Expression,
    env: &Environment,
    test: fn(Ordering) -> bool,
) -> Result<Value> {
    let (l, r) = (evaluate(lhs, env)?, evaluate(rhs, env)?);
    Ok(Value::Bool(compare(&l, &r, env.converter).is_some_and(test)))
}

/// Normalizes a value for arithmetic: integers widen to i64, strings are parsed
/// as numbers. Returns None for values that are not numbers.
fn coerce_numeric(value: &Value) -> Option<Value> {
    match value {
        v if v.is_integer() => v.to_i64().map(Value::I64),
        Value::F32(f) => Some(Value::F64(*f as f64)),
        Value::F64(_) | Value::Decimal(_) => Some(value.clone()),
        Value::Str(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Value::I64(i))
            } else {
                value.to_decimal().map(Value::Decimal)
            }
        }
        _ => None,
    }
}

fn overflow(op: Arithmetic) -> Error {
    Error::InvalidValue(format!("numeric overflow in {}", op.symbol()))
}

fn arithmetic(
    op: Arithmetic,
    lhs: &Expression,
    rhs: &Expression,
    env: &Environment,
) -> Result<Value> {
    let (l, r) = (evaluate(lhs, env)?, evaluate(rhs, env)?);
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    // Date and timestamp arithmetic in whole days.
    match (op, &l, &r) {
        (Arithmetic::Add | Arithmetic::Subtract, Value::Date(_) | Value::Timestamp(_), days)
            if days.is_integer() =>
        {
            let days = days.to_i64().unwrap_or_default();
            let days = if op == Arithmetic::Subtract { -days } else { days };
            return shift_days(&l, days).ok_or_else(|| overflow(op));
        }
        (Arithmetic::Add, days, Value::Date(_) | Value::Timestamp(_)) if days.is_integer() => {
            let days = days.to_i64().unwrap_or_default();
            return shift_days(&r, days).ok_or_else(|| overflow(op));
        }
        (Arithmetic::Subtract, Value::Date(a), Value::Date(b)) => {
            return Ok(Value::I64((*a - *b).num_days()));
        }
        _ => {}
    }

    let (Some(l), Some(r)) = (coerce_numeric(&l), coerce_numeric(&r)) else {
        return Ok(Value::Null);
    };

    match (&l, &r) {
        (Value::I64(a), Value::I64(b)) => {
            if *b == 0 && matches!(op, Arithmetic::Divide | Arithmetic::Remainder) {
                return Err(Error::ExecutionError("division by zero".into()));
            }
            let result = match op {
                Arithmetic::Add => a.checked_add(*b),
                Arithmetic::Subtract => a.checked_sub(*b),
                Arithmetic::Multiply => a.checked_mul(*b),
                Arithmetic::Divide => a.checked_div(*b),
                Arithmetic::Remainder => a.checked_rem(*b),
            };
            result.map(Value::I64).ok_or_else(|| overflow(op))
        }
        (Value::F64(_), _) | (_, Value::F64(_)) => {
            let (a, b) = (
                l.to_f64().ok_or_else(|| overflow(op))?,
                r.to_f64().ok_or_else(|| overflow(op))?,
            );
            if b == 0.0 && matches!(op, Arithmetic::Divide | Arithmetic::Remainder) {
                return Err(Error::ExecutionError("division by zero".into()));
            }
            Ok(Value::F64(match op {
                Arithmetic::Add => a + b,
                Arithmetic::Subtract => a - b,
                Arithmetic::Multiply => a * b,
                Arithmetic::Divide => a / b,
                Arithmetic::Remainder => a % b,
            }))
        }
        _ => {
            let (Some(a), Some(b)) = (l.to_decimal(), r.to_decimal()) else {
                return Ok(Value::Null);
            };
            if b.is_zero() && matches!(op, Arithmetic::Divide | Arithmetic::Remainder) {
                return Err(Error::ExecutionError("division by zero".into()));
            }
            let result = match op {
                Arithmetic::Add => a.checked_add(b),
                Arithmetic::Subtract => a.checked_sub(b),
                Arithmetic::Multiply => a.checked_mul(b),
                Arithmetic::Divide => a.checked_div(b),
                Arithmetic::Remainder => a.checked_rem(b),
            };
            result.map(Value::Decimal).ok_or_else(|| overflow(op))
        }
    }
}

fn shift_days(value: &Value, days: i64) -> Option<Value> {
    let delta = Duration::try_days(days)?;
    match value {
        Value::Date(d) => d.checked_add_signed(delta).map(Value::Date),
        Value::Timestamp(ts) => ts.checked_add_signed(delta).map(Value::Timestamp),
        _ => None,
    }
}

fn negate(value: &Value) -> Result<Value> {
    Ok(match coerce_numeric(value) {
        Some(Value::I64(i)) => Value::I64(
            i.checked_neg()
                .ok_or_else(|| overflow(Arithmetic::Subtract))?,
        ),
        Some(Value::F64(f)) => Value::F64(-f),
        Some(Value::Decimal(d)) => Value::Decimal(-d),
        _ => Value::Null,
    })
}

fn call_function(
    function: ScalarFunction,
    args: &[Expression],
    env: &Environment,
) -> Result<Value> {
    // COALESCE stops at the first non-NULL argument.
    if function == ScalarFunction::Coalesce {
        for arg in args {
            let value = evaluate(arg, env)?;
            if !value.is_null() {
                return Ok(value);
            }
        }
        return Ok(Value::Null);
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, env))
        .collect::<Result<Vec<_>>>()?;
    let first = values.first().cloned().unwrap_or(Value::Null);
    if first.is_null() {
        return Ok(Value::Null);
    }

    Ok(match function {
        ScalarFunction::Lower => text(&first, |s| s.to_lowercase()),
        ScalarFunction::Upper => text(&first, |s| s.to_uppercase()),
        ScalarFunction::Trim => text(&first, |s| s.trim().to_string()),
        ScalarFunction::Length => first
            .to_text()
            .map_or(Value::Null, |s| Value::I64(s.chars().count() as i64)),
        ScalarFunction::Abs => abs(&first)?,
        ScalarFunction::Round => {
            let places = match values.get(1) {
                None => 0,
                Some(Value::Null) => return Ok(Value::Null),
                Some(places) => match coerce_numeric(places) {
                    Some(Value::I64(p)) => p,
                    _ => {
                        return Err(Error::InvalidValue(format!(
                            "ROUND precision must be an integer, found {}",
                            places
                        )));
                    }
                },
            };
            round(&first, places)?
        }
        ScalarFunction::NullIf => {
            let second = values.get(1).cloned().unwrap_or(Value::Null);
            if compare(&first, &second, env.converter) == Some(Ordering::Equal) {
                Value::Null
            } else {
                first
            }
        }
        ScalarFunction::Coalesce => first,
    })
}

fn text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    value.to_text().map_or(Value::Null, |s| Value::Str(f(&s)))
}

fn abs(value: &Value) -> Result<Value> {
    Ok(match coerce_numeric(value) {
        Some(Value::I64(i)) => Value::I64(
            i.checked_abs()
                .ok_or_else(|| overflow(Arithmetic::Subtract))?,
        ),
        Some(Value::F64(f)) => Value::F64(f.abs()),
        Some(Value::Decimal(d)) => Value::Decimal(d.abs()),
        _ => Value::Null,
    })
}

/// Rounds half away from zero to the given number of decimal places. Negative
/// places round to tens, hundreds and so on.
fn round(value: &Value, places: i64) -> Result<Value> {
    let places = places.clamp(-18, 28);
    Ok(match value {
        v if v.is_integer() => {
            if places >= 0 {
                v.clone()
            } else {
                let rounded =
                    round_decimal(Decimal::from(v.to_i64().unwrap_or_default()), places)?;
                rounded
                    .to_i64()
                    .map(Value::I64)
                    .ok_or_else(|| overflow(Arithmetic::Multiply))?
            }
        }
        Value::F32(f) => Value::F32(round_float(*f as f64, places) as f32),
        Value::F64(f) => Value::F64(round_float(*f, places)),
        Value::Decimal(d) => Value::Decimal(round_decimal(*d, places)?),
        other => match coerce_numeric(other) {
            Some(v) => round(&v, places)?,
            None => Value::Null,
        },
    })
}

fn round_float(f: f64, places: i64) -> f64 {
    let factor = 10f64.powi(places as i32);
    (f * factor).round() / factor
}

fn round_decimal(d: Decimal, places: i64) -> Result<Decimal> {
    let strategy = rust_decimal::RoundingStrategy::MidpointAwayFromZero;
    if places >= 0 {
        Ok(d.round_dp_with_strategy(places as u32, strategy))
    } else {
        let factor = Decimal::from(10i64.pow(places.unsigned_abs() as u32));
        (d / factor)
            .round_dp_with_strategy(0, strategy)
            .checked_mul(factor)
            .ok_or_else(|| overflow(Arithmetic::Multiply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn eval(expr: Expression) -> Result<Value> {
        let converter = Converter::default();
        let row = vec![Value::I32(10), Value::from("Smith"), Value::Null];
        let params = vec![Value::I64(5)];
        evaluate(&expr, &Environment::new(&row, &params, &converter))
    }

    fn c(v: impl Into<Value>) -> Box<Expression> {
        Box::new(Expression::Constant(v.into()))
    }

    fn col(i: usize) -> Box<Expression> {
        Box::new(Expression::Column(i))
    }

    #[test]
    fn test_null_algebra() {
        use Expression::*;
        let null = || col(2);
        for expr in [
            Equal(null(), c(1i64)),
            NotEqual(null(), c(1i64)),
            GreaterThan(null(), c(1i64)),
            GreaterThanOrEqual(c(1i64), null()),
            LessThan(null(), null()),
            LessThanOrEqual(null(), c("x")),
            Like(null(), c("%"), false),
            Like(null(), c("%"), true),
            InList(null(), vec![Constant(Value::Null)], false),
            Between(null(), c(1i64), c(2i64), false),
        ] {
            assert_eq!(eval(expr.clone()), Ok(Value::Bool(false)), "{}", expr);
        }
        assert_eq!(eval(IsNull(null(), false)), Ok(Value::Bool(true)));
        assert_eq!(eval(IsNull(null(), true)), Ok(Value::Bool(false)));
        assert_eq!(eval(IsNull(col(0), false)), Ok(Value::Bool(false)));
        assert_eq!(eval(Add(null(), c(1i64))), Ok(Value::Null));
        assert_eq!(eval(Concat(c("a"), null())), Ok(Value::Null));
    }

    #[test]
    fn test_logic() {
        use Expression::*;
        let t = || c(true);
        let f = || c(false);
        let n = || Box::new(Constant(Value::Null));
        assert_eq!(eval(And(t(), f())), Ok(Value::Bool(false)));
        assert_eq!(eval(And(n(), f())), Ok(Value::Bool(false)));
        assert_eq!(eval(And(n(), t())), Ok(Value::Null));
        assert_eq!(eval(Or(n(), t())), Ok(Value::Bool(true)));
        assert_eq!(eval(Not(n())), Ok(Value::Null));
        assert!(eval(Not(c(1i64))).is_err());
    }

    #[test]
    fn test_arithmetic() {
        use Expression::*;
        assert_eq!(eval(Add(col(0), c(1i64))), Ok(Value::I64(11)));
        assert_eq!(eval(Multiply(col(0), c(1.5))), Ok(Value::F64(15.0)));
        assert_eq!(eval(Divide(c(7i64), c(2i64))), Ok(Value::I64(3)));
        assert_eq!(eval(Add(c("4"), c(1i64))), Ok(Value::I64(5)));
        assert_eq!(
            eval(Add(c("2.5"), c(1i64))),
            Ok(Value::Decimal(Decimal::new(35, 1)))
        );
        assert_eq!(eval(Add(col(1), c(1i64))), Ok(Value::Null));
        assert!(eval(Divide(col(0), c(0i64))).is_err());
        assert!(eval(Add(c(i64::MAX), c(1i64))).is_err());
        assert_eq!(eval(Negate(col(0))), Ok(Value::I64(-10)));
        assert_eq!(
            eval(Remainder(Box::new(Parameter(0)), c(3i64))),
            Ok(Value::I64(2))
        );
    }

    #[test]
    fn test_date_arithmetic() {
        use Expression::*;
        let date = NaiveDate::from_ymd_opt(2011, 10, 19).unwrap();
        assert_eq!(
            eval(Add(c(date), c(13i64))),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2011, 11, 1).unwrap()))
        );
        assert_eq!(
            eval(Subtract(c(date), c(NaiveDate::from_ymd_opt(2011, 10, 1).unwrap()))),
            Ok(Value::I64(18))
        );
    }

    #[test]
    fn test_predicates() {
        use Expression::*;
        assert_eq!(eval(Like(col(1), c("Sm%"), false)), Ok(Value::Bool(true)));
        assert_eq!(eval(Like(col(1), c("Sm%"), true)), Ok(Value::Bool(false)));
        assert_eq!(
            eval(InList(col(0), vec![Constant(1i64.into()), Constant("10".into())], false)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval(Between(col(0), c(10i64), c(12i64), true)),
            Ok(Value::Bool(false))
        );
        assert_eq!(eval(GreaterThan(col(0), c("9"))), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_functions() {
        use Expression::*;
        let f = |function, args| eval(Function(function, args));
        assert_eq!(
            f(ScalarFunction::Upper, vec![Column(1)]),
            Ok(Value::from("SMITH"))
        );
        assert_eq!(f(ScalarFunction::Length, vec![Column(1)]), Ok(Value::I64(5)));
        assert_eq!(f(ScalarFunction::Lower, vec![Column(2)]), Ok(Value::Null));
        assert_eq!(
            f(ScalarFunction::Coalesce, vec![Column(2), Constant("x".into())]),
            Ok(Value::from("x"))
        );
        assert_eq!(
            f(ScalarFunction::NullIf, vec![Column(0), Constant(10i64.into())]),
            Ok(Value::Null)
        );
        assert_eq!(
            f(ScalarFunction::Round, vec![Constant(1.26.into()), Constant(1i64.into())]),
            Ok(Value::F64(1.3))
        );
        assert_eq!(
            f(ScalarFunction::Round, vec![Constant(1250i64.into()), Constant((-2i64).into())]),
            Ok(Value::I64(1300))
        );
        assert_eq!(
            f(ScalarFunction::Abs, vec![Constant((-3i64).into())]),
            Ok(Value::I64(3))
        );
    }

    #[test]
    fn test_round_overflow_is_an_error() {
        let call = Expression::Function(
            ScalarFunction::Round,
            vec![
                Expression::Constant(Value::Decimal(Decimal::MAX)),
                Expression::Constant(Value::I64(-1)),
            ],
        );
        assert!(matches!(eval(call), Err(Error::InvalidValue(msg)) if msg.contains("overflow")));
    }

    #[test]
    fn test_unbound_parameter() {
        assert_eq!(
            eval(Expression::Parameter(3)),
            Err(Error::UnboundParameter(4))
        );
    }
}
