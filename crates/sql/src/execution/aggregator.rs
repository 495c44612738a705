//! Aggregate functions
//!
//! Each aggregate call in a plan gets a fresh accumulator per execution. An
//! accumulator is either fed row by row while the source is scanned (queries
//! without GROUP BY), or folded over the members of a group every time the
//! group's value is needed, which keeps repeated evaluation idempotent.

use super::compare::compare;
use super::evaluator::{Environment, evaluate};
use crate::error::{Error, Result};
use crate::types::{AggregateCall, AggregateKind, Expression, Row, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;

/// An aggregate function accumulator.
pub trait Aggregate: Send {
    /// Feeds one source row.
    fn process_row(&mut self, env: &Environment) -> Result<()>;

    /// The aggregate value of all rows processed so far.
    fn eval(&self) -> Result<Value>;

}

/// Creates an empty accumulator for an aggregate call.
pub fn new_aggregate(call: &AggregateCall) -> Box<dyn Aggregate> {
    let input = Input::new(call);
    match call.kind {
        AggregateKind::Count => Box::new(Count { input, count: 0 }),
        AggregateKind::Sum => Box::new(Sum {
            input,
            sum: Total::Empty,
        }),
        AggregateKind::Avg => Box::new(Avg {
            input,
            count: 0,
            float_sum: 0.0,
            decimal_sum: Some(Decimal::ZERO),
            any_float: false,
        }),
        AggregateKind::Min => Box::new(Extreme {
            input,
            keep: Ordering::Less,
            best: None,
        }),
        AggregateKind::Max => Box::new(Extreme {
            input,
            keep: Ordering::Greater,
            best: None,
        }),
    }
}

/// Computes an aggregate over a group's member rows with a fresh accumulator.
pub fn fold_group(call: &AggregateCall, members: &[Row], env: &Environment) -> Result<Value> {
    let mut aggregate = new_aggregate(call);
    for row in members {
        aggregate.process_row(&env.with_row(row))?;
    }
    aggregate.eval()
}

/// Evaluates the aggregate argument, skipping NULLs and, for DISTINCT,
/// values already seen.
struct Input {
    arg: Option<Expression>,
    distinct: bool,
    seen: HashSet<Value>,
}

impl Input {
    fn new(call: &AggregateCall) -> Self {
        Self {
            arg: call.arg.clone(),
            distinct: call.distinct,
            seen: HashSet::new(),
        }
    }

    fn accept(&mut self, env: &Environment) -> Result<Option<Value>> {
        let Some(arg) = &self.arg else {
            // COUNT(*) counts every row.
            return Ok(Some(Value::Bool(true)));
        };
        let value = evaluate(arg, env)?;
        if value.is_null() {
            return Ok(None);
        }
        if self.distinct && !self.seen.insert(value.clone()) {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

struct Count {
    input: Input,
    count: i64,
}

impl Aggregate for Count {
    fn process_row(&mut self, env: &Environment) -> Result<()> {
        if self.input.accept(env)?.is_some() {
            self.count += 1;
        }
        Ok(())
    }

    fn eval(&self) -> Result<Value> {
        Ok(Value::I64(self.count))
    }
}

/// A running SUM. Integers stay integers until a decimal or float arrives;
/// any float makes the sum a float.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Total {
    Empty,
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
}

impl Total {
    fn add(self, value: &Value) -> Result<Self> {
        let overflow = || Error::InvalidValue("numeric overflow in SUM".into());
        Ok(match (self, numeric(value)) {
            (total, None) => total,
            (Total::Empty, Some(v)) => v,
            (Total::Integer(a), Some(Total::Integer(b))) => {
                Total::Integer(a.checked_add(b).ok_or_else(overflow)?)
            }
            (Total::Float(a), Some(b)) => Total::Float(a + b.to_f64()),
            (a, Some(Total::Float(b))) => Total::Float(a.to_f64() + b),
            (a, Some(b)) => Total::Decimal(
                a.to_decimal()
                    .checked_add(b.to_decimal())
                    .ok_or_else(overflow)?,
            ),
        })
    }

    fn to_f64(self) -> f64 {
        match self {
            Total::Empty => 0.0,
            Total::Integer(i) => i as f64,
            Total::Decimal(d) => Value::Decimal(d).to_f64().unwrap_or_default(),
            Total::Float(f) => f,
        }
    }

    fn to_decimal(self) -> Decimal {
        match self {
            Total::Empty => Decimal::ZERO,
            Total::Integer(i) => Decimal::from(i),
            Total::Decimal(d) => d,
            Total::Float(f) => Value::F64(f).to_decimal().unwrap_or_default(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Total::Empty => Value::Null,
            Total::Integer(i) => Value::I64(i),
            Total::Decimal(d) => Value::Decimal(d),
            Total::Float(f) => Value::F64(f),
        }
    }
}

/// Classifies a value for summation. Strings are read as decimals; values
/// that are not numbers are ignored.
fn numeric(value: &Value) -> Option<Total> {
    match value {
        v if v.is_integer() => v.to_i64().map(Total::Integer),
        v if v.is_float() => v.to_f64().map(Total::Float),
        Value::Decimal(d) => Some(Total::Decimal(*d)),
        Value::Str(_) => value.to_decimal().map(Total::Decimal),
        _ => None,
    }
}

struct Sum {
    input: Input,
    sum: Total,
}

impl Aggregate for Sum {
    fn process_row(&mut self, env: &Environment) -> Result<()> {
        if let Some(value) = self.input.accept(env)? {
            self.sum = self.sum.add(&value)?;
        }
        Ok(())
    }

    fn eval(&self) -> Result<Value> {
        Ok(self.sum.into_value())
    }
}

struct Avg {
    input: Input,
    count: i64,
    float_sum: f64,
    decimal_sum: Option<Decimal>,
    any_float: bool,
}

impl Aggregate for Avg {
    fn process_row(&mut self, env: &Environment) -> Result<()> {
        let Some(value) = self.input.accept(env)? else {
            return Ok(());
        };
        let Some(total) = numeric(&value) else {
            return Ok(());
        };
        self.count += 1;
        self.float_sum += total.to_f64();
        self.any_float |= matches!(total, Total::Float(_));
        self.decimal_sum = self
            .decimal_sum
            .and_then(|sum| sum.checked_add(total.to_decimal()));
        Ok(())
    }

    fn eval(&self) -> Result<Value> {
        if self.count == 0 {
            return Ok(Value::Null);
        }
        if self.any_float {
            return Ok(Value::F64(self.float_sum / self.count as f64));
        }
        let sum = self
            .decimal_sum
            .ok_or_else(|| Error::InvalidValue("numeric overflow in AVG".into()))?;
        sum.checked_div(Decimal::from(self.count))
            .map(|avg| Value::Decimal(avg.normalize()))
            .ok_or_else(|| Error::InvalidValue("numeric overflow in AVG".into()))
    }
}

/// MIN and MAX. Values incomparable with the current extreme are skipped.
struct Extreme {
    input: Input,
    keep: Ordering,
    best: Option<Value>,
}

impl Aggregate for Extreme {
    fn process_row(&mut self, env: &Environment) -> Result<()> {
        let Some(value) = self.input.accept(env)? else {
            return Ok(());
        };
        match &self.best {
            None => self.best = Some(value),
            Some(best) => {
                if compare(&value, best, env.converter) == Some(self.keep) {
                    self.best = Some(value);
                }
            }
        }
        Ok(())
    }

    fn eval(&self) -> Result<Value> {
        Ok(self.best.clone().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Converter;

    fn call(kind: AggregateKind, distinct: bool) -> AggregateCall {
        AggregateCall {
            kind,
            arg: Some(Expression::Column(0)),
            distinct,
        }
    }

    fn aggregate(call: &AggregateCall, values: Vec<Value>) -> Result<Value> {
        let converter = Converter::default();
        let rows: Vec<Row> = values.into_iter().map(|v| vec![v]).collect();
        fold_group(call, &rows, &Environment::new(&[], &[], &converter))
    }

    #[test]
    fn test_count() -> Result<()> {
        let values = vec![Value::I32(1), Value::Null, Value::I32(1), Value::I32(2)];
        assert_eq!(aggregate(&call(AggregateKind::Count, false), values.clone())?, Value::I64(3));
        assert_eq!(aggregate(&call(AggregateKind::Count, true), values.clone())?, Value::I64(2));
        let star = AggregateCall {
            kind: AggregateKind::Count,
            arg: None,
            distinct: false,
        };
        assert_eq!(aggregate(&star, values)?, Value::I64(4));
        assert_eq!(aggregate(&star, vec![])?, Value::I64(0));
        Ok(())
    }

    #[test]
    fn test_sum_promotion() -> Result<()> {
        let sum = call(AggregateKind::Sum, false);
        assert_eq!(aggregate(&sum, vec![Value::I32(1), Value::I8(2)])?, Value::I64(3));
        assert_eq!(
            aggregate(&sum, vec![Value::I32(1), Value::from("2.5")])?,
            Value::Decimal(Decimal::new(35, 1))
        );
        assert_eq!(
            aggregate(&sum, vec![Value::I32(1), Value::F64(0.5)])?,
            Value::F64(1.5)
        );
        assert_eq!(aggregate(&sum, vec![Value::Null])?, Value::Null);
        assert!(aggregate(&sum, vec![Value::I64(i64::MAX), Value::I64(1)]).is_err());
        Ok(())
    }

    #[test]
    fn test_avg() -> Result<()> {
        let avg = call(AggregateKind::Avg, false);
        assert_eq!(
            aggregate(&avg, vec![Value::I32(1), Value::I32(2), Value::Null])?,
            Value::Decimal(Decimal::new(15, 1))
        );
        assert_eq!(
            aggregate(&avg, vec![Value::F64(1.0), Value::F64(2.0)])?,
            Value::F64(1.5)
        );
        assert_eq!(aggregate(&avg, vec![])?, Value::Null);
        let distinct = call(AggregateKind::Avg, true);
        assert_eq!(
            aggregate(&distinct, vec![Value::I32(2), Value::I32(2), Value::I32(4)])?,
            Value::Decimal(Decimal::from(3))
        );
        Ok(())
    }

    #[test]
    fn test_min_max() -> Result<()> {
        let values = vec![Value::from("b"), Value::Null, Value::from("a"), Value::from("c")];
        assert_eq!(
            aggregate(&call(AggregateKind::Min, false), values.clone())?,
            Value::from("a")
        );
        assert_eq!(aggregate(&call(AggregateKind::Max, false), values)?, Value::from("c"));
        assert_eq!(aggregate(&call(AggregateKind::Max, false), vec![])?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_streaming_matches_fold() -> Result<()> {
        let converter = Converter::default();
        let sum = call(AggregateKind::Sum, false);
        let mut streaming = new_aggregate(&sum);
        for i in 1..=4 {
            let row = vec![Value::I64(i)];
            streaming.process_row(&Environment::new(&row, &[], &converter))?;
        }
        assert_eq!(streaming.eval()?, Value::I64(10));
        // eval does not consume the accumulator
        assert_eq!(streaming.eval()?, Value::I64(10));
        Ok(())
    }
}
