//! Query execution
//!
//! Runs a [`QueryPlan`] over a [`RowSource`]:
//!
//! scan → typed conversion → WHERE → GROUP BY / aggregation → HAVING →
//! projection → DISTINCT → ORDER BY → OFFSET → LIMIT
//!
//! Plans without aggregation, DISTINCT or ORDER BY stream rows straight from
//! the source. Everything else is materialized before the first row is
//! returned.

use super::aggregator::{Aggregate, new_aggregate};
use super::compare::sort_order;
use super::evaluator::{Environment, evaluate, evaluate_predicate};
use super::grouping::{GroupContext, Grouper};
use crate::error::{Error, Result};
use crate::parsing::ast::RowCount;
use crate::planning::QueryPlan;
use crate::reader::RowSource;
use crate::types::{Converter, Direction, Row, Rows, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Executes one plan with one set of parameter bindings.
pub struct Executor {
    plan: Arc<QueryPlan>,
    converter: Converter,
    params: Vec<Value>,
    /// Source columns that need typed conversion.
    used: Vec<bool>,
}

/// An output row with its ORDER BY keys.
struct Output {
    values: Row,
    keys: Vec<Value>,
}

impl Executor {
    pub fn new(plan: Arc<QueryPlan>, converter: Converter, params: Vec<Value>) -> Result<Self> {
        if params.len() < plan.parameter_count {
            return Err(Error::UnboundParameter(params.len() + 1));
        }
        let mut used = vec![false; plan.table.columns.len()];
        for column in plan.used_columns() {
            if let Some(flag) = used.get_mut(column) {
                *flag = true;
            }
        }
        Ok(Self {
            plan,
            converter,
            params,
            used,
        })
    }

    /// Executes the plan, streaming when possible.
    pub fn execute(self, source: RowSource) -> Result<Rows<'static>> {
        if self.plan.is_streamable() {
            return Ok(Box::new(self.stream(source)?));
        }
        let rows = self.materialize(source)?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    /// Executes the plan to completion, releasing the source before returning.
    pub fn materialize(self, mut source: RowSource) -> Result<Vec<Row>> {
        let table = self.plan.table.name.clone();
        let rows = if self.plan.is_streamable() {
            self.stream(source)?.collect::<Result<Vec<_>>>()?
        } else {
            let result = self.run(&mut source);
            source.close();
            result?
        };
        tracing::debug!("Query on {} produced {} rows", table, rows.len());
        Ok(rows)
    }

    fn stream(self, source: RowSource) -> Result<StreamingRows> {
        let skip = self.resolve_count(self.plan.offset)?.unwrap_or(0);
        let remaining = self.resolve_count(self.plan.limit)?;
        Ok(StreamingRows {
            executor: self,
            source,
            skip,
            remaining,
            done: false,
        })
    }

    /// The materializing pipeline.
    fn run(&self, source: &mut RowSource) -> Result<Vec<Row>> {
        let offset = self.resolve_count(self.plan.offset)?.unwrap_or(0);
        let limit = self.resolve_count(self.plan.limit)?;

        let mut outputs = if self.plan.aggregated {
            self.aggregate(source)?
        } else {
            let mut outputs = Vec::new();
            while let Some(row) = self.next_filtered(source)? {
                let env = Environment::new(&row, &self.params, &self.converter);
                outputs.push(self.output(&env)?);
            }
            outputs
        };

        if self.plan.distinct {
            let mut seen = HashSet::new();
            outputs.retain(|output| seen.insert(output.values.clone()));
        }

        if !self.plan.order_by.is_empty() {
            outputs.sort_by(|a, b| self.compare_keys(&a.keys, &b.keys));
        }

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(outputs
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|output| output.values)
            .collect())
    }

    /// Groups and aggregates the filtered source rows, applying HAVING.
    fn aggregate(&self, source: &mut RowSource) -> Result<Vec<Output>> {
        let width = self.plan.table.columns.len();
        let base = Environment::new(&[], &self.params, &self.converter);
        let mut outputs = Vec::new();

        if self.plan.group_by.is_empty() {
            // A single group over all rows, accumulated while scanning.
            let mut aggregates: Vec<Box<dyn Aggregate>> =
                self.plan.aggregates.iter().map(new_aggregate).collect();
            while let Some(row) = self.next_filtered(source)? {
                let env = base.with_row(&row);
                for aggregate in aggregates.iter_mut() {
                    aggregate.process_row(&env)?;
                }
            }
            let values = aggregates
                .iter()
                .map(|a| a.eval())
                .collect::<Result<Vec<_>>>()?;
            let row = vec![Value::Null; width];
            let env = base.with_row(&row).with_aggregates(&values);
            if self.passes_having(&env)? {
                outputs.push(self.output(&env)?);
            }
            return Ok(outputs);
        }

        let mut grouper = Grouper::new();
        while let Some(row) = self.next_filtered(source)? {
            let env = base.with_row(&row);
            let key = self
                .plan
                .group_by
                .iter()
                .map(|expr| evaluate(expr, &env))
                .collect::<Result<Vec<_>>>()?;
            grouper.add(key, row);
        }
        tracing::debug!("Grouped {} into {} groups", self.plan.table.name, grouper.len());

        for group in grouper.into_groups() {
            if let Some(output) = self.group_output(&group, &base, width)? {
                outputs.push(output);
            }
        }
        Ok(outputs)
    }

    fn group_output(
        &self,
        group: &GroupContext,
        base: &Environment,
        width: usize,
    ) -> Result<Option<Output>> {
        let values = group.aggregate_values(&self.plan.aggregates, base)?;
        let row = group.representative(width);
        let env = base.with_row(&row).with_aggregates(&values);
        if !self.passes_having(&env)? {
            return Ok(None);
        }
        self.output(&env).map(Some)
    }

    fn passes_having(&self, env: &Environment) -> Result<bool> {
        match &self.plan.having {
            Some(having) => evaluate_predicate(having, env),
            None => Ok(true),
        }
    }

    /// Evaluates the projections and ORDER BY keys in an environment.
    fn output(&self, env: &Environment) -> Result<Output> {
        let values = self
            .plan
            .projections
            .iter()
            .map(|p| evaluate(&p.expr, env))
            .collect::<Result<Vec<_>>>()?;
        let keys = self
            .plan
            .order_by
            .iter()
            .map(|(expr, _)| evaluate(expr, env))
            .collect::<Result<Vec<_>>>()?;
        Ok(Output { values, keys })
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((a, b), (_, direction)) in a.iter().zip(b).zip(&self.plan.order_by) {
            let ordering = sort_order(a, b, &self.converter);
            let ordering = match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Reads the next source row that passes the WHERE clause.
    fn next_filtered(&self, source: &mut RowSource) -> Result<Option<Row>> {
        while let Some(record) = source.next_record()? {
            let row = self.convert(record);
            if let Some(filter) = &self.plan.filter {
                let env = Environment::new(&row, &self.params, &self.converter);
                if !evaluate_predicate(filter, &env)? {
                    continue;
                }
            }
            return Ok(Some(row));
        }
        Ok(None)
    }

    /// Converts the raw fields the plan reads to their column types.
    fn convert(&self, record: Vec<String>) -> Row {
        let mut fields = record.into_iter();
        self.plan
            .table
            .columns
            .iter()
            .zip(&self.used)
            .map(|(column, used)| {
                let field = fields.next();
                if *used {
                    self.converter.convert(field.as_deref(), column.data_type)
                } else {
                    Value::Null
                }
            })
            .collect()
    }

    /// Resolves a LIMIT or OFFSET against the parameter bindings.
    fn resolve_count(&self, count: Option<RowCount>) -> Result<Option<u64>> {
        let Some(count) = count else {
            return Ok(None);
        };
        let index = match count {
            RowCount::Literal(n) => return Ok(Some(n)),
            RowCount::Parameter(index) => index,
        };
        let value = self
            .params
            .get(index)
            .ok_or(Error::UnboundParameter(index + 1))?;
        let n = match value {
            Value::Str(s) => s.trim().parse::<i64>().ok(),
            v => v.to_i64(),
        };
        match n {
            Some(n) if n >= 0 => Ok(Some(n as u64)),
            _ => Err(Error::ExecutionError(format!(
                "LIMIT and OFFSET must be non-negative integers, found {}",
                value
            ))),
        }
    }
}

/// A lazily evaluated result over a streamable plan. The source is released
/// as soon as the limit is reached, the input is exhausted or an error
/// occurs.
pub struct StreamingRows {
    executor: Executor,
    source: RowSource,
    skip: u64,
    remaining: Option<u64>,
    done: bool,
}

impl StreamingRows {
    fn try_next(&mut self) -> Result<Option<Row>> {
        loop {
            if self.remaining == Some(0) {
                return Ok(None);
            }
            let Some(row) = self.executor.next_filtered(&mut self.source)? else {
                return Ok(None);
            };
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            let env = Environment::new(&row, &self.executor.params, &self.executor.converter);
            let output = self.executor.output(&env)?;
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Ok(Some(output.values));
        }
    }
}

impl Iterator for StreamingRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.try_next();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
            self.source.close();
        }
        result.transpose()
    }
}
