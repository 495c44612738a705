//! Query planner
//!
//! Turns a parsed SELECT statement into an immutable [`QueryPlan`]: column
//! names are resolved to positions, aggregate calls are hoisted into the
//! plan's aggregate list, ORDER BY aliases and positions are substituted, and
//! the GROUP BY / HAVING / SELECT consistency rules are checked.

use super::plan::{Projection, QueryPlan};
use crate::error::{Error, Result};
use crate::parsing::ast::{self, Literal, Operator, RowCount};
use crate::types::{
    AggregateCall, AggregateKind, DataType, Expression, ScalarFunction, Table, Value,
};

/// Where an expression appears, which decides whether aggregates are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Where,
    GroupBy,
    AggregateArgument,
    Output,
}

pub struct Planner {
    table: Table,
    aggregates: Vec<AggregateCall>,
    parameter_count: usize,
}

impl Planner {
    /// Plans a statement against the schema of its FROM table.
    pub fn plan(statement: ast::SelectStatement, table: Table) -> Result<QueryPlan> {
        let table = table.with_alias(statement.from.alias.clone());
        let mut planner = Self {
            table,
            aggregates: Vec::new(),
            parameter_count: 0,
        };
        let plan = planner.build_select(statement)?;
        tracing::debug!("Planned query: {}", plan);
        Ok(plan)
    }

    fn build_select(&mut self, statement: ast::SelectStatement) -> Result<QueryPlan> {
        let filter = statement
            .r#where
            .as_ref()
            .map(|e| self.build_expression(e, Scope::Where))
            .transpose()?;

        let group_by = statement
            .group_by
            .iter()
            .map(|e| self.build_expression(e, Scope::GroupBy))
            .collect::<Result<Vec<_>>>()?;

        let mut projections = Vec::new();
        let mut aliases = Vec::new();
        for (expr, alias) in &statement.select {
            if *expr == ast::Expression::All {
                for (i, column) in self.table.columns.iter().enumerate() {
                    projections.push(Projection {
                        expr: Expression::Column(i),
                        label: column.name.clone(),
                        data_type: column.data_type,
                    });
                    aliases.push(None);
                }
                continue;
            }
            let planned = self.build_expression(expr, Scope::Output)?;
            let label = match (alias, expr) {
                (Some(alias), _) => alias.clone(),
                (None, ast::Expression::Column(..)) => match &planned {
                    Expression::Column(i) => self.table.columns[*i].name.clone(),
                    _ => expr.to_string(),
                },
                (None, _) => expr.to_string(),
            };
            let data_type = self.infer_type(&planned);
            projections.push(Projection {
                expr: planned,
                label,
                data_type,
            });
            aliases.push(alias.clone());
        }

        let having = statement
            .having
            .as_ref()
            .map(|e| self.build_expression(e, Scope::Output))
            .transpose()?;

        let mut order_by = Vec::new();
        for (expr, direction) in &statement.order_by {
            let planned = self.build_order_key(expr, &projections, &aliases)?;
            order_by.push((planned, *direction));
        }

        let aggregated =
            !group_by.is_empty() || !self.aggregates.is_empty() || having.is_some();

        if aggregated {
            for projection in &projections {
                if let Some(column) = self.ungrouped_column(&projection.expr, &group_by) {
                    return Err(Error::NotInGroupBy(self.column_name(column)));
                }
            }
            if let Some(having) = &having
                && let Some(column) = self.ungrouped_column(having, &group_by)
            {
                return Err(Error::InvalidHavingColumn(self.column_name(column)));
            }
            for (expr, _) in &order_by {
                if let Some(column) = self.ungrouped_column(expr, &group_by) {
                    return Err(Error::OrderByNotInGroupBy(self.column_name(column)));
                }
            }
        }

        for count in [statement.limit, statement.offset].iter().flatten() {
            if let RowCount::Parameter(i) = count {
                self.parameter_count = self.parameter_count.max(i + 1);
            }
        }

        Ok(QueryPlan {
            table: self.table.clone(),
            distinct: statement.distinct,
            projections,
            filter,
            group_by,
            having,
            aggregates: std::mem::take(&mut self.aggregates),
            aggregated,
            order_by,
            limit: statement.limit,
            offset: statement.offset,
            parameter_count: self.parameter_count,
        })
    }

    /// Builds an ORDER BY key. A bare name matching a select alias, or an
    /// integer literal naming a 1-based select position, refers to that
    /// output column.
    fn build_order_key(
        &mut self,
        expr: &ast::Expression,
        projections: &[Projection],
        aliases: &[Option<String>],
    ) -> Result<Expression> {
        match expr {
            ast::Expression::Literal(Literal::Integer(position)) => {
                let index = usize::try_from(*position)
                    .ok()
                    .filter(|p| (1..=projections.len()).contains(p))
                    .ok_or_else(|| {
                        Error::ParseError(format!("ORDER BY position {} is out of range", position))
                    })?;
                Ok(projections[index - 1].expr.clone())
            }
            ast::Expression::Column(None, name) => {
                let aliased = aliases.iter().position(|alias| {
                    alias
                        .as_deref()
                        .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
                });
                match aliased {
                    Some(index) => Ok(projections[index].expr.clone()),
                    None => self.build_expression(expr, Scope::Output),
                }
            }
            _ => self.build_expression(expr, Scope::Output),
        }
    }

    /// Finds a column referenced outside of any aggregate call and outside of
    /// any subexpression that matches a GROUP BY expression.
    fn ungrouped_column(&self, expr: &Expression, group_by: &[Expression]) -> Option<usize> {
        if group_by.contains(expr) {
            return None;
        }
        match expr {
            Expression::Column(i) => Some(*i),
            Expression::Aggregate(_) => None,
            _ => expr
                .children()
                .into_iter()
                .find_map(|child| self.ungrouped_column(child, group_by)),
        }
    }

    fn column_name(&self, index: usize) -> String {
        self.table
            .column(index)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", index))
    }

    /// Builds a planned expression from an AST expression.
    fn build_expression(&mut self, expr: &ast::Expression, scope: Scope) -> Result<Expression> {
        use Expression::*;
        Ok(match expr {
            ast::Expression::All => {
                return Err(Error::ParseError(
                    "* is only allowed in the select list or COUNT(*)".into(),
                ));
            }
            ast::Expression::Column(table, name) => {
                Column(self.table.resolve(table.as_deref(), name)?)
            }
            ast::Expression::Literal(literal) => Constant(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Bool(*b),
                Literal::Integer(i) => Value::I64(*i),
                Literal::Float(f) => Value::F64(*f),
                Literal::String(s) => Value::Str(s.clone()),
            }),
            ast::Expression::Parameter(i) => {
                self.parameter_count = self.parameter_count.max(i + 1);
                Parameter(*i)
            }
            ast::Expression::Function {
                name,
                args,
                distinct,
            } => return self.build_function(name, args, *distinct, scope),
            ast::Expression::Operator(op) => match op {
                Operator::And(l, r) => And(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Or(l, r) => Or(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Not(e) => Not(self.boxed(e, scope)?),
                Operator::Equal(l, r) => Equal(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::NotEqual(l, r) => NotEqual(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::GreaterThan(l, r) => GreaterThan(
                    self.boxed(l, scope)?,
                    self.boxed(r, scope)?,
                ),
                Operator::GreaterThanOrEqual(l, r) => GreaterThanOrEqual(
                    self.boxed(l, scope)?,
                    self.boxed(r, scope)?,
                ),
                Operator::LessThan(l, r) => LessThan(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::LessThanOrEqual(l, r) => LessThanOrEqual(
                    self.boxed(l, scope)?,
                    self.boxed(r, scope)?,
                ),
                Operator::IsNull(e, negated) => IsNull(self.boxed(e, scope)?, *negated),
                Operator::Add(l, r) => Add(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Subtract(l, r) => Subtract(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Multiply(l, r) => Multiply(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Divide(l, r) => Divide(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Remainder(l, r) => Remainder(
                    self.boxed(l, scope)?,
                    self.boxed(r, scope)?,
                ),
                Operator::Identity(e) => Identity(self.boxed(e, scope)?),
                Operator::Negate(e) => Negate(self.boxed(e, scope)?),
                Operator::Concat(l, r) => Concat(self.boxed(l, scope)?, self.boxed(r, scope)?),
                Operator::Like(l, r, negated) => Like(
                    self.boxed(l, scope)?,
                    self.boxed(r, scope)?,
                    *negated,
                ),
                Operator::InList {
                    expr,
                    list,
                    negated,
                } => {
                    let expr = self.boxed(expr, scope)?;
                    let list = list
                        .iter()
                        .map(|e| self.build_expression(e, scope))
                        .collect::<Result<_>>()?;
                    InList(expr, list, *negated)
                }
                Operator::Between {
                    expr,
                    low,
                    high,
                    negated,
                } => Between(
                    self.boxed(expr, scope)?,
                    self.boxed(low, scope)?,
                    self.boxed(high, scope)?,
                    *negated,
                ),
            },
        })
    }

    fn boxed(&mut self, expr: &ast::Expression, scope: Scope) -> Result<Box<Expression>> {
        Ok(Box::new(self.build_expression(expr, scope)?))
    }

    fn build_function(
        &mut self,
        name: &str,
        args: &[ast::Expression],
        distinct: bool,
        scope: Scope,
    ) -> Result<Expression> {
        if let Some(kind) = AggregateKind::from_name(name) {
            match scope {
                Scope::Where => return Err(Error::AggregateInWhere),
                Scope::GroupBy => {
                    return Err(Error::ParseError(
                        "aggregate functions not allowed in GROUP BY".into(),
                    ));
                }
                Scope::AggregateArgument => {
                    return Err(Error::ParseError(
                        "aggregate function calls cannot be nested".into(),
                    ));
                }
                Scope::Output => {}
            }
            let arg = match (kind, args) {
                (AggregateKind::Count, [ast::Expression::All]) if !distinct => None,
                (_, [ast::Expression::All]) => {
                    return Err(Error::ParseError(format!(
                        "{}(*) is not supported",
                        name.to_uppercase()
                    )));
                }
                (_, [arg]) => Some(self.build_expression(arg, Scope::AggregateArgument)?),
                _ => {
                    return Err(Error::ParseError(format!(
                        "{} takes exactly one argument",
                        name.to_uppercase()
                    )));
                }
            };
            let call = AggregateCall {
                kind,
                arg,
                distinct,
            };
            let id = match self.aggregates.iter().position(|a| *a == call) {
                Some(id) => id,
                None => {
                    self.aggregates.push(call);
                    self.aggregates.len() - 1
                }
            };
            return Ok(Expression::Aggregate(id));
        }

        let function = ScalarFunction::from_name(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        if distinct {
            return Err(Error::ParseError(format!(
                "DISTINCT is not allowed in {}",
                function.name()
            )));
        }
        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(Error::ParseError(format!(
                "wrong number of arguments to {}: {}",
                function.name(),
                args.len()
            )));
        }
        let args = args
            .iter()
            .map(|arg| self.build_expression(arg, scope))
            .collect::<Result<_>>()?;
        Ok(Expression::Function(function, args))
    }

    /// Statically infers the result type of an expression, for column
    /// metadata. Values produced at runtime may differ for mixed inputs.
    fn infer_type(&self, expr: &Expression) -> DataType {
        use Expression::*;
        match expr {
            Constant(value) => value.data_type().unwrap_or_default(),
            Column(i) => self.table.columns[*i].data_type,
            Parameter(_) => DataType::Str,
            Aggregate(id) => {
                let call = &self.aggregates[*id];
                let arg = call.arg.as_ref().map(|a| self.infer_type(a));
                match call.kind {
                    AggregateKind::Count => DataType::I64,
                    AggregateKind::Min | AggregateKind::Max => arg.unwrap_or_default(),
                    AggregateKind::Sum => match arg {
                        Some(DataType::F32 | DataType::F64) => DataType::F64,
                        Some(DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64) => {
                            DataType::I64
                        }
                        _ => DataType::Decimal,
                    },
                    AggregateKind::Avg => match arg {
                        Some(DataType::F32 | DataType::F64) => DataType::F64,
                        _ => DataType::Decimal,
                    },
                }
            }
            And(..) | Or(..) | Not(_) | Equal(..) | NotEqual(..) | GreaterThan(..)
            | GreaterThanOrEqual(..) | LessThan(..) | LessThanOrEqual(..) | IsNull(..)
            | Like(..) | InList(..) | Between(..) => DataType::Bool,
            Add(l, r) | Subtract(l, r) | Multiply(l, r) | Divide(l, r) | Remainder(l, r) => {
                let (l, r) = (self.infer_type(l), self.infer_type(r));
                match (l, r) {
                    (DataType::Date, _) => DataType::Date,
                    (DataType::F32 | DataType::F64, _) | (_, DataType::F32 | DataType::F64) => {
                        DataType::F64
                    }
                    (DataType::Decimal, _) | (_, DataType::Decimal) => DataType::Decimal,
                    (l, r) if l.is_numeric() && r.is_numeric() => DataType::I64,
                    _ => DataType::Decimal,
                }
            }
            Identity(e) | Negate(e) => self.infer_type(e),
            Concat(..) => DataType::Str,
            Function(function, args) => match function {
                ScalarFunction::Lower | ScalarFunction::Upper | ScalarFunction::Trim => {
                    DataType::Str
                }
                ScalarFunction::Length => DataType::I64,
                ScalarFunction::Abs | ScalarFunction::Round => args
                    .first()
                    .map(|a| self.infer_type(a))
                    .unwrap_or_default(),
                ScalarFunction::Coalesce | ScalarFunction::NullIf => args
                    .first()
                    .map(|a| self.infer_type(a))
                    .unwrap_or_default(),
            },
        }
    }
}
