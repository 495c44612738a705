//! Query plans
//!
//! A plan is built once per query text and is immutable afterwards. It can be
//! executed any number of times with different parameter bindings.

use crate::parsing::ast::RowCount;
use crate::types::{AggregateCall, DataType, Direction, Expression, Table};
use serde::{Deserialize, Serialize};

/// A planned SELECT query over a single table.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    /// The scanned table's schema, including the alias from the FROM clause.
    pub table: Table,
    /// SELECT DISTINCT.
    pub distinct: bool,
    /// Output columns.
    pub projections: Vec<Projection>,
    /// WHERE predicate, evaluated against source rows.
    pub filter: Option<Expression>,
    /// GROUP BY expressions. Empty for an ungrouped aggregate query, which
    /// aggregates all rows into a single group.
    pub group_by: Vec<Expression>,
    /// HAVING predicate, evaluated once per group.
    pub having: Option<Expression>,
    /// Aggregate calls referenced by projections, HAVING and ORDER BY via
    /// [`Expression::Aggregate`].
    pub aggregates: Vec<AggregateCall>,
    /// Whether rows are aggregated (GROUP BY, aggregates or HAVING present).
    pub aggregated: bool,
    /// ORDER BY keys, evaluated against the same environment as projections.
    pub order_by: Vec<(Expression, Direction)>,
    pub limit: Option<RowCount>,
    pub offset: Option<RowCount>,
    /// Number of `?` placeholders in the query.
    pub parameter_count: usize,
}

/// An output column.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub expr: Expression,
    /// The output label: the alias, the column's header name, or the
    /// expression text.
    pub label: String,
    pub data_type: DataType,
}

/// Describes a result column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// One-based column position.
    pub ordinal: usize,
    pub data_type: DataType,
    pub table: String,
}

impl QueryPlan {
    /// Rows can be streamed straight from the source without materializing.
    pub fn is_streamable(&self) -> bool {
        !self.aggregated && !self.distinct && self.order_by.is_empty()
    }

    /// Source column positions the plan reads; other fields need not be
    /// converted.
    pub fn used_columns(&self) -> Vec<usize> {
        let mut columns = std::collections::BTreeSet::new();
        let exprs = self
            .projections
            .iter()
            .map(|p| &p.expr)
            .chain(self.filter.iter())
            .chain(self.group_by.iter())
            .chain(self.having.iter())
            .chain(self.order_by.iter().map(|(e, _)| e));
        for expr in exprs {
            columns.extend(expr.used_columns());
        }
        for call in &self.aggregates {
            columns.extend(call.used_columns());
        }
        columns.into_iter().collect()
    }

    pub fn metadata(&self) -> Vec<ColumnMetadata> {
        self.projections
            .iter()
            .enumerate()
            .map(|(i, p)| ColumnMetadata {
                name: p.label.clone(),
                ordinal: i + 1,
                data_type: p.data_type,
                table: self.table.name.clone(),
            })
            .collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.projections.iter().map(|p| p.label.clone()).collect()
    }
}

impl std::fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let select: Vec<String> = self
            .projections
            .iter()
            .map(|p| format!("{} AS {}", p.expr, p.label))
            .collect();
        write!(f, "Scan: {}", self.table.name)?;
        if let Some(filter) = &self.filter {
            write!(f, " | Filter: {}", filter)?;
        }
        if self.aggregated {
            let group_by: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            let aggregates: Vec<String> = self.aggregates.iter().map(|a| a.to_string()).collect();
            write!(
                f,
                " | Aggregate: [{}] by [{}]",
                aggregates.join(", "),
                group_by.join(", ")
            )?;
        }
        if let Some(having) = &self.having {
            write!(f, " | Having: {}", having)?;
        }
        write!(f, " | Project: {}", select.join(", "))?;
        if self.distinct {
            write!(f, " | Distinct")?;
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(e, d)| format!("{} {}", e, d))
                .collect();
            write!(f, " | Order: {}", order.join(", "))?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " | Offset: {:?}", offset)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " | Limit: {:?}", limit)?;
        }
        Ok(())
    }
}
