//! Planned expressions
//!
//! An expression is built from the AST by the planner, with column names
//! resolved to row positions and aggregate calls hoisted into the plan's
//! aggregate list. Expressions are immutable once planned; all evaluation
//! state (aggregate accumulators, group members) is supplied by the executor.

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// An expression, made up of nested operations and values. Values are either
/// constants, or numeric column references which are looked up in rows.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A constant value.
    Constant(Value),
    /// A column reference. Looks up the value in a row during evaluation.
    Column(usize),
    /// A parameter placeholder (0-indexed).
    Parameter(usize),
    /// A reference to an aggregate call in the plan's aggregate list.
    Aggregate(usize),

    /// a AND b: logical AND of two booleans.
    And(Box<Expression>, Box<Expression>),
    /// a OR b: logical OR of two booleans.
    Or(Box<Expression>, Box<Expression>),
    /// NOT a: logical NOT of a boolean.
    Not(Box<Expression>),

    /// a = b
    Equal(Box<Expression>, Box<Expression>),
    /// a != b
    NotEqual(Box<Expression>, Box<Expression>),
    /// a > b
    GreaterThan(Box<Expression>, Box<Expression>),
    /// a >= b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    /// a < b
    LessThan(Box<Expression>, Box<Expression>),
    /// a <= b
    LessThanOrEqual(Box<Expression>, Box<Expression>),
    /// a IS [NOT] NULL
    IsNull(Box<Expression>, bool),

    /// a + b
    Add(Box<Expression>, Box<Expression>),
    /// a - b
    Subtract(Box<Expression>, Box<Expression>),
    /// a * b
    Multiply(Box<Expression>, Box<Expression>),
    /// a / b
    Divide(Box<Expression>, Box<Expression>),
    /// a % b
    Remainder(Box<Expression>, Box<Expression>),
    /// +a
    Identity(Box<Expression>),
    /// -a
    Negate(Box<Expression>),
    /// a || b: string concatenation.
    Concat(Box<Expression>, Box<Expression>),

    /// a [NOT] LIKE pattern
    Like(Box<Expression>, Box<Expression>, bool),
    /// a [NOT] IN (list)
    InList(Box<Expression>, Vec<Expression>, bool),
    /// a [NOT] BETWEEN low AND high
    Between(Box<Expression>, Box<Expression>, Box<Expression>, bool),

    /// A scalar function call.
    Function(ScalarFunction, Vec<Expression>),
}

/// Built-in scalar functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarFunction {
    Lower,
    Upper,
    Length,
    Trim,
    Abs,
    Round,
    Coalesce,
    NullIf,
}

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_uppercase().as_str() {
            "LOWER" | "LCASE" => Self::Lower,
            "UPPER" | "UCASE" => Self::Upper,
            "LENGTH" | "CHAR_LENGTH" => Self::Length,
            "TRIM" => Self::Trim,
            "ABS" => Self::Abs,
            "ROUND" => Self::Round,
            "COALESCE" | "IFNULL" => Self::Coalesce,
            "NULLIF" => Self::NullIf,
            _ => return None,
        })
    }

    /// Accepted argument counts as an inclusive range.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Round => (1, 2),
            Self::Coalesce => (1, usize::MAX),
            Self::NullIf => (2, 2),
            _ => (1, 1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lower => "LOWER",
            Self::Upper => "UPPER",
            Self::Length => "LENGTH",
            Self::Trim => "TRIM",
            Self::Abs => "ABS",
            Self::Round => "ROUND",
            Self::Coalesce => "COALESCE",
            Self::NullIf => "NULLIF",
        }
    }
}

/// Aggregate function kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_uppercase().as_str() {
            "COUNT" => Self::Count,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            _ => return None,
        })
    }
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Count => "COUNT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
        })
    }
}

/// An aggregate call hoisted out of the select list, HAVING or ORDER BY.
/// `arg` is None for `COUNT(*)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateCall {
    pub kind: AggregateKind,
    pub arg: Option<Expression>,
    pub distinct: bool,
}

impl AggregateCall {
    pub fn used_columns(&self) -> BTreeSet<usize> {
        self.arg
            .as_ref()
            .map(Expression::used_columns)
            .unwrap_or_default()
    }
}

impl Display for AggregateCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        match &self.arg {
            Some(arg) => write!(f, "{}({}{})", self.kind, distinct, arg),
            None => write!(f, "{}({}*)", self.kind, distinct),
        }
    }
}

impl Expression {
    /// The direct child expressions of this node.
    pub fn children(&self) -> Vec<&Expression> {
        use Expression::*;
        match self {
            Constant(_) | Column(_) | Parameter(_) | Aggregate(_) => Vec::new(),

            Not(e) | IsNull(e, _) | Identity(e) | Negate(e) => vec![&**e],

            And(l, r)
            | Or(l, r)
            | Equal(l, r)
            | NotEqual(l, r)
            | GreaterThan(l, r)
            | GreaterThanOrEqual(l, r)
            | LessThan(l, r)
            | LessThanOrEqual(l, r)
            | Add(l, r)
            | Subtract(l, r)
            | Multiply(l, r)
            | Divide(l, r)
            | Remainder(l, r)
            | Concat(l, r)
            | Like(l, r, _) => vec![&**l, &**r],

            Between(e, low, high, _) => vec![&**e, &**low, &**high],
            InList(e, list, _) => std::iter::once(&**e).chain(list).collect(),
            Function(_, args) => args.iter().collect(),
        }
    }

    /// Walks the expression tree depth-first, calling the visitor on each
    /// node until it returns false.
    pub fn walk(&self, visitor: &mut impl FnMut(&Expression) -> bool) -> bool {
        visitor(self) && self.children().into_iter().all(|c| c.walk(visitor))
    }

    /// The base column positions referenced directly by this expression.
    /// Columns inside aggregate arguments are not included; see
    /// [`AggregateCall::used_columns`].
    pub fn used_columns(&self) -> BTreeSet<usize> {
        let mut columns = BTreeSet::new();
        self.walk(&mut |e| {
            if let Expression::Column(i) = e {
                columns.insert(*i);
            }
            true
        });
        columns
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Expression::*;
        match self {
            Constant(Value::Str(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Constant(value) => write!(f, "{}", value),
            Column(i) => write!(f, "#{}", i),
            Parameter(i) => write!(f, "?{}", i),
            Aggregate(i) => write!(f, "agg#{}", i),

            And(lhs, rhs) => write!(f, "({} AND {})", lhs, rhs),
            Or(lhs, rhs) => write!(f, "({} OR {})", lhs, rhs),
            Not(expr) => write!(f, "(NOT {})", expr),

            Equal(lhs, rhs) => write!(f, "({} = {})", lhs, rhs),
            NotEqual(lhs, rhs) => write!(f, "({} != {})", lhs, rhs),
            GreaterThan(lhs, rhs) => write!(f, "({} > {})", lhs, rhs),
            GreaterThanOrEqual(lhs, rhs) => write!(f, "({} >= {})", lhs, rhs),
            LessThan(lhs, rhs) => write!(f, "({} < {})", lhs, rhs),
            LessThanOrEqual(lhs, rhs) => write!(f, "({} <= {})", lhs, rhs),
            IsNull(expr, false) => write!(f, "({} IS NULL)", expr),
            IsNull(expr, true) => write!(f, "({} IS NOT NULL)", expr),

            Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Subtract(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Multiply(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Divide(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Remainder(lhs, rhs) => write!(f, "({} % {})", lhs, rhs),
            Identity(expr) => write!(f, "(+{})", expr),
            Negate(expr) => write!(f, "(-{})", expr),
            Concat(lhs, rhs) => write!(f, "({} || {})", lhs, rhs),

            Like(lhs, rhs, negated) => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "({} {}LIKE {})", lhs, not, rhs)
            }
            InList(expr, list, negated) => {
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<String> = list.iter().map(|e| e.to_string()).collect();
                write!(f, "({} {}IN ({}))", expr, not, items.join(", "))
            }
            Between(expr, low, high, negated) => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "({} {}BETWEEN {} AND {})", expr, not, low, high)
            }
            Function(function, args) => {
                let args: Vec<String> = args.iter().map(|e| e.to_string()).collect();
                write!(f, "{}({})", function.name(), args.join(", "))
            }
        }
    }
}
