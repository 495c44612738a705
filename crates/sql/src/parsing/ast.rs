//! The SQL abstract syntax tree.
//!
//! The AST only describes the syntactic structure of a query. Column names
//! are unresolved and functions are not validated; that is the planner's job.

use crate::types::Direction;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// A SELECT statement, the only statement the dialect supports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectStatement {
    /// DISTINCT: whether to deduplicate result rows.
    pub distinct: bool,
    /// Expressions to select, with an optional column alias.
    pub select: Vec<(Expression, Option<String>)>,
    /// FROM: the table to select from.
    pub from: FromClause,
    /// WHERE: optional condition to filter rows.
    pub r#where: Option<Expression>,
    /// GROUP BY: expressions to group and aggregate by.
    pub group_by: Vec<Expression>,
    /// HAVING: expression to filter groups by.
    pub having: Option<Expression>,
    /// ORDER BY: expressions to sort by, with direction.
    pub order_by: Vec<(Expression, Direction)>,
    /// LIMIT: maximum number of rows to return.
    pub limit: Option<RowCount>,
    /// OFFSET: number of rows to skip.
    pub offset: Option<RowCount>,
}

/// A FROM table with optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromClause {
    pub name: String,
    pub alias: Option<String>,
}

/// A LIMIT or OFFSET value: a non-negative literal or a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowCount {
    Literal(u64),
    Parameter(usize),
}

/// SQL expressions, e.g. `a + 7 > b`. Can be nested.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// A column reference, optionally qualified with a table name or alias.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// A function call. `distinct` is set for `f(DISTINCT ...)`.
    Function {
        name: String,
        args: Vec<Expression>,
        distinct: bool,
    },
    /// An operator.
    Operator(Operator),
    /// A parameter placeholder (? in SQL), with its position (0-indexed).
    Parameter(usize),
}

/// Expression literal values.
#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Expression operators.
///
/// Since this is a recursive data structure, we have to box each child
/// expression, which incurs a heap allocation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>), // a AND b
    Not(Box<Expression>),                  // NOT a
    Or(Box<Expression>, Box<Expression>),  // a OR b

    Equal(Box<Expression>, Box<Expression>),       // a = b
    GreaterThan(Box<Expression>, Box<Expression>), // a > b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>), // a >= b
    IsNull(Box<Expression>, bool),                 // a IS [NOT] NULL
    LessThan(Box<Expression>, Box<Expression>),    // a < b
    LessThanOrEqual(Box<Expression>, Box<Expression>), // a <= b
    NotEqual(Box<Expression>, Box<Expression>),    // a != b

    Add(Box<Expression>, Box<Expression>),       // a + b
    Concat(Box<Expression>, Box<Expression>),    // a || b
    Divide(Box<Expression>, Box<Expression>),    // a / b
    Identity(Box<Expression>),                   // +a
    Multiply(Box<Expression>, Box<Expression>),  // a * b
    Negate(Box<Expression>),                     // -a
    Remainder(Box<Expression>, Box<Expression>), // a % b
    Subtract(Box<Expression>, Box<Expression>),  // a - b

    Like(Box<Expression>, Box<Expression>, bool), // a [NOT] LIKE b

    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    }, // a [NOT] IN (b, c, d)
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    }, // a [NOT] BETWEEN b AND c
}

/// To allow comparing expressions structurally, implement simple equality by
/// value for all literals, including Null and f64::NAN. SQL semantics are
/// applied during evaluation, not here.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Integer(l), Self::Integer(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l.to_bits() == r.to_bits(),
            (Self::String(l), Self::String(r)) => l == r,
            (_, _) => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(v) => v.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
        }
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Self::Operator(operator)
    }
}

impl Expression {
    /// Walks the expression tree depth-first, calling the visitor on each
    /// node until it returns false.
    pub fn walk(&self, visitor: &mut impl FnMut(&Expression) -> bool) -> bool {
        use Operator::*;
        if !visitor(self) {
            return false;
        }
        match self {
            Self::All | Self::Column(..) | Self::Literal(_) | Self::Parameter(_) => true,
            Self::Function { args, .. } => args.iter().all(|a| a.walk(visitor)),
            Self::Operator(op) => match op {
                Not(e) | IsNull(e, _) | Identity(e) | Negate(e) => e.walk(visitor),
                And(l, r)
                | Or(l, r)
                | Equal(l, r)
                | GreaterThan(l, r)
                | GreaterThanOrEqual(l, r)
                | LessThan(l, r)
                | LessThanOrEqual(l, r)
                | NotEqual(l, r)
                | Add(l, r)
                | Concat(l, r)
                | Divide(l, r)
                | Multiply(l, r)
                | Remainder(l, r)
                | Subtract(l, r)
                | Like(l, r, _) => l.walk(visitor) && r.walk(visitor),
                InList { expr, list, .. } => {
                    expr.walk(visitor) && list.iter().all(|e| e.walk(visitor))
                }
                Between {
                    expr, low, high, ..
                } => expr.walk(visitor) && low.walk(visitor) && high.walk(visitor),
            },
        }
    }

    /// Returns true if any node satisfies the predicate.
    pub fn contains(&self, predicate: &impl Fn(&Expression) -> bool) -> bool {
        !self.walk(&mut |e| !predicate(e))
    }

    fn is_atom(&self) -> bool {
        !matches!(self, Self::Operator(_))
    }
}

/// Wraps compound operands in parentheses when displayed.
struct Operand<'a>(&'a Expression);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_atom() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

fn binary(
    f: &mut std::fmt::Formatter<'_>,
    lhs: &Expression,
    symbol: &str,
    rhs: &Expression,
) -> std::fmt::Result {
    write!(f, "{} {} {}", Operand(lhs), symbol, Operand(rhs))
}

/// Displays the expression as SQL text. Used for output labels of
/// unaliased select expressions.
impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Operator::*;
        match self {
            Self::All => write!(f, "*"),
            Self::Column(Some(table), column) => write!(f, "{}.{}", table, column),
            Self::Column(None, column) => write!(f, "{}", column),
            Self::Literal(literal) => write!(f, "{}", literal),
            Self::Parameter(_) => write!(f, "?"),
            Self::Function {
                name,
                args,
                distinct,
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                let distinct = if *distinct { "DISTINCT " } else { "" };
                write!(f, "{}({}{})", name.to_uppercase(), distinct, args.join(", "))
            }
            Self::Operator(op) => {
                match op {
                    And(l, r) => binary(f, l, "AND", r),
                    Or(l, r) => binary(f, l, "OR", r),
                    Not(e) => write!(f, "NOT {}", Operand(e)),
                    Equal(l, r) => binary(f, l, "=", r),
                    NotEqual(l, r) => binary(f, l, "!=", r),
                    GreaterThan(l, r) => binary(f, l, ">", r),
                    GreaterThanOrEqual(l, r) => binary(f, l, ">=", r),
                    LessThan(l, r) => binary(f, l, "<", r),
                    LessThanOrEqual(l, r) => binary(f, l, "<=", r),
                    IsNull(e, false) => write!(f, "{} IS NULL", Operand(e)),
                    IsNull(e, true) => write!(f, "{} IS NOT NULL", Operand(e)),
                    Add(l, r) => binary(f, l, "+", r),
                    Subtract(l, r) => binary(f, l, "-", r),
                    Multiply(l, r) => binary(f, l, "*", r),
                    Divide(l, r) => binary(f, l, "/", r),
                    Remainder(l, r) => binary(f, l, "%", r),
                    Concat(l, r) => binary(f, l, "||", r),
                    Identity(e) => write!(f, "+{}", Operand(e)),
                    Negate(e) => write!(f, "-{}", Operand(e)),
                    Like(l, r, false) => binary(f, l, "LIKE", r),
                    Like(l, r, true) => binary(f, l, "NOT LIKE", r),
                    InList {
                        expr,
                        list,
                        negated,
                    } => {
                        let items: Vec<String> = list.iter().map(|e| e.to_string()).collect();
                        let not = if *negated { "NOT " } else { "" };
                        write!(f, "{} {}IN ({})", Operand(expr), not, items.join(", "))
                    }
                    Between {
                        expr,
                        low,
                        high,
                        negated,
                    } => {
                        let not = if *negated { "NOT " } else { "" };
                        write!(
                            f,
                            "{} {}BETWEEN {} AND {}",
                            Operand(expr),
                            not,
                            Operand(low),
                            Operand(high)
                        )
                    }
                }
            }
        }
    }
}
