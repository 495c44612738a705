use std::iter::Peekable;
use std::ops::Add;

use super::{Keyword, Lexer, Token, ast};
use crate::error::{Error, Result};
use crate::types::Direction;

/// The SQL parser takes tokens from the lexer and parses the SQL syntax into an
/// Abstract Syntax Tree (AST).
///
/// The AST represents the syntactic structure of a SQL query (e.g. the SELECT
/// and FROM clauses, values, arithmetic expressions, etc.). However, it only
/// ensures the syntax is well-formed, and does not know whether e.g. a given
/// table or column exists -- that is the job of the planner.
pub struct Parser<'a> {
    pub lexer: Peekable<Lexer<'a>>,
    /// Counter for parameter placeholders (?)
    param_count: usize,
}

impl Parser<'_> {
    /// Parses the input string into a SELECT statement AST. The entire string
    /// must be parsed as a single statement, ending with an optional semicolon.
    pub fn parse(statement: &str) -> Result<ast::SelectStatement> {
        let mut parser = Self::new(statement);
        let statement = parser.parse_select()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.lexer.next().transpose()? {
            return Err(Error::ParseError(format!("unexpected token {}", token)));
        }
        Ok(statement)
    }

    /// Parse the input string into a SQL expression AST. The entire string must
    /// be parsed as a single expression. Only used in tests.
    #[cfg(test)]
    pub fn parse_expr(expr: &str) -> Result<ast::Expression> {
        let mut parser = Self::new(expr);
        let expression = parser.parse_expression()?;
        if let Some(token) = parser.lexer.next().transpose()? {
            return Err(Error::ParseError(format!("unexpected token {}", token)));
        }
        Ok(expression)
    }

    /// Creates a new parser for the given raw SQL string.
    fn new(input: &str) -> Parser<'_> {
        Parser {
            lexer: Lexer::new(input).peekable(),
            param_count: 0,
        }
    }

    /// Fetches the next lexer token, or errors if none is found.
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .transpose()?
            .ok_or_else(|| Error::ParseError("unexpected end of input".into()))
    }

    /// Returns the next identifier, or errors if not found.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::ParseError(format!(
                "expected identifier, got {}",
                token
            ))),
        }
    }

    /// Returns the next lexer token if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Passes the next lexer token through the closure, consuming it if the
    /// closure returns Some. Returns the result of the closure.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        self.peek().ok()?.map(f)?.inspect(|_| drop(self.next()))
    }

    /// Consumes the next lexer token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    /// Consumes the next lexer token if it's the expected token, or errors.
    fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::ParseError(format!(
                "expected token {}, found {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes the next lexer token if it is the given token. Equivalent to
    /// next_is(), but expresses intent better.
    fn skip(&mut self, token: Token) {
        self.next_is(token);
    }

    /// Peeks the next lexer token if any, but transposes it for convenience.
    fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer
            .peek()
            .map(|r| r.as_ref().map_err(|err| err.clone()))
            .transpose()
    }

    /// Parses a SELECT statement.
    fn parse_select(&mut self) -> Result<ast::SelectStatement> {
        self.expect(Keyword::Select.into())?;
        let distinct = self.next_is(Keyword::Distinct.into());
        if !distinct {
            self.skip(Keyword::All.into());
        }
        let select = self.parse_select_clause()?;
        let from = self.parse_from_clause()?;
        let r#where = self.parse_where_clause()?;
        let group_by = self.parse_group_by_clause()?;
        let having = self.parse_having_clause()?;
        let order_by = self.parse_order_by_clause()?;

        // LIMIT and OFFSET may appear in either order.
        let (mut limit, mut offset) = (None, None);
        loop {
            if limit.is_none() && self.next_is(Keyword::Limit.into()) {
                limit = Some(self.parse_row_count("LIMIT")?);
            } else if offset.is_none() && self.next_is(Keyword::Offset.into()) {
                offset = Some(self.parse_row_count("OFFSET")?);
            } else {
                break;
            }
        }

        Ok(ast::SelectStatement {
            distinct,
            select,
            from,
            r#where,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    /// Parses the SELECT expression list.
    fn parse_select_clause(&mut self) -> Result<Vec<(ast::Expression, Option<String>)>> {
        let mut select = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let mut alias = None;
            if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
                if expr == ast::Expression::All {
                    return Err(Error::ParseError("can't alias *".into()));
                }
                alias = Some(self.next_ident()?);
            }
            select.push((expr, alias));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(select)
    }

    /// Parses the FROM clause. Exactly one table is supported.
    fn parse_from_clause(&mut self) -> Result<ast::FromClause> {
        self.expect(Keyword::From.into())?;
        let name = self.next_ident()?;
        let mut alias = None;
        if self.next_is(Keyword::As.into()) || matches!(self.peek()?, Some(Token::Ident(_))) {
            alias = Some(self.next_ident()?)
        };
        if self.peek()? == Some(&Token::Comma) {
            return Err(Error::ParseError(
                "queries over more than one table are not supported".into(),
            ));
        }
        Ok(ast::FromClause { name, alias })
    }

    /// Parses a WHERE clause, if present.
    fn parse_where_clause(&mut self) -> Result<Option<ast::Expression>> {
        if !self.next_is(Keyword::Where.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses a GROUP BY clause, if present.
    fn parse_group_by_clause(&mut self) -> Result<Vec<ast::Expression>> {
        if !self.next_is(Keyword::Group.into()) {
            return Ok(Vec::new());
        }
        let mut group_by = Vec::new();
        self.expect(Keyword::By.into())?;
        loop {
            group_by.push(self.parse_expression()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(group_by)
    }

    /// Parses a HAVING clause, if present.
    fn parse_having_clause(&mut self) -> Result<Option<ast::Expression>> {
        if !self.next_is(Keyword::Having.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses an ORDER BY clause, if present.
    fn parse_order_by_clause(&mut self) -> Result<Vec<(ast::Expression, Direction)>> {
        if !self.next_is(Keyword::Order.into()) {
            return Ok(Vec::new());
        }
        let mut order_by = Vec::new();
        self.expect(Keyword::By.into())?;
        loop {
            let expr = self.parse_expression()?;
            let order = self
                .next_if_map(|token| match token {
                    Token::Keyword(Keyword::Asc) => Some(Direction::Ascending),
                    Token::Keyword(Keyword::Desc) => Some(Direction::Descending),
                    _ => None,
                })
                .unwrap_or_default();
            order_by.push((expr, order));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(order_by)
    }

    /// Parses a LIMIT or OFFSET value: a non-negative integer or `?`.
    fn parse_row_count(&mut self, clause: &str) -> Result<ast::RowCount> {
        match self.next()? {
            Token::Number(n) => n.parse().map(ast::RowCount::Literal).map_err(|_| {
                Error::ParseError(format!("{} must be a non-negative integer, got {}", clause, n))
            }),
            Token::Question => {
                let index = self.param_count;
                self.param_count += 1;
                Ok(ast::RowCount::Parameter(index))
            }
            Token::Minus => Err(Error::ParseError(format!("{} must not be negative", clause))),
            token => Err(Error::ParseError(format!(
                "expected number after {}, found {}",
                clause, token
            ))),
        }
    }

    /// Parses an expression using the precedence climbing algorithm. See:
    ///
    /// <https://en.wikipedia.org/wiki/Operator-precedence_parser#Precedence_climbing_method>
    ///
    /// Operator precedence, where 1 is the lowest:
    ///
    /// * 1: OR
    /// * 2: AND
    /// * 3: NOT
    /// * 4: =, !=, LIKE, IS, IN, BETWEEN
    /// * 5: <, <=, >, >=
    /// * 6: +, -, ||
    /// * 7: *, /, %
    /// * 10: +, - (prefix)
    ///
    /// Prefix operators are right-associative, all others left-associative.
    /// Left-associative operators get a +1 to their precedence, so that they
    /// bind tighter to their left operand.
    fn parse_expression(&mut self) -> Result<ast::Expression> {
        self.parse_expression_at(0)
    }

    /// Parses an expression at the given minimum precedence.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<ast::Expression> {
        // If the left-hand side is a prefix operator, recursively parse it and
        // its operand. Otherwise, parse the left-hand side as an atom.
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let next_precedence = prefix.precedence() + prefix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            prefix.into_expression(rhs)
        } else {
            self.parse_expression_atom()?
        };

        // Alternate between infix and postfix operators until neither
        // applies. Consider e.g. `a + b IS NULL AND c`.
        loop {
            if let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
                lhs = postfix.into_expression(lhs);
                continue;
            }
            if let Some(infix) = self.parse_infix_operator_at(min_precedence) {
                let next_precedence = infix.precedence() + infix.associativity();
                let rhs = self.parse_expression_at(next_precedence)?;
                lhs = infix.into_expression(lhs, rhs);
                continue;
            }
            break;
        }

        Ok(lhs)
    }

    /// Parses an expression atom. This is either:
    ///
    /// * A literal value.
    /// * A column name.
    /// * A function call.
    /// * A parenthesized expression.
    fn parse_expression_atom(&mut self) -> Result<ast::Expression> {
        Ok(match self.next()? {
            // All columns.
            Token::Asterisk => ast::Expression::All,

            // Literal value.
            Token::Number(n) if n.chars().all(|c| c.is_ascii_digit()) => match n.parse::<i64>() {
                Ok(value) => ast::Literal::Integer(value).into(),
                Err(_) => ast::Literal::Float(
                    n.parse()
                        .map_err(|e| Error::ParseError(format!("invalid number: {}", e)))?,
                )
                .into(),
            },
            Token::Number(n) => ast::Literal::Float(
                n.parse()
                    .map_err(|e| Error::ParseError(format!("invalid float: {}", e)))?,
            )
            .into(),
            Token::String(s) => ast::Literal::String(s).into(),
            Token::Keyword(Keyword::True) => ast::Literal::Boolean(true).into(),
            Token::Keyword(Keyword::False) => ast::Literal::Boolean(false).into(),
            Token::Keyword(Keyword::Null) => ast::Literal::Null.into(),

            // Function call.
            Token::Ident(name) if self.next_is(Token::OpenParen) => {
                let distinct = self.next_is(Keyword::Distinct.into());
                let mut args = Vec::new();
                while !self.next_is(Token::CloseParen) {
                    if !args.is_empty() {
                        self.expect(Token::Comma)?;
                    }
                    args.push(self.parse_expression()?);
                }
                ast::Expression::Function {
                    name,
                    args,
                    distinct,
                }
            }

            // Column name, either qualified as table.column or unqualified.
            Token::Ident(table) if self.next_is(Token::Period) => {
                ast::Expression::Column(Some(table), self.next_ident()?)
            }
            Token::Ident(column) => ast::Expression::Column(None, column),

            // Parameter placeholder (?)
            Token::Question => {
                let param_idx = self.param_count;
                self.param_count += 1;
                ast::Expression::Parameter(param_idx)
            }

            // Parenthesized expression.
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::CloseParen)?;
                expr
            }

            token => {
                return Err(Error::ParseError(format!(
                    "expected expression atom, found {}",
                    token
                )));
            }
        })
    }

    /// Parses a prefix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<PrefixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Keyword(Keyword::Not) => PrefixOperator::Not,
                Token::Minus => PrefixOperator::Minus,
                Token::Plus => PrefixOperator::Plus,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses an infix operator, if there is one and its precedence is at least
    /// min_precedence.
    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<InfixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Asterisk => InfixOperator::Multiply,
                Token::Concat => InfixOperator::Concat,
                Token::Equal => InfixOperator::Equal,
                Token::GreaterThan => InfixOperator::GreaterThan,
                Token::GreaterThanOrEqual => InfixOperator::GreaterThanOrEqual,
                Token::Keyword(Keyword::And) => InfixOperator::And,
                Token::Keyword(Keyword::Like) => InfixOperator::Like,
                Token::Keyword(Keyword::Or) => InfixOperator::Or,
                Token::LessOrGreaterThan => InfixOperator::NotEqual,
                Token::LessThan => InfixOperator::LessThan,
                Token::LessThanOrEqual => InfixOperator::LessThanOrEqual,
                Token::Minus => InfixOperator::Subtract,
                Token::NotEqual => InfixOperator::NotEqual,
                Token::Percent => InfixOperator::Remainder,
                Token::Plus => InfixOperator::Add,
                Token::Slash => InfixOperator::Divide,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses a postfix operator, if there is one and its precedence is at
    /// least min_precedence. These are all multi-token operators at the
    /// precedence of `=`: IS [NOT] NULL, NOT LIKE, [NOT] IN and
    /// [NOT] BETWEEN.
    fn parse_postfix_operator_at(
        &mut self,
        min_precedence: Precedence,
    ) -> Result<Option<PostfixOperator>> {
        if POSTFIX_PRECEDENCE < min_precedence {
            return Ok(None);
        }
        let Some(Token::Keyword(keyword)) = self.peek()? else {
            return Ok(None);
        };
        let keyword = *keyword;
        let operand_precedence = POSTFIX_PRECEDENCE + Associativity::Left;

        match keyword {
            Keyword::Is => {
                self.next()?;
                let negated = self.next_is(Keyword::Not.into());
                self.expect(Keyword::Null.into())?;
                Ok(Some(PostfixOperator::IsNull { negated }))
            }
            Keyword::Not | Keyword::In | Keyword::Between => {
                self.next()?;
                let negated = keyword == Keyword::Not;
                let keyword = match negated {
                    true => match self.next()? {
                        Token::Keyword(k @ (Keyword::Like | Keyword::In | Keyword::Between)) => k,
                        token => {
                            return Err(Error::ParseError(format!(
                                "expected LIKE, IN or BETWEEN after NOT, found {}",
                                token
                            )));
                        }
                    },
                    false => keyword,
                };
                Ok(Some(match keyword {
                    Keyword::Like => PostfixOperator::NotLike {
                        pattern: self.parse_expression_at(operand_precedence)?,
                    },
                    Keyword::In => {
                        self.expect(Token::OpenParen)?;
                        let mut list = Vec::new();
                        while !self.next_is(Token::CloseParen) {
                            if !list.is_empty() {
                                self.expect(Token::Comma)?;
                            }
                            list.push(self.parse_expression()?);
                        }
                        if list.is_empty() {
                            return Err(Error::ParseError("IN list must not be empty".into()));
                        }
                        PostfixOperator::InList { list, negated }
                    }
                    _ => {
                        let low = self.parse_expression_at(operand_precedence)?;
                        self.expect(Keyword::And.into())?;
                        let high = self.parse_expression_at(operand_precedence)?;
                        PostfixOperator::Between { low, high, negated }
                    }
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Operator precedence.
type Precedence = u8;

/// Precedence of the multi-token postfix operators.
const POSTFIX_PRECEDENCE: Precedence = 4;

/// Operator associativity.
enum Associativity {
    Left,
    Right,
}

impl Add<Associativity> for Precedence {
    type Output = Self;

    fn add(self, rhs: Associativity) -> Self {
        // Left-associative operators have increased precedence, so they bind
        // tighter to their left-hand side.
        self + match rhs {
            Associativity::Left => 1,
            Associativity::Right => 0,
        }
    }
}

/// Prefix operators.
enum PrefixOperator {
    Minus, // -a
    Not,   // NOT a
    Plus,  // +a
}

impl PrefixOperator {
    /// The operator precedence.
    fn precedence(&self) -> Precedence {
        match self {
            Self::Not => 3,
            Self::Minus | Self::Plus => 10,
        }
    }

    // The operator associativity. Prefix operators are right-associative by
    // definition.
    fn associativity(&self) -> Associativity {
        Associativity::Right
    }

    /// Builds an AST expression for the operator. Negative numeric literals
    /// are folded so that `-5` is a literal rather than an operation.
    fn into_expression(self, rhs: ast::Expression) -> ast::Expression {
        match (self, rhs) {
            (Self::Minus, ast::Expression::Literal(ast::Literal::Integer(i))) => {
                ast::Literal::Integer(-i).into()
            }
            (Self::Minus, ast::Expression::Literal(ast::Literal::Float(f))) => {
                ast::Literal::Float(-f).into()
            }
            (Self::Plus, rhs) => ast::Operator::Identity(Box::new(rhs)).into(),
            (Self::Minus, rhs) => ast::Operator::Negate(Box::new(rhs)).into(),
            (Self::Not, rhs) => ast::Operator::Not(Box::new(rhs)).into(),
        }
    }
}

/// Infix operators.
enum InfixOperator {
    Add,                // a + b
    And,                // a AND b
    Concat,             // a || b
    Divide,             // a / b
    Equal,              // a = b
    GreaterThan,        // a > b
    GreaterThanOrEqual, // a >= b
    LessThan,           // a < b
    LessThanOrEqual,    // a <= b
    Like,               // a LIKE b
    Multiply,           // a * b
    NotEqual,           // a != b
    Or,                 // a OR b
    Remainder,          // a % b
    Subtract,           // a - b
}

impl InfixOperator {
    /// The operator precedence.
    ///
    /// Mostly follows Postgres, except IS and LIKE having same precedence as =.
    /// This is similar to SQLite and MySQL.
    fn precedence(&self) -> Precedence {
        match self {
            Self::Or => 1,
            Self::And => 2,
            // Self::Not => 3
            Self::Equal | Self::NotEqual | Self::Like => 4, // also IS, IN, BETWEEN
            Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => 5,
            Self::Add | Self::Subtract | Self::Concat => 6,
            Self::Multiply | Self::Divide | Self::Remainder => 7,
        }
    }

    /// The operator associativity.
    fn associativity(&self) -> Associativity {
        Associativity::Left
    }

    /// Builds an AST expression for the infix operator.
    fn into_expression(self, lhs: ast::Expression, rhs: ast::Expression) -> ast::Expression {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Add => ast::Operator::Add(lhs, rhs).into(),
            Self::And => ast::Operator::And(lhs, rhs).into(),
            Self::Concat => ast::Operator::Concat(lhs, rhs).into(),
            Self::Divide => ast::Operator::Divide(lhs, rhs).into(),
            Self::Equal => ast::Operator::Equal(lhs, rhs).into(),
            Self::GreaterThan => ast::Operator::GreaterThan(lhs, rhs).into(),
            Self::GreaterThanOrEqual => ast::Operator::GreaterThanOrEqual(lhs, rhs).into(),
            Self::LessThan => ast::Operator::LessThan(lhs, rhs).into(),
            Self::LessThanOrEqual => ast::Operator::LessThanOrEqual(lhs, rhs).into(),
            Self::Like => ast::Operator::Like(lhs, rhs, false).into(),
            Self::Multiply => ast::Operator::Multiply(lhs, rhs).into(),
            Self::NotEqual => ast::Operator::NotEqual(lhs, rhs).into(),
            Self::Or => ast::Operator::Or(lhs, rhs).into(),
            Self::Remainder => ast::Operator::Remainder(lhs, rhs).into(),
            Self::Subtract => ast::Operator::Subtract(lhs, rhs).into(),
        }
    }
}

/// Postfix operators.
enum PostfixOperator {
    IsNull { negated: bool },                   // a IS [NOT] NULL
    NotLike { pattern: ast::Expression },       // a NOT LIKE b
    InList { list: Vec<ast::Expression>, negated: bool }, // a [NOT] IN (..)
    Between {
        low: ast::Expression,
        high: ast::Expression,
        negated: bool,
    }, // a [NOT] BETWEEN b AND c
}

impl PostfixOperator {
    /// Builds an AST expression for the operator.
    fn into_expression(self, lhs: ast::Expression) -> ast::Expression {
        let lhs = Box::new(lhs);
        match self {
            Self::IsNull { negated } => ast::Operator::IsNull(lhs, negated).into(),
            Self::NotLike { pattern } => ast::Operator::Like(lhs, Box::new(pattern), true).into(),
            Self::InList { list, negated } => ast::Operator::InList {
                expr: lhs,
                list,
                negated,
            }
            .into(),
            Self::Between { low, high, negated } => ast::Operator::Between {
                expr: lhs,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Expression, Literal, Operator};

    fn col(name: &str) -> Box<Expression> {
        Box::new(Expression::Column(None, name.into()))
    }

    fn int(i: i64) -> Box<Expression> {
        Box::new(Literal::Integer(i).into())
    }

    #[test]
    fn test_parse_full_select() {
        let stmt = Parser::parse(
            "SELECT DISTINCT t.id AS ident, COUNT(*) c FROM people t \
             WHERE id > 1 GROUP BY id HAVING COUNT(*) > 1 \
             ORDER BY ident DESC, 2 LIMIT ? OFFSET 3;",
        )
        .unwrap();
        assert!(stmt.distinct);
        assert_eq!(stmt.select.len(), 2);
        assert_eq!(stmt.select[0].1.as_deref(), Some("ident"));
        assert_eq!(
            stmt.select[0].0,
            Expression::Column(Some("t".into()), "id".into())
        );
        assert_eq!(stmt.from.name, "people");
        assert_eq!(stmt.from.alias.as_deref(), Some("t"));
        assert_eq!(stmt.group_by.len(), 1);
        assert!(stmt.having.is_some());
        assert_eq!(stmt.order_by[0].1, Direction::Descending);
        assert_eq!(stmt.order_by[1].1, Direction::Ascending);
        assert_eq!(stmt.limit, Some(ast::RowCount::Parameter(0)));
        assert_eq!(stmt.offset, Some(ast::RowCount::Literal(3)));
    }

    #[test]
    fn test_offset_before_limit() {
        let stmt = Parser::parse("SELECT * FROM t OFFSET 2 LIMIT 3").unwrap();
        assert_eq!(stmt.limit, Some(ast::RowCount::Literal(3)));
        assert_eq!(stmt.offset, Some(ast::RowCount::Literal(2)));
    }

    #[test]
    fn test_negative_offset_rejected() {
        for sql in [
            "SELECT * FROM t OFFSET -1",
            "SELECT * FROM t LIMIT -5",
            "SELECT * FROM t LIMIT 1.5",
        ] {
            assert!(
                matches!(Parser::parse(sql), Err(Error::ParseError(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_precedence() {
        let expr = Parser::parse_expr("a + 2 * 3 = 7 AND NOT b OR c").unwrap();
        let product = Box::new(Operator::Multiply(int(2), int(3)).into());
        let expected: Expression = Operator::Or(
            Box::new(
                Operator::And(
                    Box::new(
                        Operator::Equal(
                            Box::new(Operator::Add(col("a"), product).into()),
                            int(7),
                        )
                        .into(),
                    ),
                    Box::new(Operator::Not(col("b")).into()),
                )
                .into(),
            ),
            col("c"),
        )
        .into();
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_postfix_operators() {
        let expr = Parser::parse_expr("a + b IS NULL AND c NOT LIKE 'x%'").unwrap();
        assert_eq!(expr.to_string(), "((a + b) IS NULL) AND (c NOT LIKE 'x%')");

        let expr = Parser::parse_expr("a NOT BETWEEN 1 AND 2 + 3 OR b IN (1, 2)").unwrap();
        assert_eq!(
            expr.to_string(),
            "(a NOT BETWEEN 1 AND (2 + 3)) OR (b IN (1, 2))"
        );

        let expr = Parser::parse_expr("x IS NOT NULL").unwrap();
        assert_eq!(expr, Operator::IsNull(col("x"), true).into());
    }

    #[test]
    fn test_negative_literals_folded() {
        assert_eq!(Parser::parse_expr("-5").unwrap(), *int(-5));
        assert_eq!(
            Parser::parse_expr("-a").unwrap(),
            Operator::Negate(col("a")).into()
        );
    }

    #[test]
    fn test_function_calls() {
        let expr = Parser::parse_expr("count(DISTINCT name)").unwrap();
        assert_eq!(
            expr,
            Expression::Function {
                name: "count".into(),
                args: vec![*col("name")],
                distinct: true
            }
        );
        assert_eq!(expr.to_string(), "COUNT(DISTINCT name)");
        assert_eq!(Parser::parse_expr("COUNT(*)").unwrap().to_string(), "COUNT(*)");
    }

    #[test]
    fn test_statements_hash_by_structure() {
        use std::collections::HashSet;
        let sql = "SELECT a FROM t ORDER BY a DESC, b";
        let statements: HashSet<_> = [
            Parser::parse(sql).unwrap(),
            Parser::parse(sql).unwrap(),
            Parser::parse("SELECT a FROM t ORDER BY a, b").unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        for sql in [
            "SELECT FROM t",
            "SELECT a FROM",
            "SELECT a FROM t, u",
            "SELECT a FROM t WHERE",
            "SELECT * AS x FROM t",
            "SELECT a FROM t extra junk",
            "DELETE FROM t",
            "SELECT a FROM t WHERE a NOT b",
            "SELECT a FROM t WHERE a IN ()",
        ] {
            assert!(Parser::parse(sql).is_err(), "{}", sql);
        }
    }
}
