//! SQL parser module
//!
//! This module parses raw SQL strings into a structured Abstract Syntax Tree
//! (AST). Only SELECT statements over a single table are supported.

pub mod ast;
mod lexer;
mod parser;

use crate::error::Result;

pub use lexer::{Keyword, Lexer, Token};
pub use parser::Parser;

/// Parse a SQL statement string into an AST
pub fn parse_sql(sql: &str) -> Result<ast::SelectStatement> {
    Parser::parse(sql)
}
