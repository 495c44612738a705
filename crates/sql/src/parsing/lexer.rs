//! SQL lexer: turns a query string into a stream of tokens.

use crate::error::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// A lexer token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A numeric string, with digits, decimal point and/or exponents.
    Number(String),
    /// A string literal, with escaped quotes removed.
    String(String),
    /// An identifier, as written. Double-quoted identifiers keep their case
    /// and may contain any character.
    Ident(String),
    /// A SQL keyword.
    Keyword(Keyword),

    Period,             // .
    Equal,              // =
    NotEqual,           // !=
    LessOrGreaterThan,  // <>
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    LessThan,           // <
    LessThanOrEqual,    // <=
    Plus,               // +
    Minus,              // -
    Asterisk,           // *
    Slash,              // /
    Percent,            // %
    Concat,             // ||
    Question,           // ?
    Comma,              // ,
    Semicolon,          // ;
    OpenParen,          // (
    CloseParen,         // )
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Number(n) => n,
            Self::String(s) => return write!(f, "'{}'", s.replace('\'', "''")),
            Self::Ident(s) => s,
            Self::Keyword(k) => return write!(f, "{}", k),
            Self::Period => ".",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessOrGreaterThan => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Concat => "||",
            Self::Question => "?",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
        })
    }
}

impl From<Keyword> for Token {
    fn from(keyword: Keyword) -> Self {
        Self::Keyword(keyword)
    }
}

/// Reserved SQL keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    All,
    And,
    As,
    Asc,
    Between,
    By,
    Desc,
    Distinct,
    False,
    From,
    Group,
    Having,
    In,
    Is,
    Like,
    Limit,
    Not,
    Null,
    Offset,
    Or,
    Order,
    Select,
    True,
    Where,
}

impl TryFrom<&str> for Keyword {
    type Error = &'static str;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Ok(match value.to_uppercase().as_str() {
            "ALL" => Self::All,
            "AND" => Self::And,
            "AS" => Self::As,
            "ASC" => Self::Asc,
            "BETWEEN" => Self::Between,
            "BY" => Self::By,
            "DESC" => Self::Desc,
            "DISTINCT" => Self::Distinct,
            "FALSE" => Self::False,
            "FROM" => Self::From,
            "GROUP" => Self::Group,
            "HAVING" => Self::Having,
            "IN" => Self::In,
            "IS" => Self::Is,
            "LIKE" => Self::Like,
            "LIMIT" => Self::Limit,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "OFFSET" => Self::Offset,
            "OR" => Self::Or,
            "ORDER" => Self::Order,
            "SELECT" => Self::Select,
            "TRUE" => Self::True,
            "WHERE" => Self::Where,
            _ => return Err("not a keyword"),
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::All => "ALL",
            Self::And => "AND",
            Self::As => "AS",
            Self::Asc => "ASC",
            Self::Between => "BETWEEN",
            Self::By => "BY",
            Self::Desc => "DESC",
            Self::Distinct => "DISTINCT",
            Self::False => "FALSE",
            Self::From => "FROM",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::In => "IN",
            Self::Is => "IS",
            Self::Like => "LIKE",
            Self::Limit => "LIMIT",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Offset => "OFFSET",
            Self::Or => "OR",
            Self::Order => "ORDER",
            Self::Select => "SELECT",
            Self::True => "TRUE",
            Self::Where => "WHERE",
        })
    }
}

/// The lexer iterates over tokens of a query string. Whitespace is skipped.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Result<Token>> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => match self.chars.peek() {
                Some(c) => Some(Err(Error::ParseError(format!("unexpected character {}", c)))),
                None => None,
            },
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Returns the next character if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.peek().filter(|&&c| predicate(c))?;
        self.chars.next()
    }

    /// Consumes the next character if it is the given character.
    fn next_is(&mut self, c: char) -> bool {
        self.next_if(|n| n == c).is_some()
    }

    /// Skips whitespace and `--` line comments.
    fn skip_whitespace(&mut self) {
        loop {
            while self.next_if(|c| c.is_whitespace()).is_some() {}
            let mut lookahead = self.chars.clone();
            if lookahead.next() == Some('-') && lookahead.next() == Some('-') {
                while self.next_if(|c| c != '\n').is_some() {}
                continue;
            }
            break;
        }
    }

    /// Scans the next token, if any.
    fn scan(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some('\'') => self.scan_string(),
            Some('"') => self.scan_quoted_ident(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some('.') => {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                match lookahead.peek() {
                    Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
                    _ => self.scan_symbol(),
                }
            }
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.scan_ident_or_keyword()),
            Some(_) => self.scan_symbol(),
            None => Ok(None),
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Option<Token> {
        let mut name = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            name.push(c);
        }
        match Keyword::try_from(name.as_str()) {
            Ok(keyword) => Some(Token::Keyword(keyword)),
            Err(_) => Some(Token::Ident(name)),
        }
    }

    fn scan_quoted_ident(&mut self) -> Result<Option<Token>> {
        if !self.next_is('"') {
            return Ok(None);
        }
        let mut ident = String::new();
        loop {
            match self.chars.next() {
                Some('"') if self.next_is('"') => ident.push('"'),
                Some('"') => break,
                Some(c) => ident.push(c),
                None => return Err(Error::ParseError("unexpected end of quoted identifier".into())),
            }
        }
        Ok(Some(Token::Ident(ident)))
    }

    fn scan_number(&mut self) -> Option<Token> {
        let mut number = String::new();
        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            number.push(c);
        }
        if self.next_is('.') {
            number.push('.');
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c);
            }
        }
        if let Some(exp) = self.next_if(|c| c == 'e' || c == 'E') {
            number.push(exp);
            if let Some(sign) = self.next_if(|c| c == '+' || c == '-') {
                number.push(sign);
            }
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c);
            }
        }
        Some(Token::Number(number))
    }

    fn scan_string(&mut self) -> Result<Option<Token>> {
        if !self.next_is('\'') {
            return Ok(None);
        }
        let mut string = String::new();
        loop {
            match self.chars.next() {
                Some('\'') if self.next_is('\'') => string.push('\''),
                Some('\'') => break,
                Some(c) => string.push(c),
                None => return Err(Error::ParseError("unexpected end of string literal".into())),
            }
        }
        Ok(Some(Token::String(string)))
    }

    fn scan_symbol(&mut self) -> Result<Option<Token>> {
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };
        let token = match c {
            '.' => Token::Period,
            '=' => Token::Equal,
            '>' => Token::GreaterThan,
            '<' => Token::LessThan,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '?' => Token::Question,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '!' | '|' => {
                self.chars.next();
                return match (c, self.next_is(if c == '!' { '=' } else { '|' })) {
                    ('!', true) => Ok(Some(Token::NotEqual)),
                    ('|', true) => Ok(Some(Token::Concat)),
                    _ => Err(Error::ParseError(format!("unexpected character {}", c))),
                };
            }
            _ => return Ok(None),
        };
        self.chars.next();
        Ok(Some(match token {
            Token::GreaterThan if self.next_is('=') => Token::GreaterThanOrEqual,
            Token::LessThan if self.next_is('=') => Token::LessThanOrEqual,
            Token::LessThan if self.next_is('>') => Token::LessOrGreaterThan,
            token => token,
        }))
    }
}
