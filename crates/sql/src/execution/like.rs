//! LIKE pattern matching
//!
//! `%` matches any run of characters (including none), `_` matches exactly
//! one character and `\` makes the following character literal. Patterns are
//! translated to anchored regular expressions.

use crate::error::{Error, Result};
use crate::types::Value;
use regex::Regex;
use std::cell::RefCell;

thread_local! {
    // Most recently compiled pattern of this thread.
    static LAST_PATTERN: RefCell<Option<(String, Regex)>> = const { RefCell::new(None) };
}

/// Translates a LIKE pattern into an anchored regex that also matches across
/// line breaks.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(next) => regex.push_str(&regex::escape(&next.to_string())),
                None => regex.push_str(&regex::escape("\\")),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// Evaluates `value LIKE pattern`. A NULL operand never matches; other
/// non-string operands are matched by their textual form.
pub fn like(value: &Value, pattern: &Value) -> Result<bool> {
    let (Some(text), Some(pattern)) = (value.to_text(), pattern.to_text()) else {
        return Ok(false);
    };
    LAST_PATTERN.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some((cached, regex)) = cache.as_ref()
            && *cached == pattern
        {
            return Ok(regex.is_match(&text));
        }
        let regex = compile(&pattern)?;
        let matched = regex.is_match(&text);
        *cache = Some((pattern, regex));
        Ok(matched)
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&like_to_regex(pattern))
        .map_err(|e| Error::ExecutionError(format!("invalid LIKE pattern '{}': {}", pattern, e)))
}
