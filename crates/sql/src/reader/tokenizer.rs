//! Splits one logical record into field strings.
//!
//! A logical record is usually one physical line, but a quoted field may span
//! several lines; in that case the tokenizer pulls further lines from the
//! supplier and joins them with `\n`.

use super::lines::LineSupplier;
use crate::config::{QuoteStyle, TableOptions};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LineTokenizer {
    separator: Vec<char>,
    quote: Option<char>,
    style: QuoteStyle,
    trim: bool,
}

impl LineTokenizer {
    pub fn new(separator: &str, quote: Option<char>, style: QuoteStyle, trim: bool) -> Self {
        Self {
            separator: separator.chars().collect(),
            quote,
            style,
            trim,
        }
    }

    pub fn from_options(options: &TableOptions) -> Self {
        Self::new(
            &options.separator,
            options.quote,
            options.quote_style,
            options.trim_values,
        )
    }

    /// Tokenizes a record starting at `first_line`, pulling continuation
    /// lines from `more` only while a quoted field is open.
    pub fn tokenize(&self, first_line: &str, more: &mut dyn LineSupplier) -> Result<Vec<String>> {
        let mut buf: Vec<char> = first_line.chars().collect();
        let mut fields = Vec::new();
        let mut value = String::new();
        let mut in_quotes = false;
        let mut quoted = false;
        let mut i = 0;

        loop {
            // End of line terminates the last field, unless a quote is open.
            if i == buf.len() {
                if in_quotes {
                    let Some(next) = more.next_line()? else {
                        return Err(Error::UnterminatedQuote);
                    };
                    value.push('\n');
                    buf.extend(next.chars());
                    continue;
                }
                fields.push(self.finish(&mut value, quoted));
                break;
            }

            let c = buf[i];

            if self.style == QuoteStyle::C && c == '\\' && i + 1 < buf.len() {
                value.push(buf[i + 1]);
                i += 2;
                continue;
            }

            if in_quotes {
                if Some(c) != self.quote {
                    value.push(c);
                    i += 1;
                    continue;
                }
                if buf.get(i + 1) == Some(&c) {
                    value.push(c);
                    if self.style == QuoteStyle::C {
                        value.push(c);
                    }
                    i += 2;
                    continue;
                }
                let mut next = i + 1;
                if self.trim {
                    while next < buf.len() && buf[next].is_whitespace() {
                        next += 1;
                    }
                }
                if next == buf.len() || self.separator_at(&buf, next) {
                    in_quotes = false;
                    i = next;
                    continue;
                }
                return Err(Error::InvalidQuoting {
                    position: i,
                    line: buf.iter().collect(),
                });
            }

            if self.separator_at(&buf, i) {
                fields.push(self.finish(&mut value, quoted));
                quoted = false;
                i += self.separator.len();
                continue;
            }
            if value.is_empty() && !quoted {
                if Some(c) == self.quote {
                    in_quotes = true;
                    quoted = true;
                    i += 1;
                    continue;
                }
                if self.trim && c.is_whitespace() {
                    i += 1;
                    continue;
                }
            }
            value.push(c);
            i += 1;
        }

        Ok(fields)
    }

    fn separator_at(&self, buf: &[char], i: usize) -> bool {
        buf[i..].starts_with(&self.separator)
    }

    /// Completes the current field. Trailing whitespace of unquoted fields is
    /// removed when trimming; quoted content is kept as written.
    fn finish(&self, value: &mut String, quoted: bool) -> String {
        let field = std::mem::take(value);
        if self.trim && !quoted {
            field.trim_end().to_string()
        } else {
            field
        }
    }
}
