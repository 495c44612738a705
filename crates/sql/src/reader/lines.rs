//! Physical line suppliers
//!
//! A [`LineSupplier`] yields successive physical lines of a table's input,
//! without line terminators, and reports end of input with `None`.

use crate::error::Result;
use std::collections::VecDeque;
use std::io::BufRead;

pub trait LineSupplier {
    /// Returns the next physical line, or None at end of input.
    fn next_line(&mut self) -> Result<Option<String>>;

    /// Releases the underlying input. Further calls to `next_line` return
    /// None. Closing more than once is a no-op.
    fn close(&mut self) {}
}

/// Reads lines from any buffered reader, accepting `\n` and `\r\n`
/// terminators.
pub struct ReaderLines<R> {
    reader: Option<R>,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: BufRead> LineSupplier for ReaderLines<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

/// Lines held in memory.
#[derive(Debug, Default, Clone)]
pub struct VecLines {
    lines: VecDeque<String>,
}

impl VecLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits text into lines the same way [`ReaderLines`] does.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

impl LineSupplier for VecLines {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn close(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_lines_strips_terminators() {
        let mut lines = ReaderLines::new(Cursor::new("a,b\r\nc,d\n\ne"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("a,b"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("c,d"));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some(""));
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("e"));
        assert_eq!(lines.next_line().unwrap(), None);
    }

    #[test]
    fn test_close_ends_input() {
        let mut lines = ReaderLines::new(Cursor::new("a\nb\n"));
        lines.close();
        lines.close();
        assert_eq!(lines.next_line().unwrap(), None);

        let mut lines = VecLines::from_text("x\ny");
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("x"));
        lines.close();
        assert_eq!(lines.next_line().unwrap(), None);
    }
}
