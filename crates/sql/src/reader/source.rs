//! Row source: a forward cursor over the logical records of one table.
//!
//! Opening a source derives the column names (from an explicit header line,
//! the file's header, or synthesized `COLUMN1..n`) and positions the cursor
//! on the first data record. Records are returned as raw field strings; typed
//! conversion happens in the executor.

use super::lines::LineSupplier;
use super::pivot::PivotJoiner;
use super::tokenizer::LineTokenizer;
use crate::config::TableOptions;
use crate::error::{Error, Result};
use std::collections::{HashSet, VecDeque};

/// Boxed line supplier owned by a row source.
pub type BoxedLines = Box<dyn LineSupplier + Send>;

/// Counts physical lines so errors can name the line a record started on.
struct CountingLines {
    inner: BoxedLines,
    count: usize,
}

impl LineSupplier for CountingLines {
    fn next_line(&mut self) -> Result<Option<String>> {
        let line = self.inner.next_line()?;
        if line.is_some() {
            self.count += 1;
        }
        Ok(line)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

pub struct RowSource {
    table: String,
    lines: CountingLines,
    tokenizer: LineTokenizer,
    columns: Vec<String>,
    /// Records read during header acquisition that are returned first.
    pending: VecDeque<Vec<String>>,
    /// Comment prefix, only honoured while the header is acquired.
    comment_prefix: Option<String>,
    ignore_unparseable: bool,
    pivot: Option<PivotJoiner>,
    closed: bool,
}

impl RowSource {
    /// Opens a source over the given lines, deriving the column names and
    /// skipping leading lines as configured.
    pub fn open(table: &str, lines: BoxedLines, options: &TableOptions) -> Result<Self> {
        let mut source = Self {
            table: table.to_string(),
            lines: CountingLines {
                inner: lines,
                count: 0,
            },
            tokenizer: LineTokenizer::from_options(options),
            columns: Vec::new(),
            pending: VecDeque::new(),
            comment_prefix: options.comment_prefix.clone(),
            ignore_unparseable: options.ignore_unparseable_lines,
            pivot: None,
            closed: false,
        };
        if let Err(err) = source.init(options) {
            source.close();
            return Err(err);
        }
        Ok(source)
    }

    fn init(&mut self, options: &TableOptions) -> Result<()> {
        for _ in 0..options.skip_leading_lines {
            if self.lines.next_line()?.is_none() {
                break;
            }
        }

        let mut names = if options.is_pivot() {
            self.init_pivot(options)?
        } else if let Some(header_line) = &options.header_line {
            if !options.suppress_headers {
                self.read_header_record()?;
            }
            self.tokenize_header(header_line)?
        } else if options.suppress_headers {
            match self.read_header_record()? {
                Some(first) => {
                    let names = synthesized_names(first.len());
                    self.pending.push_back(first);
                    names
                }
                None => Vec::new(),
            }
        } else {
            self.read_header_record()?.unwrap_or_default()
        };

        // The comment marker applies only to header acquisition.
        self.comment_prefix = None;

        if options.trim_headers {
            for name in names.iter_mut() {
                *name = name.trim().to_string();
            }
        }
        if options.defective_headers {
            for (i, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("COLUMN{}", i + 1);
                }
            }
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.to_uppercase()) {
                return Err(Error::DuplicateColumn(name.clone()));
            }
        }
        self.columns = names;

        for _ in 0..options.skip_leading_data_lines {
            let skipped = match self.pivot {
                Some(_) => self.read_raw_record()?,
                None => self.next_record()?,
            };
            if skipped.is_none() {
                break;
            }
        }

        tracing::debug!(
            "Opened table {} with columns {:?}",
            self.table,
            self.columns
        );
        Ok(())
    }

    fn init_pivot(&mut self, options: &TableOptions) -> Result<Vec<String>> {
        if !options.suppress_headers {
            self.read_header_record()?;
        }
        let mut leading = Vec::with_capacity(options.transposed_lines);
        for _ in 0..options.transposed_lines {
            match self.read_raw_record()? {
                Some(record) => leading.push(record),
                None => break,
            }
        }
        let joiner = PivotJoiner::new(leading, options.transposed_fields_to_skip);
        let names = match &options.header_line {
            Some(header_line) => self.tokenize_header(header_line)?,
            None => synthesized_names(joiner.width()),
        };
        self.pivot = Some(joiner);
        Ok(names)
    }

    fn tokenize_header(&self, header_line: &str) -> Result<Vec<String>> {
        self.tokenizer
            .tokenize(header_line, &mut super::lines::VecLines::default())
    }

    /// Reads the next record during header acquisition. Comment lines are
    /// skipped by [`Self::read_raw_record`] until the header is known.
    fn read_header_record(&mut self) -> Result<Option<Vec<String>>> {
        self.read_raw_record()
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comment_prefix
            .as_deref()
            .is_some_and(|prefix| line.starts_with(prefix))
    }

    /// The column names, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the next record, or None at end of input. The input is
    /// released when the end is reached or a record cannot be read.
    pub fn next_record(&mut self) -> Result<Option<Vec<String>>> {
        if let Some(record) = self.pending.pop_front() {
            return Ok(Some(record));
        }
        let result = if self.pivot.is_some() {
            self.next_pivot_record()
        } else {
            self.next_plain_record()
        };
        match &result {
            Ok(None) | Err(_) => self.close(),
            Ok(Some(_)) => {}
        }
        result
    }

    fn next_pivot_record(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            if let Some(row) = self.pivot.as_mut().and_then(PivotJoiner::next_row) {
                return Ok(Some(row));
            }
            let Some(record) = self.read_raw_record()? else {
                return Ok(None);
            };
            if let Some(joiner) = self.pivot.as_mut() {
                joiner.start(record);
            }
        }
    }

    fn next_plain_record(&mut self) -> Result<Option<Vec<String>>> {
        let expected = self.columns.len();
        loop {
            let start = self.lines.count + 1;
            let Some(fields) = self.read_raw_record()? else {
                return Ok(None);
            };
            if fields.len() == expected {
                return Ok(Some(fields));
            }
            if !self.ignore_unparseable {
                return Err(Error::FieldCount {
                    line: start,
                    expected,
                    found: fields.len(),
                });
            }
            tracing::warn!(
                "Skipping line {} of {}: expected {} fields, found {}",
                start,
                self.table,
                expected,
                fields.len()
            );
        }
    }

    /// Reads and tokenizes the next non-blank, non-comment record without
    /// checking its field count. Tokenization failures are skipped when unparseable lines
    /// are tolerated; in that mode single-field records are also skipped
    /// while the column count is not yet known.
    fn read_raw_record(&mut self) -> Result<Option<Vec<String>>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            let start = self.lines.count + 1;
            let Some(line) = self.lines.next_line()? else {
                return Ok(None);
            };
            if line.trim().is_empty() || self.is_comment(&line) {
                continue;
            }
            match self.tokenizer.tokenize(&line, &mut self.lines) {
                Ok(fields) => {
                    if self.ignore_unparseable && self.columns.is_empty() && fields.len() <= 1 {
                        tracing::warn!("Skipping line {} of {}: too few fields", start, self.table);
                        continue;
                    }
                    return Ok(Some(fields));
                }
                Err(err) if self.ignore_unparseable => {
                    tracing::warn!("Skipping line {} of {}: {}", start, self.table, err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Releases the input. Closing more than once is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pending.clear();
        self.lines.close();
        tracing::debug!("Closed table {}", self.table);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for RowSource {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl Drop for RowSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn synthesized_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("COLUMN{}", i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::lines::VecLines;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn open(text: &str, options: &TableOptions) -> Result<RowSource> {
        RowSource::open("t", Box::new(VecLines::from_text(text)), options)
    }

    fn collect(source: RowSource) -> Vec<Vec<String>> {
        source.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_header_and_records() {
        let source = open("ID, Name\n1,a\n\n2,b", &TableOptions::default()).unwrap();
        assert_eq!(source.columns(), ["ID", "Name"]);
        assert_eq!(collect(source), vec![vec!["1", "a"], vec!["2", "b"]]);
    }

    #[test]
    fn test_suppressed_headers() {
        let options = TableOptions {
            suppress_headers: true,
            ..Default::default()
        };
        let source = open("1,a\n2,b", &options).unwrap();
        assert_eq!(source.columns(), ["COLUMN1", "COLUMN2"]);
        assert_eq!(collect(source), vec![vec!["1", "a"], vec!["2", "b"]]);
    }

    #[test]
    fn test_explicit_header_line() {
        let options = TableOptions {
            header_line: Some("X,Y".into()),
            ..Default::default()
        };
        let source = open("A,B\n1,2", &options).unwrap();
        assert_eq!(source.columns(), ["X", "Y"]);
        assert_eq!(collect(source), vec![vec!["1", "2"]]);

        let options = TableOptions {
            header_line: Some("X,Y".into()),
            suppress_headers: true,
            ..Default::default()
        };
        let source = open("1,2\n3,4", &options).unwrap();
        assert_eq!(collect(source).len(), 2);
    }

    #[test]
    fn test_skipping_and_comments() {
        let options = TableOptions {
            skip_leading_lines: 1,
            skip_leading_data_lines: 1,
            comment_prefix: Some("#".into()),
            ..Default::default()
        };
        let source = open("garbage\n# comment\nA,B\n0,skipped\n1,2\n#3,4", &options).unwrap();
        assert_eq!(source.columns(), ["A", "B"]);
        // Comment lines after the header are data.
        assert_eq!(collect(source), vec![vec!["1", "2"], vec!["#3", "4"]]);
    }

    #[test]
    fn test_duplicate_and_defective_headers() {
        let err = open("a,A\n1,2", &TableOptions::default()).err().unwrap();
        assert_eq!(err, Error::DuplicateColumn("A".into()));

        let options = TableOptions {
            defective_headers: true,
            ..Default::default()
        };
        let source = open("a,,c\n1,2,3", &options).unwrap();
        assert_eq!(source.columns(), ["a", "COLUMN2", "c"]);
    }

    #[test]
    fn test_field_count_mismatch() {
        let mut source = open("A,B\n1,2\n3\n4,5", &TableOptions::default()).unwrap();
        assert_eq!(source.next_record().unwrap().unwrap(), vec!["1", "2"]);
        assert_eq!(
            source.next_record().unwrap_err(),
            Error::FieldCount {
                line: 3,
                expected: 2,
                found: 1
            }
        );
        assert!(source.is_closed());
    }

    #[test]
    fn test_ignore_unparseable_lines() {
        let options = TableOptions {
            ignore_unparseable_lines: true,
            ..Default::default()
        };
        let source = open("A,B\n1,2\n3\n\"bad\"x,1\n4,5", &options).unwrap();
        assert_eq!(collect(source), vec![vec!["1", "2"], vec!["4", "5"]]);
    }

    #[test]
    fn test_pivot_mode() {
        let options = TableOptions {
            transposed_lines: 1,
            transposed_fields_to_skip: 1,
            suppress_headers: true,
            ..Default::default()
        };
        let source = open(",Jan,Feb\nnorth,1,2\nsouth,3,4", &options).unwrap();
        assert_eq!(source.columns(), ["COLUMN1", "COLUMN2", "COLUMN3"]);
        assert_eq!(
            collect(source),
            vec![
                vec!["Jan", "north", "1"],
                vec!["Feb", "north", "2"],
                vec!["Jan", "south", "3"],
                vec!["Feb", "south", "4"],
            ]
        );
    }

    struct TrackedLines {
        inner: VecLines,
        closes: Arc<AtomicUsize>,
    }

    impl LineSupplier for TrackedLines {
        fn next_line(&mut self) -> Result<Option<String>> {
            self.inner.next_line()
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_input_released_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let lines = TrackedLines {
            inner: VecLines::from_text("A\n1"),
            closes: closes.clone(),
        };
        let mut source = RowSource::open("t", Box::new(lines), &TableOptions::default()).unwrap();
        assert!(source.next_record().unwrap().is_some());
        assert!(source.next_record().unwrap().is_none());
        assert!(source.next_record().unwrap().is_none());
        source.close();
        drop(source);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
