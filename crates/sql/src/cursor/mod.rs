//! Result cursors
//!
//! A [`ForwardCursor`] pulls rows one at a time and may stream them straight
//! from the input file. A [`ScrollableCursor`] holds the whole result in
//! memory, having released the input, and can move in both directions.

pub mod index;

pub use index::ScrollableIndex;

use crate::error::{Error, Result};
use crate::planning::ColumnMetadata;
use crate::types::{Row, Rows, Value};
use std::sync::Arc;

/// Column lookup shared by both cursor kinds.
#[derive(Clone, Debug)]
struct Columns {
    metadata: Arc<Vec<ColumnMetadata>>,
}

impl Columns {
    /// Finds a column by label, case-insensitively. The first match wins when
    /// labels repeat.
    fn index_of(&self, name: &str) -> Result<usize> {
        self.metadata
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidColumn(name.to_string()))
    }
}

/// A forward-only cursor.
pub struct ForwardCursor {
    rows: Option<Rows<'static>>,
    current: Option<Row>,
    row_number: usize,
    exhausted: bool,
    columns: Columns,
}

impl ForwardCursor {
    pub fn new(rows: Rows<'static>, metadata: Arc<Vec<ColumnMetadata>>) -> Self {
        Self {
            rows: Some(rows),
            current: None,
            row_number: 0,
            exhausted: false,
            columns: Columns { metadata },
        }
    }

    /// Moves to the next row. Returns false once the result is exhausted, at
    /// which point the input has been released. A failed fetch also closes
    /// the cursor.
    pub fn advance(&mut self) -> Result<bool> {
        let Some(rows) = self.rows.as_mut() else {
            return if self.exhausted {
                Ok(false)
            } else {
                Err(Error::CursorClosed)
            };
        };
        match rows.next() {
            Some(Ok(row)) => {
                self.current = Some(row);
                self.row_number += 1;
                Ok(true)
            }
            Some(Err(err)) => {
                self.close();
                Err(err)
            }
            None => {
                self.current = None;
                self.rows = None;
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// The current row, if positioned on one.
    pub fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// One-based number of the current row, or 0 when not on a row.
    pub fn row_number(&self) -> usize {
        if self.current.is_some() { self.row_number } else { 0 }
    }

    /// The value of a zero-based column in the current row.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.current.as_ref()?.get(index)
    }

    /// The value of the column with the given label in the current row.
    pub fn get_by_name(&self, name: &str) -> Result<Option<&Value>> {
        let index = self.columns.index_of(name)?;
        Ok(self.get(index))
    }

    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.columns.metadata
    }

    /// Releases the input. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.rows = None;
        self.current = None;
        self.exhausted = false;
    }

    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Drains the remaining rows.
    pub fn collect_rows(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while self.advance()? {
            if let Some(row) = self.current.take() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

/// A cursor over a fully materialized result.
pub struct ScrollableCursor {
    rows: Vec<Row>,
    index: ScrollableIndex,
    columns: Columns,
}

impl ScrollableCursor {
    pub fn new(rows: Vec<Row>, metadata: Arc<Vec<ColumnMetadata>>) -> Self {
        Self {
            index: ScrollableIndex::new(rows.len()),
            rows,
            columns: Columns { metadata },
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn next(&mut self) -> bool {
        self.index.next()
    }

    pub fn previous(&mut self) -> bool {
        self.index.previous()
    }

    pub fn first(&mut self) -> bool {
        self.index.first()
    }

    pub fn last(&mut self) -> bool {
        self.index.last()
    }

    pub fn before_first(&mut self) {
        self.index.before_first()
    }

    pub fn after_last(&mut self) {
        self.index.after_last()
    }

    /// Moves to a one-based row; negative rows count from the end.
    pub fn absolute(&mut self, row: i64) -> bool {
        self.index.absolute(row)
    }

    pub fn relative(&mut self, offset: i64) -> bool {
        self.index.relative(offset)
    }

    pub fn is_before_first(&self) -> bool {
        self.index.is_before_first()
    }

    pub fn is_after_last(&self) -> bool {
        self.index.is_after_last()
    }

    /// One-based number of the current row, or 0 when not on a row.
    pub fn row_number(&self) -> usize {
        self.index.row()
    }

    pub fn row(&self) -> Option<&Row> {
        self.rows.get(self.index.position()?)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.row()?.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<&Value>> {
        let index = self.columns.index_of(name)?;
        Ok(self.get(index))
    }

    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.columns.metadata
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn metadata() -> Arc<Vec<ColumnMetadata>> {
        Arc::new(vec![
            ColumnMetadata {
                name: "ID".into(),
                ordinal: 1,
                data_type: DataType::I32,
                table: "t".into(),
            },
            ColumnMetadata {
                name: "name".into(),
                ordinal: 2,
                data_type: DataType::Str,
                table: "t".into(),
            },
        ])
    }

    fn rows() -> Vec<Row> {
        (1..=3)
            .map(|i| vec![Value::I32(i), Value::from(format!("n{}", i))])
            .collect()
    }

    #[test]
    fn test_forward_cursor() -> Result<()> {
        let mut cursor = ForwardCursor::new(Box::new(rows().into_iter().map(Ok)), metadata());
        assert_eq!(cursor.get(0), None);
        assert!(cursor.advance()?);
        assert_eq!(cursor.get(0), Some(&Value::I32(1)));
        assert_eq!(cursor.get_by_name("NAME")?, Some(&Value::from("n1")));
        assert_eq!(
            cursor.get_by_name("missing"),
            Err(Error::InvalidColumn("missing".into()))
        );
        assert!(cursor.advance()?);
        assert!(cursor.advance()?);
        assert_eq!(cursor.row_number(), 3);
        assert!(!cursor.advance()?);
        assert!(cursor.is_closed());
        assert_eq!(cursor.row(), None);
        assert!(!cursor.advance()?);
        cursor.close();
        cursor.close();
        assert_eq!(cursor.advance(), Err(Error::CursorClosed));
        Ok(())
    }

    #[test]
    fn test_forward_cursor_error_closes() {
        let results: Vec<Result<Row>> = vec![Ok(vec![]), Err(Error::UnterminatedQuote)];
        let mut cursor = ForwardCursor::new(Box::new(results.into_iter()), metadata());
        assert_eq!(cursor.advance(), Ok(true));
        assert_eq!(cursor.advance(), Err(Error::UnterminatedQuote));
        assert!(cursor.is_closed());
    }

    #[test]
    fn test_scrollable_cursor() {
        let mut cursor = ScrollableCursor::new(rows(), metadata());
        assert_eq!(cursor.len(), 3);
        assert!(cursor.row().is_none());
        assert!(cursor.last());
        assert_eq!(cursor.get(0), Some(&Value::I32(3)));
        assert!(cursor.relative(-2));
        assert_eq!(cursor.row_number(), 1);
        assert!(!cursor.previous());
        assert_eq!(cursor.get(0), None);
        assert!(cursor.absolute(-2));
        assert_eq!(cursor.get_by_name("id"), Ok(Some(&Value::I32(2))));
        cursor.after_last();
        assert!(cursor.is_after_last());
        assert_eq!(cursor.row_number(), 0);
    }
}
