//! Position arithmetic for scrollable cursors.
//!
//! Rows are numbered from 1 externally and from 0 internally. The internal
//! index is clamped to `-1..=N`, where `-1` is before the first row and `N`
//! is after the last one.

/// A clamped position within `len` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollableIndex {
    len: usize,
    index: i64,
}

impl ScrollableIndex {
    /// Starts before the first row.
    pub fn new(len: usize) -> Self {
        Self { len, index: -1 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves to a clamped internal index and reports whether it is on a row.
    fn set(&mut self, index: i64) -> bool {
        self.index = index.clamp(-1, self.len as i64);
        self.is_on_row()
    }

    pub fn is_on_row(&self) -> bool {
        self.index >= 0 && self.index < self.len as i64
    }

    pub fn is_before_first(&self) -> bool {
        self.index < 0
    }

    pub fn is_after_last(&self) -> bool {
        self.index >= self.len as i64
    }

    pub fn next(&mut self) -> bool {
        self.set(self.index.saturating_add(1))
    }

    pub fn previous(&mut self) -> bool {
        self.set(self.index.saturating_sub(1))
    }

    pub fn first(&mut self) -> bool {
        self.set(0)
    }

    /// On an empty result this lands before the first row.
    pub fn last(&mut self) -> bool {
        self.set(self.len as i64 - 1)
    }

    pub fn before_first(&mut self) {
        self.index = -1;
    }

    pub fn after_last(&mut self) {
        self.index = self.len as i64;
    }

    /// Moves to a one-based row. Negative rows count back from the end, so
    /// `-1` is the last row; `0` is before the first row.
    pub fn absolute(&mut self, row: i64) -> bool {
        match row {
            0 => self.set(-1),
            row if row > 0 => self.set(row - 1),
            row => self.set((self.len as i64).saturating_add(row)),
        }
    }

    /// Moves by `offset` rows from the current position.
    pub fn relative(&mut self, offset: i64) -> bool {
        self.set(self.index.saturating_add(offset))
    }

    /// The internal index of the current row, if on a row.
    pub fn position(&self) -> Option<usize> {
        self.is_on_row().then_some(self.index as usize)
    }

    /// The one-based row number, or 0 when not on a row.
    pub fn row(&self) -> usize {
        self.position().map_or(0, |i| i + 1)
    }
}
