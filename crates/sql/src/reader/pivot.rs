//! Pivot ("transposed") record joining.
//!
//! Some files store one entity per column rather than per line: the first N
//! lines carry per-column attributes and every later line carries S leading
//! key fields followed by one value per column. The joiner turns each such
//! line into one row per value position.

#[derive(Debug, Clone)]
pub struct PivotJoiner {
    /// The pre-read leading lines.
    leading: Vec<Vec<String>>,
    /// Number of key fields at the start of every later line.
    skip: usize,
    current: Vec<String>,
    position: usize,
}

impl PivotJoiner {
    pub fn new(leading: Vec<Vec<String>>, skip: usize) -> Self {
        Self {
            leading,
            skip,
            current: Vec::new(),
            position: 0,
        }
    }

    /// Number of fields in every joined row.
    pub fn width(&self) -> usize {
        self.leading.len() + self.skip + 1
    }

    /// Starts expanding a new line.
    pub fn start(&mut self, record: Vec<String>) {
        self.current = record;
        self.position = self.skip;
    }

    /// Emits the next joined row of the current line, or None once every
    /// value position has been emitted:
    /// `[leading_1[p], .., leading_N[p], line[0..S], line[p]]`.
    pub fn next_row(&mut self) -> Option<Vec<String>> {
        let p = self.position;
        let value = self.current.get(p)?.clone();
        self.position += 1;

        let mut row = Vec::with_capacity(self.width());
        for leading in &self.leading {
            row.push(leading.get(p).cloned().unwrap_or_default());
        }
        for i in 0..self.skip {
            row.push(self.current.get(i).cloned().unwrap_or_default());
        }
        row.push(value);
        Some(row)
    }
}
