//! Common test utilities for query integration tests
#![allow(dead_code)]

use csvql::{Config, Database, Error, Row, ScrollableCursor, Value};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

/// Test context that owns a temporary table directory and the connection
/// configuration, and provides query helpers
pub struct TestContext {
    dir: TempDir,
    pub config: Config,
}

impl TestContext {
    /// Create a new test context with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            config,
        }
    }

    /// Write a table file with the configured extension
    pub fn write_table(&mut self, name: &str, contents: &str) -> &mut Self {
        let path = self
            .dir
            .path()
            .join(format!("{}{}", name, self.config.file_extension));
        fs::write(path, contents).expect("Failed to write table");
        self
    }

    /// Open a connection over the table directory
    pub fn database(&self) -> Database {
        Database::open_directory(self.dir.path(), self.config.clone())
            .expect("Failed to open database")
    }

    /// Query SQL and return rows keyed by output column label
    pub fn query(&self, sql: &str) -> Vec<HashMap<String, Value>> {
        let query = self
            .database()
            .prepare(sql)
            .unwrap_or_else(|e| panic!("Prepare failed: {} - Error: {}", sql, e));
        let labels: Vec<String> = query.metadata().iter().map(|c| c.name.clone()).collect();
        let rows = query
            .execute(&[])
            .and_then(|cursor| cursor.collect_rows())
            .unwrap_or_else(|e| panic!("Query failed: {} - Error: {}", sql, e));
        rows.into_iter()
            .map(|row| labels.iter().cloned().zip(row).collect())
            .collect()
    }

    /// Query SQL and return rows in column order
    pub fn query_rows(&self, sql: &str) -> Vec<Row> {
        self.query_params(sql, &[])
    }

    /// Query SQL with bound parameters and return rows in column order
    pub fn query_params(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        self.try_query(sql, params)
            .unwrap_or_else(|e| panic!("Query failed: {} - Error: {}", sql, e))
    }

    /// Query SQL, returning the first error from either prepare or fetch
    pub fn try_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        self.database()
            .prepare(sql)?
            .execute(params)?
            .collect_rows()
    }

    /// Execute SQL into a scrollable cursor
    pub fn scrollable(&self, sql: &str) -> ScrollableCursor {
        self.database()
            .prepare(sql)
            .and_then(|query| query.execute_scrollable(&[]))
            .unwrap_or_else(|e| panic!("Query failed: {} - Error: {}", sql, e))
    }

    /// Execute SQL expecting an error
    pub fn query_error(&self, sql: &str) -> Error {
        match self.try_query(sql, &[]) {
            Err(err) => err,
            Ok(rows) => panic!("Expected error for SQL: {}, got {} rows", sql, rows.len()),
        }
    }

    /// Query and return count of rows
    pub fn query_count(&self, sql: &str) -> usize {
        self.query_rows(sql).len()
    }

    /// Assert query returns expected number of rows
    pub fn assert_row_count(&self, sql: &str, expected: usize) {
        let count = self.query_count(sql);
        assert_eq!(
            count, expected,
            "Query '{}' returned {} rows, expected {}",
            sql, count, expected
        );
    }

    /// Assert the first row's value for a column
    pub fn assert_query_value(&self, sql: &str, column: &str, expected: Value) {
        let results = self.query(sql);
        assert!(!results.is_empty(), "Query '{}' returned no results", sql);

        let value = results[0]
            .get(column)
            .unwrap_or_else(|| panic!("Column '{}' not found in results", column));

        assert_eq!(
            value, &expected,
            "Query '{}' column '{}' = '{:?}', expected '{:?}'",
            sql, column, value, expected
        );
    }

    /// Assert error message contains expected text
    pub fn assert_error_contains(&self, sql: &str, expected: &str) {
        let error = self.query_error(sql).to_string();
        assert!(
            error.contains(expected),
            "Error '{}' does not contain '{}'",
            error,
            expected
        );
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for writing a table from a header and data lines
pub struct TableBuilder<'a> {
    ctx: &'a mut TestContext,
    table_name: String,
    lines: Vec<String>,
}

impl<'a> TableBuilder<'a> {
    pub fn new(ctx: &'a mut TestContext, table_name: &str) -> Self {
        Self {
            ctx,
            table_name: table_name.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn header(mut self, header: &str) -> Self {
        self.lines.insert(0, header.to_string());
        self
    }

    pub fn rows(mut self, rows: &[&str]) -> Self {
        self.lines.extend(rows.iter().map(|r| r.to_string()));
        self
    }

    /// Write the table file
    pub fn create(self) {
        let contents = self.lines.join("\n") + "\n";
        self.ctx.write_table(&self.table_name, &contents);
    }
}

/// Helper to create a test context with the standard people table
pub fn setup_people() -> TestContext {
    let mut ctx = TestContext::new();
    TableBuilder::new(&mut ctx, "people")
        .header("ID,NAME,DEPT,AGE")
        .rows(&[
            "1,Alice,eng,25",
            "2,Bob,ops,30",
            "3,Charlie,eng,35",
            "4,Dana,sales,28",
            "5,Eve,ops,41",
        ])
        .create();
    ctx
}

/// Shorthand for a string value
pub fn s(text: &str) -> Value {
    Value::from(text)
}
