//! Query engine facade
//!
//! A [`Database`] is the connection-level entry point: it owns the table
//! resolver and the configuration, and turns SQL text into
//! [`PreparedQuery`] handles. A prepared query holds an immutable plan and can
//! be executed any number of times, each execution reading the table afresh.

use crate::catalog::{DirectoryResolver, TableResolver};
use crate::config::{Config, TableOptions};
use crate::cursor::{ForwardCursor, ScrollableCursor};
use crate::error::{Error, Result};
use crate::execution::Executor;
use crate::parsing::parse_sql;
use crate::planning::{ColumnMetadata, Planner, QueryPlan};
use crate::reader::RowSource;
use crate::types::{Column, Converter, Table, Value};
use std::path::Path;
use std::sync::Arc;

/// A connection to a set of tables.
#[derive(Clone)]
pub struct Database {
    resolver: Arc<dyn TableResolver>,
    config: Config,
}

impl Database {
    pub fn new(resolver: impl TableResolver + 'static, config: Config) -> Self {
        Self {
            resolver: Arc::new(resolver),
            config,
        }
    }

    /// Opens the CSV files in a directory, one table per file.
    pub fn open_directory(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let resolver = DirectoryResolver::new(dir, config.file_extension.clone())?;
        Ok(Self::new(resolver, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the tables that can be queried.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.resolver.table_names()
    }

    /// Parses and plans a query. The table is opened to read its header and
    /// released again before this returns.
    pub fn prepare(&self, sql: &str) -> Result<PreparedQuery> {
        let statement = parse_sql(sql)?;
        let name = statement.from.name.clone();
        let options = self.config.table_options(&name).clone();
        let converter = options.converter()?;

        let mut source = open_source(self.resolver.as_ref(), &name, &options)?;
        let columns = source
            .columns()
            .iter()
            .enumerate()
            .map(|(i, column)| Column::new(column.clone(), options.column_type(i)))
            .collect();
        source.close();
        let table = Table::new(name, columns)?;

        let plan = Planner::plan(statement, table)?;
        let metadata = Arc::new(plan.metadata());
        Ok(PreparedQuery {
            plan: Arc::new(plan),
            metadata,
            resolver: self.resolver.clone(),
            options,
            converter,
        })
    }

    /// Prepares and executes a query without parameters.
    pub fn query(&self, sql: &str) -> Result<ForwardCursor> {
        self.prepare(sql)?.execute(&[])
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A planned query, executable any number of times.
pub struct PreparedQuery {
    plan: Arc<QueryPlan>,
    metadata: Arc<Vec<ColumnMetadata>>,
    resolver: Arc<dyn TableResolver>,
    options: TableOptions,
    converter: Converter,
}

impl PreparedQuery {
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Result column descriptions, available without executing.
    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.metadata
    }

    /// Number of `?` placeholders that must be bound.
    pub fn parameter_count(&self) -> usize {
        self.plan.parameter_count
    }

    /// Executes with the given parameter values, returning a forward-only
    /// cursor. Simple scans stream rows lazily from the table's input.
    pub fn execute(&self, params: &[Value]) -> Result<ForwardCursor> {
        let executor = self.executor(params)?;
        let source = self.open()?;
        let rows = executor.execute(source)?;
        Ok(ForwardCursor::new(rows, self.metadata.clone()))
    }

    /// Executes with the given parameter values, materializing the whole
    /// result. The input is released before this returns.
    pub fn execute_scrollable(&self, params: &[Value]) -> Result<ScrollableCursor> {
        let executor = self.executor(params)?;
        let source = self.open()?;
        let rows = executor.materialize(source)?;
        Ok(ScrollableCursor::new(rows, self.metadata.clone()))
    }

    fn executor(&self, params: &[Value]) -> Result<Executor> {
        Executor::new(self.plan.clone(), self.converter.clone(), params.to_vec())
    }

    fn open(&self) -> Result<RowSource> {
        open_source(self.resolver.as_ref(), &self.plan.table.name, &self.options)
    }
}

fn open_source(
    resolver: &dyn TableResolver,
    table: &str,
    options: &TableOptions,
) -> Result<RowSource> {
    let charset = options.charset.to_uppercase();
    if charset != "UTF-8" && charset != "UTF8" {
        return Err(Error::Config(format!(
            "unsupported charset '{}' for table {}",
            options.charset, table
        )));
    }
    let lines = resolver.open(table)?;
    RowSource::open(table, lines, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryResolver;
    use crate::types::DataType;

    fn database() -> Database {
        let resolver = MemoryResolver::new()
            .with_table("people", "ID,NAME,BORN\n1,ann,2011-10-19\n2,bob,2012-01-02\n3,cid,");
        let config = Config::default().with_column_types(vec![
            DataType::I32,
            DataType::Str,
            DataType::Date,
        ]);
        Database::new(resolver, config)
    }

    #[test]
    fn test_prepare_reports_metadata() -> Result<()> {
        let query = database().prepare("SELECT id AS key, name, born FROM people")?;
        let names: Vec<_> = query.metadata().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["key", "NAME", "BORN"]);
        assert_eq!(query.metadata()[0].data_type, DataType::I32);
        assert_eq!(query.metadata()[2].ordinal, 3);
        assert_eq!(query.metadata()[2].table, "people");
        Ok(())
    }

    #[test]
    fn test_prepared_query_is_reusable() -> Result<()> {
        let query = database().prepare("SELECT name FROM people WHERE id > ?")?;
        assert_eq!(query.parameter_count(), 1);
        let first = query.execute(&[Value::I64(1)])?.collect_rows()?;
        let second = query.execute(&[Value::I64(2)])?.collect_rows()?;
        assert_eq!(first, vec![vec![Value::from("bob")], vec![Value::from("cid")]]);
        assert_eq!(second, vec![vec![Value::from("cid")]]);
        Ok(())
    }

    #[test]
    fn test_unparseable_date_is_null() -> Result<()> {
        let rows = database()
            .query("SELECT id FROM people WHERE born IS NULL")?
            .collect_rows()?;
        assert_eq!(rows, vec![vec![Value::I32(3)]]);
        Ok(())
    }

    #[test]
    fn test_errors() {
        let db = database();
        assert_eq!(
            db.prepare("SELECT * FROM cars").err(),
            Some(Error::TableNotFound("cars".into()))
        );
        assert_eq!(
            db.prepare("SELECT age FROM people").err(),
            Some(Error::InvalidColumn("age".into()))
        );
        assert!(matches!(
            db.prepare("SELECT FROM people").err(),
            Some(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_unsupported_charset() {
        let mut options = TableOptions::default();
        options.charset = "ISO-8859-1".into();
        let db = Database::new(
            MemoryResolver::new().with_table("t", "A\n1"),
            Config::default().with_table_options("t", options),
        );
        assert!(matches!(db.prepare("SELECT * FROM t"), Err(Error::Config(_))));
    }
}
