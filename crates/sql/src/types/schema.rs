//! Table and column descriptors derived from a file's header.
//!
//! Descriptors are created once when a query is prepared and never change
//! afterwards. Column names keep their original spelling for display and are
//! matched case-insensitively.

use super::data_type::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A table column.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Column {
    /// The column name as it appears in the header.
    pub name: String,
    /// The declared type raw fields are converted to.
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A table schema: its name, an optional alias from the FROM clause, and its
/// columns in file order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
    pub columns: Vec<Column>,
    /// Uppercase column name to ordinal.
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl Table {
    /// Creates a table schema, rejecting duplicate column names.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let key = column.name.to_uppercase();
            if lookup.insert(key, i).is_some() {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            alias: None,
            columns,
            lookup,
        })
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Resolves a possibly table-qualified column reference to its ordinal.
    /// The qualifier may be either the table name or its alias.
    pub fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<usize> {
        let invalid = || match qualifier {
            Some(q) => Error::InvalidColumn(format!("{}.{}", q, name)),
            None => Error::InvalidColumn(name.to_string()),
        };
        if let Some(q) = qualifier {
            let matches_table = q.eq_ignore_ascii_case(&self.name)
                || self
                    .alias
                    .as_deref()
                    .is_some_and(|alias| q.eq_ignore_ascii_case(alias));
            if !matches_table {
                return Err(invalid());
            }
        }
        self.lookup
            .get(&name.to_uppercase())
            .copied()
            .ok_or_else(invalid)
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
