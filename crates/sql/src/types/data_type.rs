//! Declared column types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of types a column can be declared as. Every raw field is
/// converted into one of these by [`crate::types::convert::Converter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Str,
    Bool,
    // Integer types
    I8,
    I16,
    I32,
    I64,
    // Float types
    F32,
    F64,
    Decimal,
    // Date/Time types
    Date,
    Time,
    Timestamp,
    Bytea,
}

impl DataType {
    /// Parses a type name as it appears in the `columnTypes` option. Names are
    /// case-insensitive and accept both the Java-style and SQL-style spelling.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name.trim().to_uppercase().as_str() {
            "STRING" | "VARCHAR" | "TEXT" | "CHAR" => DataType::Str,
            "BOOLEAN" | "BOOL" => DataType::Bool,
            "BYTE" | "TINYINT" => DataType::I8,
            "SHORT" | "SMALLINT" => DataType::I16,
            "INT" | "INTEGER" => DataType::I32,
            "LONG" | "BIGINT" => DataType::I64,
            "FLOAT" | "REAL" => DataType::F32,
            "DOUBLE" => DataType::F64,
            "BIGDECIMAL" | "DECIMAL" | "NUMERIC" => DataType::Decimal,
            "DATE" => DataType::Date,
            "TIME" => DataType::Time,
            "TIMESTAMP" | "DATETIME" => DataType::Timestamp,
            "BYTES" | "BLOB" | "ASCIISTREAM" => DataType::Bytea,
            other => {
                return Err(Error::Config(format!("unknown column type '{}'", other)));
            }
        })
    }

    /// Check if this type is numeric (integer, float, or decimal)
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
                | DataType::F32
                | DataType::F64
                | DataType::Decimal
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Time | DataType::Timestamp)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Str => write!(f, "VARCHAR"),
            DataType::Bool => write!(f, "BOOLEAN"),
            DataType::I8 => write!(f, "TINYINT"),
            DataType::I16 => write!(f, "SMALLINT"),
            DataType::I32 => write!(f, "INTEGER"),
            DataType::I64 => write!(f, "BIGINT"),
            DataType::F32 => write!(f, "REAL"),
            DataType::F64 => write!(f, "DOUBLE"),
            DataType::Decimal => write!(f, "DECIMAL"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Bytea => write!(f, "BLOB"),
        }
    }
}
