//! A read-only SQL query engine over delimited text files
//!
//! This crate treats each CSV-like file as a table and answers single-table
//! SELECT queries over it:
//! - Configurable tokenizing (separators, quote dialects, multi-line fields)
//! - Header handling, comment and leading-line skipping, pivoted layouts
//! - Typed columns with configurable date and time formats
//! - WHERE, GROUP BY, HAVING, ORDER BY, DISTINCT, LIMIT/OFFSET and aggregates
//! - Forward-only streaming cursors and in-memory scrollable cursors
//!
//! ```no_run
//! use csvql::{Config, Database};
//!
//! let db = Database::open_directory("data", Config::default())?;
//! let mut cursor = db.query("SELECT name, COUNT(*) FROM people GROUP BY name")?;
//! while cursor.advance()? {
//!     println!("{:?}", cursor.row());
//! }
//! # Ok::<(), csvql::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod cursor;
mod engine;
mod error;
pub mod execution;
pub mod parsing;
pub mod planning;
pub mod reader;
pub mod types;

pub use catalog::{DirectoryResolver, MemoryResolver, TableResolver};
pub use config::{Config, QuoteStyle, TableOptions};
pub use cursor::{ForwardCursor, ScrollableCursor};
pub use engine::{Database, PreparedQuery};
pub use error::{Error, Result};
pub use planning::ColumnMetadata;
pub use types::{DataType, Row, Value};
