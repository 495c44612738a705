//! Query-related types used across parser, planner, and executor

use super::Row;
use crate::error::Result;

/// Row iterator type for streaming execution
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        })
    }
}
