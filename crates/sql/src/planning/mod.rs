//! Query planning: AST to immutable query plan.

pub mod plan;
pub mod planner;

pub use plan::{ColumnMetadata, Projection, QueryPlan};
pub use planner::Planner;
