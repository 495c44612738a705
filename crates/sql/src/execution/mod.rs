//! Query execution: evaluation, aggregation, grouping and the row pipeline.

pub mod aggregator;
pub mod compare;
pub mod evaluator;
pub mod executor;
pub mod grouping;
pub mod like;

pub use evaluator::{Environment, evaluate};
pub use executor::{Executor, StreamingRows};
