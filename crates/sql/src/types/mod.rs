//! The SQL data model: data types, values, conversion, expressions and
//! schema descriptors.

pub mod convert;
pub mod data_type;
pub mod expression;
pub mod query;
pub mod schema;
pub mod value;

pub use convert::Converter;
pub use data_type::DataType;
pub use expression::{AggregateCall, AggregateKind, Expression, ScalarFunction};
pub use query::{Direction, Rows};
pub use schema::{Column, Table};
pub use value::{Row, Value};
