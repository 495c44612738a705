//! Reading delimited text: line suppliers, the record tokenizer and the row
//! source that derives headers and yields records.

pub mod lines;
pub mod pivot;
pub mod source;
pub mod tokenizer;

pub use lines::{LineSupplier, ReaderLines, VecLines};
pub use source::{BoxedLines, RowSource};
pub use tokenizer::LineTokenizer;
