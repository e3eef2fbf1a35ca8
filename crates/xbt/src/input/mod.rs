//! Input parsing and tabular data handling.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig, TableBackend};
pub use source::{ColumnKind, DataTable, RawTable, SourceMetadata, Value};
