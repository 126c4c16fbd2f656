//! Sample input schema
//!
//! The in-memory sample table every stage reads from, plus the adapter that
//! builds it from whitespace-delimited text files.

mod adapter;
mod sample_table;

pub use adapter::*;
pub use sample_table::*;
