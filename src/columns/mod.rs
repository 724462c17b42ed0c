//! Delimiter-defined column scoping
//!
//! Tokenizes document lines by a configured delimiter (with optional quote
//! character), caches the per-line delimiter positions, keeps that cache
//! valid under live edits via the buffer change stream, and answers the
//! "which column is this position in" queries the matching engine needs for
//! column-restricted passes.

mod changelog;
mod scanner;
mod scope;
mod sort;

pub use scanner::{DelimiterScanner, LineEntry, LineIndex};
pub use scope::{ColumnScope, ColumnScopeConfig};
pub use sort::{RowSorter, SortDirection};
