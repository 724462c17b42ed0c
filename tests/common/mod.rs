//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use multireplace::columns::{ColumnScope, ColumnScopeConfig, DelimiterScanner};
use multireplace::engine::{PassOptions, SearchScope};
use multireplace::host::RopeBuffer;
use multireplace::rules::Rule;

/// Scanner with no column scope configured
pub fn plain_scanner() -> DelimiterScanner {
    DelimiterScanner::new(ColumnScope::empty())
}

/// Scanner over comma-delimited text with the given selected columns
pub fn csv_scanner(columns: &[usize]) -> DelimiterScanner {
    scoped_scanner(",", None, columns)
}

pub fn scoped_scanner(
    delimiter: &str,
    quote: Option<char>,
    columns: &[usize],
) -> DelimiterScanner {
    DelimiterScanner::new(ColumnScope::from_config(&ColumnScopeConfig {
        delimiter: delimiter.to_string(),
        quote,
        columns: columns.to_vec(),
    }))
}

pub fn buffer(text: &str) -> RopeBuffer {
    RopeBuffer::new(text)
}

pub fn column_options() -> PassOptions {
    PassOptions {
        scope: SearchScope::Columns,
        ..Default::default()
    }
}

/// Simple literal rule, case-insensitive, document scope
pub fn rule(find: &str, replace: &str) -> Rule {
    Rule::new(find, replace)
}
