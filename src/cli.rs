//! Command-line argument parsing for batch replace runs
//!
//! Supports:
//! - Loading a rule list from a JSON file
//! - Column scoping with a delimiter, optional quote char, and column list
//! - Dry-run mode that reports counts without writing the file back

use clap::Parser;
use std::path::PathBuf;

use crate::columns::ColumnScopeConfig;
use crate::engine::{PassOptions, SearchScope};

/// Batch find/replace with an ordered rule list
#[derive(Parser, Debug)]
#[command(name = "multireplace", version, about = "Batch find/replace with an ordered rule list")]
pub struct CliArgs {
    /// File to run the rule list over
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// JSON file holding the rule list
    #[arg(short, long, value_name = "RULES")]
    pub rules: PathBuf,

    /// Restrict matching to delimited columns using this delimiter
    /// (escape sequences like \t allowed)
    #[arg(short, long, value_name = "DELIM")]
    pub delimiter: Option<String>,

    /// Quote character for the column scanner (" or ')
    #[arg(short, long, value_name = "CHAR", requires = "delimiter")]
    pub quote: Option<char>,

    /// 1-based columns to match in, e.g. -c 1 -c 3 (used with --delimiter)
    #[arg(short, long = "column", value_name = "N", requires = "delimiter")]
    pub columns: Vec<usize>,

    /// Report counts without writing the file back
    #[arg(long)]
    pub dry_run: bool,

    /// Stop the whole pass on the first snippet error instead of skipping
    /// that match
    #[arg(long)]
    pub abort_on_snippet_error: bool,
}

impl CliArgs {
    /// Column scope derived from the delimiter flags, when given
    pub fn column_scope(&self) -> Option<ColumnScopeConfig> {
        self.delimiter.as_ref().map(|delimiter| ColumnScopeConfig {
            delimiter: delimiter.clone(),
            quote: self.quote,
            columns: self.columns.clone(),
        })
    }

    pub fn pass_options(&self) -> PassOptions {
        PassOptions {
            scope: if self.delimiter.is_some() {
                SearchScope::Columns
            } else {
                SearchScope::Document
            },
            abort_on_snippet_error: self.abort_on_snippet_error,
        }
    }
}
