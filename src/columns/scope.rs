//! Column scope - delimiter, quote character, and selected columns
//!
//! A scope is parsed from host-provided configuration (delimiter text still
//! in escape-extended form, a 1-based column list). An invalid scope never
//! errors out of a query path: it degrades to "no columns selected" so a
//! half-filled dialog can't break a pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::escape;

/// Raw, host-persisted form of a column scope. This is the shape that must
/// survive a save/reload cycle field-for-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnScopeConfig {
    /// Delimiter in escape-extended form (e.g. `\t` or `::`)
    pub delimiter: String,
    /// Optional quote character, `"` or `'`
    #[serde(default)]
    pub quote: Option<char>,
    /// Selected 1-based column indices, order-preserving
    #[serde(default)]
    pub columns: Vec<usize>,
}

/// Validated scope used by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnScope {
    delimiter: Vec<char>,
    quote: Option<char>,
    column_list: Vec<usize>,
    column_set: BTreeSet<usize>,
    valid: bool,
}

impl ColumnScope {
    /// Build a scope from host configuration.
    ///
    /// Validation requires a non-empty (decoded) delimiter, a non-empty
    /// column list with no zero index, and a quote of `"` or `'` if present.
    /// Anything else yields an invalid scope that answers every membership
    /// query with "nothing selected".
    pub fn from_config(config: &ColumnScopeConfig) -> Self {
        let delimiter: Vec<char> = escape::decode(&config.delimiter).chars().collect();
        let column_set: BTreeSet<usize> = config.columns.iter().copied().collect();

        let quote_ok = matches!(config.quote, None | Some('"') | Some('\''));
        let valid = !delimiter.is_empty()
            && !config.columns.is_empty()
            && !column_set.contains(&0)
            && quote_ok;

        if !valid {
            tracing::warn!(
                delimiter = %config.delimiter,
                columns = ?config.columns,
                quote = ?config.quote,
                "invalid column scope, degrading to no selected columns"
            );
        }

        Self {
            delimiter,
            quote: config.quote.filter(|_| quote_ok),
            column_list: config.columns.clone(),
            column_set,
            valid,
        }
    }

    /// Validating parse that reports why a configuration is unusable instead
    /// of degrading. Query paths keep using [`ColumnScope::from_config`].
    pub fn try_from_config(config: &ColumnScopeConfig) -> Result<Self, EngineError> {
        if escape::decode(&config.delimiter).is_empty() {
            return Err(EngineError::InvalidScope("delimiter is empty".to_string()));
        }
        if config.columns.is_empty() {
            return Err(EngineError::InvalidScope("no columns selected".to_string()));
        }
        if config.columns.contains(&0) {
            return Err(EngineError::InvalidScope(
                "column numbers are 1-based".to_string(),
            ));
        }
        if !matches!(config.quote, None | Some('"') | Some('\'')) {
            return Err(EngineError::InvalidScope(
                "quote character must be \" or '".to_string(),
            ));
        }
        Ok(Self::from_config(config))
    }

    /// A scope that selects nothing; used before any configuration arrives.
    pub fn empty() -> Self {
        Self {
            delimiter: Vec::new(),
            quote: None,
            column_list: Vec::new(),
            column_set: BTreeSet::new(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Decoded delimiter chars (empty when invalid)
    pub fn delimiter(&self) -> &[char] {
        &self.delimiter
    }

    pub fn delimiter_len(&self) -> usize {
        self.delimiter.len()
    }

    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Selected columns in the order the host supplied them
    pub fn column_list(&self) -> &[usize] {
        &self.column_list
    }

    /// Membership test against the canonical set. Always false for an
    /// invalid scope.
    pub fn is_selected(&self, column: usize) -> bool {
        self.valid && self.column_set.contains(&column)
    }

    /// Whether switching to `other` requires rescanning delimiter positions
    /// (delimiter or quote changed) as opposed to only re-evaluating column
    /// membership.
    pub fn needs_rescan_for(&self, other: &ColumnScope) -> bool {
        self.delimiter != other.delimiter || self.quote != other.quote
    }
}
