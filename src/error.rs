//! Error taxonomy for matching passes and index maintenance
//!
//! Rule-level failures (bad regex, bad snippet) are collected per rule in the
//! pass result and never abort the rest of the list. Index-consistency
//! failures are recovered internally with a full rebuild.

use thiserror::Error;

/// Errors surfaced by the engine, scanner, and resolver.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A find pattern failed to compile or its mode flags are inconsistent.
    /// Fails that rule only; the pass continues with the next enabled rule.
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A column scope failed validation. Column queries degrade to
    /// "no columns selected" instead of raising this; it is only returned
    /// from explicit parse entry points.
    #[error("invalid column scope: {0}")]
    InvalidScope(String),

    /// A dynamic-expression snippet failed to parse or raised at runtime.
    /// Aborts only that match's replacement.
    #[error("snippet error: {0}")]
    Snippet(String),

    /// A change-log entry referenced a line outside the cached index.
    /// Recovered internally by a forced full rebuild; callers only see the
    /// latency.
    #[error("stale line index: {0}")]
    BufferStale(String),

    /// Cooperative cancellation was requested. Not a failure: partial counts
    /// are returned and committed replacements stay.
    #[error("operation cancelled")]
    Cancelled,

    /// The captured row order was invalidated by an edit outside the
    /// sort/restore cycle; current order is authoritative.
    #[error("captured row order no longer matches the document")]
    StaleOrder,
}

impl EngineError {
    pub fn invalid_pattern(pattern: &str, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.into(),
        }
    }
}
