//! Dynamic-expression resolution - per-match replacement text from a script
//!
//! A rule flagged `use_variables` treats its replace text as a snippet that
//! is evaluated once per match, strictly after the match is located and
//! strictly before the buffer write. The snippet sees a read-only variable
//! snapshot of the match plus any globals it set itself earlier in the same
//! pass; globals do not survive across passes.
//!
//! The concrete scripting engine sits behind [`Evaluator`] so it stays
//! swappable and mockable without touching the matching engine.

mod lua;

pub use lua::LuaEvaluator;

use crate::error::EngineError;

/// Read-only variable snapshot handed to the snippet for one match.
///
/// Counts and positions are recomputed for every individual match; a snippet
/// can depend on how many prior matches occurred in the same pass, never on
/// a match not yet processed.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    /// Cumulative match count for this rule within the pass (1-based)
    pub cnt: usize,
    /// 1-based line number of the match start
    pub line: usize,
    /// Match count on this line so far (1-based)
    pub lcnt: usize,
    /// Match start offset within its line
    pub lpos: usize,
    /// Absolute match start position
    pub apos: usize,
    /// 1-based column containing the match, when a column scope is active
    pub col: Option<usize>,
    /// The matched text
    pub matched: String,
    /// Regex capture groups 1.., None for groups that did not participate
    pub captures: Vec<Option<String>>,
}

/// Narrow interface the matching engine computes dynamic replacements
/// through.
pub trait Evaluator {
    /// Syntax-check a snippet without running it (dialog-time validation).
    fn validate(&mut self, snippet: &str) -> Result<(), EngineError>;

    /// Start a fresh pass: snippet-set globals from earlier passes are
    /// dropped.
    fn begin_pass(&mut self);

    /// Produce the literal replacement text for one match. A syntax or
    /// runtime error aborts only that match's replacement.
    fn evaluate(&mut self, snippet: &str, ctx: &MatchContext) -> Result<String, EngineError>;
}
