//! multireplace - ordered multi-rule find and replace for text buffers
//!
//! This crate provides the core types and logic for a batch search/replace
//! engine: a rule list where each rule carries its own matching mode
//! (literal, escape-extended, regex, or a per-match script snippet), applied
//! over a host buffer with optional column scoping for delimited text.

pub mod cli;
pub mod columns;
pub mod engine;
pub mod error;
pub mod escape;
pub mod host;
pub mod rules;
pub mod script;

// Re-export commonly used types
pub use engine::{CancelFlag, Match, PassOptions, PassResult, ReplaceEngine, SearchScope};
pub use error::EngineError;
pub use host::{HostBuffer, RopeBuffer};
pub use rules::Rule;
