//! Rule model - one ordered find/replace entry
//!
//! A rule list is owned by the embedding host (UI, config file); the engine
//! reads rules during a pass and only ever mutates the running counters.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

fn default_true() -> bool {
    true
}

/// One entry of the ordered rule list.
///
/// Mode flags select the matching semantics: `extended` decodes the find and
/// replace text through the escape table before literal matching, `regex`
/// compiles the find text as a regular expression, and `use_variables` runs
/// the replace text as a Lua snippet per match. Serialization covers every
/// configuration field so a host can persist the list field-for-field; the
/// counters are session state and are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Disabled rules are skipped by list passes, counters untouched
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Find pattern (raw; decoding/compiling happens per mode at pass time)
    pub find: String,
    /// Replace text, capture template (regex) or Lua snippet (use_variables)
    #[serde(default)]
    pub replace: String,
    /// Require non-word characters or buffer boundaries on both sides
    #[serde(default)]
    pub whole_word: bool,
    /// Case-sensitive matching
    #[serde(default)]
    pub match_case: bool,
    /// Escape-extended mode (mutually exclusive with `regex`)
    #[serde(default)]
    pub extended: bool,
    /// Regular-expression mode
    #[serde(default)]
    pub regex: bool,
    /// Compute replacement text by evaluating `replace` as a Lua snippet
    #[serde(default)]
    pub use_variables: bool,

    /// Matches found across passes this session
    #[serde(skip)]
    pub find_count: usize,
    /// Replacements performed across passes this session
    #[serde(skip)]
    pub replace_count: usize,
}

impl Rule {
    /// Create a literal, case-insensitive rule
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            enabled: true,
            find: find.into(),
            replace: replace.into(),
            whole_word: false,
            match_case: false,
            extended: false,
            regex: false,
            use_variables: false,
            find_count: 0,
            replace_count: 0,
        }
    }

    pub fn with_regex(mut self) -> Self {
        self.regex = true;
        self
    }

    pub fn with_extended(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn with_whole_word(mut self) -> Self {
        self.whole_word = true;
        self
    }

    pub fn with_match_case(mut self) -> Self {
        self.match_case = true;
        self
    }

    pub fn with_variables(mut self) -> Self {
        self.use_variables = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check mode-flag consistency.
    ///
    /// `extended` and `regex` are mutually exclusive. `whole_word` under
    /// `regex` is not an error, just meaningless; the engine ignores it and
    /// we log once here.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.extended && self.regex {
            return Err(EngineError::invalid_pattern(
                &self.find,
                "escape-extended and regex modes are mutually exclusive",
            ));
        }
        if self.whole_word && self.regex {
            tracing::warn!(
                find = %self.find,
                "whole-word flag has no effect in regex mode"
            );
        }
        Ok(())
    }

    /// Reset session counters (explicit user action, never done by the engine)
    pub fn reset_counts(&mut self) {
        self.find_count = 0;
        self.replace_count = 0;
    }
}

// Equality compares configuration only; two rules with different running
// counters are still the same rule.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.enabled == other.enabled
            && self.find == other.find
            && self.replace == other.replace
            && self.whole_word == other.whole_word
            && self.match_case == other.match_case
            && self.extended == other.extended
            && self.regex == other.regex
            && self.use_variables == other.use_variables
    }
}

impl Eq for Rule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_counters() {
        let a = Rule::new("cat", "dog");
        let mut b = Rule::new("cat", "dog");
        b.find_count = 7;
        b.replace_count = 3;
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_respects_flags() {
        let a = Rule::new("cat", "dog");
        let b = Rule::new("cat", "dog").with_match_case();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_rejects_extended_regex_combo() {
        let rule = Rule::new("a", "b").with_extended().with_regex();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_plain_modes() {
        assert!(Rule::new("a", "b").validate().is_ok());
        assert!(Rule::new("a", "b").with_extended().validate().is_ok());
        assert!(Rule::new("a", "b").with_regex().validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip_is_field_exact() {
        let rule = Rule::new("\\d+", "n$1")
            .with_regex()
            .with_match_case()
            .disabled();
        let json = serde_json::to_string(&rule).unwrap();
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, back);
        // Counters never travel
        assert_eq!(back.find_count, 0);
    }

    #[test]
    fn test_deserialize_defaults() {
        let rule: Rule = serde_json::from_str(r#"{"find":"x"}"#).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.replace, "");
        assert!(!rule.regex);
    }
}
