//! Single-rule matchers - literal, escape-extended, and regex
//!
//! A matcher is compiled once per rule per pass. Offsets in and out are char
//! offsets into the searched text; the engine translates them to absolute
//! buffer positions.

use regex::Regex;

use crate::error::EngineError;
use crate::escape;
use crate::host::HostBuffer;
use crate::rules::Rule;

/// A located occurrence within the searched text.
#[derive(Debug, Clone)]
pub(crate) struct RawMatch {
    /// Char offset of the match start
    pub start: usize,
    /// Match length in chars (zero-length regex matches are possible)
    pub len: usize,
    /// Matched text
    pub text: String,
    /// Capture groups 1.. (regex mode only)
    pub captures: Vec<Option<String>>,
    /// Capture-template expansion of the replace text, when one was supplied
    pub replacement: Option<String>,
}

pub(crate) enum Matcher {
    Literal {
        needle: Vec<char>,
        match_case: bool,
        whole_word: bool,
    },
    Regex {
        re: Regex,
    },
}

impl Matcher {
    /// Compile a rule's find pattern per its mode flags.
    ///
    /// Escape-extended decodes the pattern first and then matches literally.
    /// Case-insensitive regex prepends `(?i)`. An empty (post-decode) find
    /// pattern is rejected: it would match everywhere and make no progress.
    pub fn compile(rule: &Rule) -> Result<Self, EngineError> {
        rule.validate()?;

        if rule.regex {
            let pattern = if rule.match_case {
                rule.find.clone()
            } else {
                format!("(?i){}", rule.find)
            };
            let re = Regex::new(&pattern)
                .map_err(|e| EngineError::invalid_pattern(&rule.find, e.to_string()))?;
            Ok(Matcher::Regex { re })
        } else {
            let decoded = if rule.extended {
                escape::decode(&rule.find)
            } else {
                rule.find.clone()
            };
            if decoded.is_empty() {
                return Err(EngineError::invalid_pattern(
                    &rule.find,
                    "find pattern is empty",
                ));
            }
            Ok(Matcher::Literal {
                needle: decoded.chars().collect(),
                match_case: rule.match_case,
                whole_word: rule.whole_word,
            })
        }
    }

    pub fn whole_word(&self) -> bool {
        match self {
            Matcher::Literal { whole_word, .. } => *whole_word,
            Matcher::Regex { .. } => false,
        }
    }

    /// First match at or after char offset `from`. `template` is the regex
    /// replace text to expand against the captures (`$1`, `${name}`).
    pub fn find_in(&self, text: &str, from: usize, template: Option<&str>) -> Option<RawMatch> {
        match self {
            Matcher::Literal {
                needle, match_case, ..
            } => {
                let mut chars = text.chars();
                for _ in 0..from {
                    chars.next()?;
                }
                let mut start = from;
                loop {
                    let rest = chars.as_str();
                    if starts_with_fold(rest, needle, *match_case) {
                        return Some(RawMatch {
                            start,
                            len: needle.len(),
                            text: rest.chars().take(needle.len()).collect(),
                            captures: Vec::new(),
                            replacement: None,
                        });
                    }
                    chars.next()?;
                    start += 1;
                }
            }
            Matcher::Regex { re } => {
                let byte_from = char_to_byte(text, from)?;
                let caps = re.captures_at(text, byte_from)?;
                let whole = caps.get(0)?;
                let start = from + text[byte_from..whole.start()].chars().count();
                let replacement = template.map(|t| {
                    let mut out = String::new();
                    caps.expand(t, &mut out);
                    out
                });
                Some(RawMatch {
                    start,
                    len: whole.as_str().chars().count(),
                    text: whole.as_str().to_string(),
                    captures: caps
                        .iter()
                        .skip(1)
                        .map(|c| c.map(|m| m.as_str().to_string()))
                        .collect(),
                    replacement,
                })
            }
        }
    }
}

/// Whether `rest` begins with `needle`, without allocating.
fn starts_with_fold(rest: &str, needle: &[char], match_case: bool) -> bool {
    let mut hay = rest.chars();
    needle
        .iter()
        .all(|&n| matches!(hay.next(), Some(h) if chars_equal(h, n, match_case)))
}

fn chars_equal(a: char, b: char, match_case: bool) -> bool {
    if match_case {
        a == b
    } else {
        fold_char(a) == fold_char(b)
    }
}

/// Length-preserving case fold: first char of the full lowering
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Byte offset of char offset `from`, or None past the end of `text`.
fn char_to_byte(text: &str, from: usize) -> Option<usize> {
    if from == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in text.char_indices() {
        if count == from {
            return Some(byte);
        }
        count += 1;
    }
    (count == from).then_some(text.len())
}

/// Whole-word constraint: non-word character or buffer boundary on both
/// sides, using the host's word-character classification.
pub(crate) fn is_whole_word(buf: &dyn HostBuffer, start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !buf.is_word_char(char_at(buf, start - 1));
    let after_ok = end >= buf.len() || !buf.is_word_char(char_at(buf, end));
    before_ok && after_ok
}

fn char_at(buf: &dyn HostBuffer, pos: usize) -> char {
    buf.read_range(pos, pos + 1).chars().next().unwrap_or('\0')
}
