//! Pattern matching engine - finds and replaces per rule, rule list, and scope
//!
//! One engine per host session, explicitly constructed and caller-owned.
//! All operations run synchronously on the thread that owns the document;
//! the only concession to long passes is a cooperative cancellation flag
//! polled between matches. The engine never touches the scanner's cache
//! directly, it only reads it through the column query contract.

mod search;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::columns::DelimiterScanner;
use crate::error::EngineError;
use crate::escape;
use crate::host::HostBuffer;
use crate::rules::Rule;
use crate::script::{Evaluator, LuaEvaluator, MatchContext};

use search::{is_whole_word, Matcher};

/// A located occurrence of a rule's find pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Absolute char offset of the match start
    pub start: usize,
    /// Absolute char offset one past the match end
    pub end: usize,
    /// Matched text
    pub text: String,
    /// Regex capture groups 1.., empty in literal modes
    pub captures: Vec<Option<String>>,
}

/// The subset of the buffer a pass is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// The whole document
    #[default]
    Document,
    /// The host's current selection; no selection means no matches
    Selection,
    /// Only positions inside the scanner's selected columns
    Columns,
}

/// Per-pass options.
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    pub scope: SearchScope,
    /// Abort the whole pass on the first snippet error instead of skipping
    /// that match
    pub abort_on_snippet_error: bool,
}

/// Shared cancellation flag. Cancelling mid-pass yields partial counts;
/// replacements already written stay.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Per-rule result of a pass.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub found: usize,
    pub replaced: usize,
    /// Rule-local failure (bad pattern, snippet errors); the rest of the
    /// list still ran
    pub error: Option<EngineError>,
}

/// Result of a list pass: one outcome per rule, in rule order, zero-count
/// entries included.
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    pub outcomes: Vec<RuleOutcome>,
    pub cancelled: bool,
}

impl PassResult {
    pub fn total_found(&self) -> usize {
        self.outcomes.iter().map(|o| o.found).sum()
    }

    pub fn total_replaced(&self) -> usize {
        self.outcomes.iter().map(|o| o.replaced).sum()
    }
}

/// The engine. Owns the dynamic-expression evaluator and the cancellation
/// flag; everything else is borrowed per call.
pub struct ReplaceEngine {
    evaluator: Box<dyn Evaluator>,
    cancel: CancelFlag,
}

impl Default for ReplaceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaceEngine {
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(LuaEvaluator::new()))
    }

    /// Swap in a different evaluator (tests, alternative scripting hosts)
    pub fn with_evaluator(evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            evaluator,
            cancel: CancelFlag::new(),
        }
    }

    /// Use a caller-owned cancellation flag instead of a fresh one
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle the host can cancel a long pass through
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Validate a snippet without running a pass (dialog-time preview)
    pub fn validate_snippet(&mut self, snippet: &str) -> Result<(), EngineError> {
        self.evaluator.validate(snippet)
    }

    /// Evaluate a snippet against an explicit context (validation-time
    /// preview of the replacement text)
    pub fn evaluate_snippet(
        &mut self,
        snippet: &str,
        ctx: &MatchContext,
    ) -> Result<String, EngineError> {
        self.evaluator.evaluate(snippet, ctx)
    }

    /// Next admissible match at or after `from`, honoring the rule's mode
    /// and the scope.
    pub fn find_next(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &Rule,
        scope: SearchScope,
        from: usize,
    ) -> Result<Option<Match>, EngineError> {
        let matcher = Matcher::compile(rule)?;
        let Some((start, end)) = scope_range(buf, scope) else {
            return Ok(None);
        };
        let base = from.clamp(start, end);
        let text = buf.read_range(base, end);
        let mut search_from = 0;
        while let Some(m) = matcher.find_in(&text, search_from, None) {
            let abs_start = base + m.start;
            let abs_end = abs_start + m.len;
            if self.admissible(buf, scanner, &matcher, scope, abs_start, abs_end) {
                return Ok(Some(Match {
                    start: abs_start,
                    end: abs_end,
                    text: m.text,
                    captures: m.captures,
                }));
            }
            search_from = m.start + m.len.max(1);
        }
        Ok(None)
    }

    /// Last admissible match strictly before `from`.
    pub fn find_prev(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &Rule,
        scope: SearchScope,
        from: usize,
    ) -> Result<Option<Match>, EngineError> {
        let matcher = Matcher::compile(rule)?;
        let Some((start, end)) = scope_range(buf, scope) else {
            return Ok(None);
        };
        let text = buf.read_range(start, end);
        let mut best = None;
        let mut search_from = 0;
        while let Some(m) = matcher.find_in(&text, search_from, None) {
            let abs_start = start + m.start;
            let abs_end = abs_start + m.len;
            if abs_start >= from {
                break;
            }
            if self.admissible(buf, scanner, &matcher, scope, abs_start, abs_end) {
                best = Some(Match {
                    start: abs_start,
                    end: abs_end,
                    text: m.text,
                    captures: m.captures,
                });
            }
            search_from = m.start + m.len.max(1);
        }
        Ok(best)
    }

    /// Earliest match across the enabled rules of a list, with the index of
    /// the rule that produced it. Ties go to the earlier rule. Rules that
    /// fail to compile are skipped.
    pub fn find_next_in_list(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rules: &[Rule],
        scope: SearchScope,
        from: usize,
    ) -> Result<Option<(usize, Match)>, EngineError> {
        let mut best: Option<(usize, Match)> = None;
        for (index, rule) in rules.iter().enumerate() {
            if !rule.enabled {
                continue;
            }
            let hit = match self.find_next(buf, scanner, rule, scope, from) {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(rule = index, error = %e, "skipping rule in list search");
                    continue;
                }
            };
            if let Some(m) = hit {
                let better = best.as_ref().map_or(true, |(_, b)| m.start < b.start);
                if better {
                    best = Some((index, m));
                }
            }
        }
        Ok(best)
    }

    /// All admissible matches of one rule in scope, in buffer order.
    /// Updates the rule's find counter.
    pub fn find_all(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &mut Rule,
        scope: SearchScope,
    ) -> Result<Vec<Match>, EngineError> {
        let matcher = Matcher::compile(rule)?;
        let Some((start, end)) = scope_range(buf, scope) else {
            return Ok(Vec::new());
        };
        let text = buf.read_range(start, end);
        let mut matches = Vec::new();
        let mut search_from = 0;
        while let Some(m) = matcher.find_in(&text, search_from, None) {
            if self.cancel.is_cancelled() {
                break;
            }
            let abs_start = start + m.start;
            let abs_end = abs_start + m.len;
            if self.admissible(buf, scanner, &matcher, scope, abs_start, abs_end) {
                matches.push(Match {
                    start: abs_start,
                    end: abs_end,
                    text: m.text,
                    captures: m.captures,
                });
            }
            search_from = m.start + m.len.max(1);
        }
        rule.find_count += matches.len();
        Ok(matches)
    }

    /// Counts-only pass over the rule list: tallies every enabled rule's
    /// admissible matches in scope without writing. One outcome per rule in
    /// rule order; disabled rules get zero outcomes, compile failures are
    /// recorded per rule and the pass continues.
    pub fn find_list(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rules: &mut [Rule],
        options: &PassOptions,
    ) -> PassResult {
        let mut result = PassResult::default();
        for (index, rule) in rules.iter_mut().enumerate() {
            if result.cancelled || self.cancel.is_cancelled() {
                result.cancelled = true;
                result.outcomes.push(RuleOutcome::default());
                continue;
            }
            if !rule.enabled {
                result.outcomes.push(RuleOutcome::default());
                continue;
            }
            let outcome = match self.find_all(buf, scanner, rule, options.scope) {
                Ok(matches) => RuleOutcome {
                    found: matches.len(),
                    ..Default::default()
                },
                Err(e) => {
                    tracing::warn!(rule = index, error = %e, "rule failed during count pass");
                    RuleOutcome {
                        error: Some(e),
                        ..Default::default()
                    }
                }
            };
            result.outcomes.push(outcome);
            result.cancelled = self.cancel.is_cancelled();
        }
        result
    }

    /// Replace one previously located match. The match must still describe
    /// the buffer; a mismatch means the buffer moved underneath it.
    /// Returns the position just past the replacement.
    pub fn replace_one(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &mut Rule,
        scope: SearchScope,
        m: &Match,
    ) -> Result<usize, EngineError> {
        let matcher = Matcher::compile(rule)?;
        let template = regex_template(rule);
        let text = buf.read_range(m.start, buf.len());
        let still_there = matcher
            .find_in(&text, 0, template)
            .filter(|raw| raw.start == 0 && raw.len == m.end - m.start);
        let Some(raw) = still_there else {
            return Err(EngineError::BufferStale(
                "match no longer present at its position".to_string(),
            ));
        };

        let replacement = if rule.use_variables {
            // Number the match the way a full pass reaching it would
            let (scope_start, _) = scope_range(buf, scope).unwrap_or((0, 0));
            let line = buf.position_to_line(m.start);
            let (line_start, _) = buf.line_bounds(line);
            let cnt =
                1 + self.count_matches_in(buf, scanner, &matcher, scope, scope_start, m.start);
            let lcnt = 1 + self.count_matches_in(
                buf,
                scanner,
                &matcher,
                scope,
                line_start.max(scope_start),
                m.start,
            );
            let ctx = self.context_for(buf, scanner, scope, cnt, lcnt, m.start, &raw);
            self.evaluator.evaluate(&rule.replace, &ctx)?
        } else if rule.regex {
            raw.replacement.unwrap_or_default()
        } else {
            literal_replacement(rule)
        };

        let new_end = buf.replace_range(m.start, m.end, &replacement);
        rule.replace_count += 1;
        let events = buf.drain_changes();
        scanner.apply_changes(buf, events);
        Ok(new_end)
    }

    /// Replace every admissible match of one rule in scope, left to right.
    /// Counter updates and error reporting land in the returned outcome.
    pub fn replace_all(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &mut Rule,
        options: &PassOptions,
    ) -> RuleOutcome {
        self.evaluator.begin_pass();
        let (outcome, _) = self.run_rule(buf, scanner, rule, options);
        outcome
    }

    /// One full application of the rule list: enabled rules in list order,
    /// each with its own mode, later rules seeing earlier rules' output.
    pub fn replace_list(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rules: &mut [Rule],
        options: &PassOptions,
    ) -> PassResult {
        self.evaluator.begin_pass();
        let mut result = PassResult::default();
        for (index, rule) in rules.iter_mut().enumerate() {
            if result.cancelled || self.cancel.is_cancelled() {
                result.cancelled = true;
                result.outcomes.push(RuleOutcome::default());
                continue;
            }
            if !rule.enabled {
                result.outcomes.push(RuleOutcome::default());
                continue;
            }
            let (outcome, cancelled) = self.run_rule(buf, scanner, rule, options);
            if let Some(error) = &outcome.error {
                tracing::warn!(rule = index, error = %error, "rule failed during list pass");
            }
            result.outcomes.push(outcome);
            result.cancelled = cancelled;
        }
        tracing::debug!(
            found = result.total_found(),
            replaced = result.total_replaced(),
            cancelled = result.cancelled,
            "list pass finished"
        );
        result
    }

    /// Single-rule replace loop. The scope text is read once; every buffer
    /// write is mirrored into the local copy, so each match only costs the
    /// unscanned tail instead of a fresh read of the remaining scope.
    /// Advances at least one char past zero-length matches.
    fn run_rule(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        rule: &mut Rule,
        options: &PassOptions,
    ) -> (RuleOutcome, bool) {
        let matcher = match Matcher::compile(rule) {
            Ok(matcher) => matcher,
            Err(e) => {
                return (
                    RuleOutcome {
                        error: Some(e),
                        ..Default::default()
                    },
                    false,
                );
            }
        };
        let Some((scope_start, scope_end)) = scope_range(buf, options.scope) else {
            return (RuleOutcome::default(), false);
        };
        let template = regex_template(rule);

        let mut outcome = RuleOutcome::default();
        let mut cancelled = false;
        let mut text = buf.read_range(scope_start, scope_end);
        // Chars and bytes of `text` already behind us; `scope_start +
        // done_chars` is the absolute position of the tail.
        let mut done_chars = 0;
        let mut done_bytes = 0;
        let mut cnt = 0;
        let mut last_line = usize::MAX;
        let mut lcnt = 0;

        'pass: loop {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            // Locate the next admissible match in the tail
            let mut search_from = 0;
            let raw = loop {
                match matcher.find_in(&text[done_bytes..], search_from, template) {
                    None => break None,
                    Some(m) => {
                        let abs_start = scope_start + done_chars + m.start;
                        let abs_end = abs_start + m.len;
                        if self.admissible(buf, scanner, &matcher, options.scope, abs_start, abs_end)
                        {
                            break Some(m);
                        }
                        search_from = m.start + m.len.max(1);
                    }
                }
            };
            let Some(raw) = raw else { break };

            let abs_start = scope_start + done_chars + raw.start;
            let abs_end = abs_start + raw.len;
            outcome.found += 1;
            cnt += 1;

            let line = buf.position_to_line(abs_start);
            if line != last_line {
                last_line = line;
                lcnt = 0;
            }
            lcnt += 1;

            let m_byte_start = done_bytes + byte_of(&text[done_bytes..], raw.start);
            let m_byte_end = done_bytes + byte_of(&text[done_bytes..], raw.start + raw.len);

            let replacement = if rule.use_variables {
                let ctx = self.context_for(buf, scanner, options.scope, cnt, lcnt, abs_start, &raw);
                match self.evaluator.evaluate(&rule.replace, &ctx) {
                    Ok(replacement) => replacement,
                    Err(e) => {
                        tracing::warn!(error = %e, position = abs_start, "snippet failed, match left untouched");
                        if outcome.error.is_none() {
                            outcome.error = Some(e.clone());
                        }
                        if options.abort_on_snippet_error {
                            break 'pass;
                        }
                        let skip = byte_of(&text[done_bytes..], raw.start + raw.len.max(1));
                        if skip == 0 {
                            break 'pass;
                        }
                        done_chars += raw.start + raw.len.max(1);
                        done_bytes += skip;
                        continue;
                    }
                }
            } else if rule.regex {
                raw.replacement.clone().unwrap_or_default()
            } else {
                literal_replacement(rule)
            };

            buf.replace_range(abs_start, abs_end, &replacement);
            text.replace_range(m_byte_start..m_byte_end, &replacement);
            outcome.replaced += 1;

            // Keep the delimiter index in step with the write before the
            // next query can observe the buffer
            let events = buf.drain_changes();
            scanner.apply_changes(buf, events);

            done_chars += raw.start + replacement.chars().count();
            done_bytes = m_byte_start + replacement.len();
            if raw.len == 0 {
                // Step over one char so a zero-length pattern cannot rematch
                // in place
                let step = byte_of(&text[done_bytes..], 1);
                if step == 0 {
                    break;
                }
                done_chars += 1;
                done_bytes += step;
            }
        }

        rule.find_count += outcome.found;
        rule.replace_count += outcome.replaced;
        (outcome, cancelled)
    }

    /// Admissible matches of `matcher` in `[start, end)`.
    fn count_matches_in(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        matcher: &Matcher,
        scope: SearchScope,
        start: usize,
        end: usize,
    ) -> usize {
        if end <= start {
            return 0;
        }
        let text = buf.read_range(start, end);
        let mut count = 0;
        let mut from = 0;
        while let Some(m) = matcher.find_in(&text, from, None) {
            let abs = start + m.start;
            if self.admissible(buf, scanner, matcher, scope, abs, abs + m.len) {
                count += 1;
            }
            from = m.start + m.len.max(1);
        }
        count
    }

    fn admissible(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        matcher: &Matcher,
        scope: SearchScope,
        start: usize,
        end: usize,
    ) -> bool {
        if matcher.whole_word() && !is_whole_word(buf, start, end) {
            return false;
        }
        if scope == SearchScope::Columns && !scanner.is_position_selected(buf, start) {
            return false;
        }
        true
    }

    fn context_for(
        &mut self,
        buf: &dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        scope: SearchScope,
        cnt: usize,
        lcnt: usize,
        abs_start: usize,
        raw: &search::RawMatch,
    ) -> MatchContext {
        let line = buf.position_to_line(abs_start);
        let (line_start, _) = buf.line_bounds(line);
        let col = if scope == SearchScope::Columns {
            scanner.column_at(buf, abs_start)
        } else {
            None
        };
        MatchContext {
            cnt,
            line: line + 1,
            lcnt,
            lpos: abs_start - line_start,
            apos: abs_start,
            col,
            matched: raw.text.clone(),
            captures: raw.captures.clone(),
        }
    }
}

/// `(start, end)` of the scope, or None when a selection scope has no
/// selection.
fn scope_range(buf: &dyn HostBuffer, scope: SearchScope) -> Option<(usize, usize)> {
    match scope {
        SearchScope::Document | SearchScope::Columns => Some((0, buf.len())),
        SearchScope::Selection => match buf.current_selection() {
            Some((start, end)) if start < end => Some((start, end)),
            _ => {
                tracing::warn!("selection scope requested without a selection");
                None
            }
        },
    }
}

/// Byte offset of char offset `chars` into `text`, clamped to the end.
fn byte_of(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(b, _)| b)
}

fn regex_template(rule: &Rule) -> Option<&str> {
    (rule.regex && !rule.use_variables).then_some(rule.replace.as_str())
}

/// Literal/extended replacement text, escape-decoded when the rule is
/// extended.
fn literal_replacement(rule: &Rule) -> String {
    if rule.extended {
        escape::decode(&rule.replace)
    } else {
        rule.replace.clone()
    }
}
