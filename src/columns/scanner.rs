//! Delimiter scanner - tokenizes lines and answers column queries
//!
//! Delimiter offsets are stored relative to the line start, so an edit on one
//! line never invalidates cached entries for its neighbors; absolute
//! positions are resolved through the host's line bounds at query time.
//! Multi-character delimiters are found by direct substring scan, never
//! regex, for predictable performance on large lines.

use crate::columns::scope::ColumnScope;
use crate::host::{BufferId, HostBuffer};

/// Cached scan of one line: delimiter start offsets (chars, relative to line
/// start, strictly increasing) plus the line's content length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    pub delimiters: Vec<usize>,
    pub len: usize,
}

/// One entry per document line, tagged with the owning buffer so a document
/// switch is detected without an explicit notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    pub owner: Option<BufferId>,
    pub lines: Vec<LineEntry>,
}

impl LineIndex {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Scanner plus its cached index. The index is exclusively owned here; the
/// matching engine only reads it through the query methods.
#[derive(Debug)]
pub struct DelimiterScanner {
    scope: ColumnScope,
    index: LineIndex,
}

impl DelimiterScanner {
    pub fn new(scope: ColumnScope) -> Self {
        Self {
            scope,
            index: LineIndex::default(),
        }
    }

    pub fn scope(&self) -> &ColumnScope {
        &self.scope
    }

    /// Swap in a new scope. A delimiter or quote change invalidates the
    /// cached positions; a column-selection-only change keeps them and just
    /// changes membership answers.
    pub fn set_scope(&mut self, scope: ColumnScope) {
        if self.scope.needs_rescan_for(&scope) {
            tracing::debug!("delimiter or quote changed, dropping cached line index");
            self.index = LineIndex::default();
        }
        self.scope = scope;
    }

    /// Read-only view of the cached index (tests, diagnostics)
    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    /// Only the change-log maintainer may patch entries in place
    pub(crate) fn index_mut(&mut self) -> &mut LineIndex {
        &mut self.index
    }

    /// Scan one line of the buffer.
    ///
    /// A quote char toggles in-quote state and delimiters inside a quoted
    /// span are skipped. An unmatched trailing quote runs to end of line;
    /// malformed quoting can under-count columns but never fails.
    pub fn scan_line(&self, buf: &dyn HostBuffer, line: usize) -> LineEntry {
        let (start, end) = buf.line_bounds(line);
        let text: Vec<char> = buf.read_range(start, end).chars().collect();
        let delim = self.scope.delimiter();

        let mut delimiters = Vec::new();
        if !delim.is_empty() {
            let quote = self.scope.quote();
            let mut in_quote = false;
            let mut i = 0;
            while i < text.len() {
                if Some(text[i]) == quote {
                    in_quote = !in_quote;
                    i += 1;
                } else if !in_quote && text[i..].starts_with(delim) {
                    delimiters.push(i);
                    i += delim.len();
                } else {
                    i += 1;
                }
            }
        }

        LineEntry {
            delimiters,
            len: text.len(),
        }
    }

    /// Cold rebuild of the whole index from the current buffer state.
    pub fn rebuild_all(&mut self, buf: &dyn HostBuffer) {
        let line_count = buf.line_count();
        let mut lines = Vec::with_capacity(line_count);
        for line in 0..line_count {
            lines.push(self.scan_line(buf, line));
        }
        tracing::debug!(lines = line_count, "rebuilt delimiter index");
        self.index = LineIndex {
            owner: Some(buf.buffer_id()),
            lines,
        };
    }

    /// Make sure the cached index belongs to this buffer and exists at all;
    /// a document switch forces a cold rebuild.
    pub fn ensure_current(&mut self, buf: &dyn HostBuffer) {
        if self.index.owner != Some(buf.buffer_id()) {
            tracing::debug!("document switch detected, cold rebuilding index");
            self.rebuild_all(buf);
        }
    }

    /// 1-based column containing the absolute position, or None when the
    /// scope is invalid.
    ///
    /// A line with zero delimiters is entirely column 1; positions inside a
    /// delimiter sequence belong to the column it terminates, so membership
    /// is exhaustive and exclusive.
    pub fn column_at(&mut self, buf: &dyn HostBuffer, pos: usize) -> Option<usize> {
        if !self.scope.is_valid() {
            return None;
        }
        self.ensure_current(buf);

        let line = buf.position_to_line(pos);
        let entry = self.index.lines.get(line)?;
        let (line_start, _) = buf.line_bounds(line);
        let rel = pos.saturating_sub(line_start);
        let delim_len = self.scope.delimiter_len();

        let passed = entry
            .delimiters
            .iter()
            .take_while(|&&d| d + delim_len <= rel)
            .count();
        Some(passed + 1)
    }

    /// Whether the position falls in one of the selected columns. False for
    /// an invalid scope.
    pub fn is_position_selected(&mut self, buf: &dyn HostBuffer, pos: usize) -> bool {
        match self.column_at(buf, pos) {
            Some(column) => self.scope.is_selected(column),
            None => false,
        }
    }

    /// Text of a column on one line, bounded by the surrounding delimiters.
    /// Empty when the column does not exist on that line.
    pub fn column_text(&mut self, buf: &dyn HostBuffer, line: usize, column: usize) -> String {
        if column == 0 {
            return String::new();
        }
        self.ensure_current(buf);
        let Some(entry) = self.index.lines.get(line) else {
            return String::new();
        };
        if column > entry.delimiters.len() + 1 {
            return String::new();
        }

        let delim_len = self.scope.delimiter_len();
        let rel_start = if column == 1 {
            0
        } else {
            entry.delimiters[column - 2] + delim_len
        };
        let rel_end = if column <= entry.delimiters.len() {
            entry.delimiters[column - 1]
        } else {
            entry.len
        };

        let (line_start, _) = buf.line_bounds(line);
        buf.read_range(line_start + rel_start, line_start + rel_end.max(rel_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::scope::ColumnScopeConfig;
    use crate::host::RopeBuffer;

    fn scanner(delimiter: &str, quote: Option<char>, columns: &[usize]) -> DelimiterScanner {
        DelimiterScanner::new(ColumnScope::from_config(&ColumnScopeConfig {
            delimiter: delimiter.to_string(),
            quote,
            columns: columns.to_vec(),
        }))
    }

    #[test]
    fn test_scan_line_simple() {
        let buf = RopeBuffer::new("a,b,c");
        let s = scanner(",", None, &[1]);
        let entry = s.scan_line(&buf, 0);
        assert_eq!(entry.delimiters, vec![1, 3]);
        assert_eq!(entry.len, 5);
    }

    #[test]
    fn test_scan_line_quoted_field() {
        // a,"b,c",d -> 2 delimiters, 3 columns
        let buf = RopeBuffer::new("a,\"b,c\",d");
        let s = scanner(",", Some('"'), &[1]);
        let entry = s.scan_line(&buf, 0);
        assert_eq!(entry.delimiters, vec![1, 7]);
    }

    #[test]
    fn test_scan_line_unmatched_quote_runs_to_eol() {
        let buf = RopeBuffer::new("a,\"b,c,d");
        let s = scanner(",", Some('"'), &[1]);
        let entry = s.scan_line(&buf, 0);
        // Only the delimiter before the open quote counts
        assert_eq!(entry.delimiters, vec![1]);
    }

    #[test]
    fn test_scan_line_multi_char_delimiter() {
        let buf = RopeBuffer::new("a::b::c");
        let s = scanner("::", None, &[1]);
        let entry = s.scan_line(&buf, 0);
        assert_eq!(entry.delimiters, vec![1, 4]);
    }

    #[test]
    fn test_zero_delimiters_is_column_one() {
        let buf = RopeBuffer::new("no delimiters here");
        let mut s = scanner(",", None, &[1]);
        s.rebuild_all(&buf);
        assert_eq!(s.column_at(&buf, 0), Some(1));
        assert_eq!(s.column_at(&buf, 10), Some(1));
    }

    #[test]
    fn test_column_at_boundaries() {
        let buf = RopeBuffer::new("ab,cd,ef");
        let mut s = scanner(",", None, &[1, 2, 3]);
        s.rebuild_all(&buf);
        assert_eq!(s.column_at(&buf, 0), Some(1));
        assert_eq!(s.column_at(&buf, 2), Some(1)); // the delimiter itself
        assert_eq!(s.column_at(&buf, 3), Some(2));
        assert_eq!(s.column_at(&buf, 6), Some(3));
        assert_eq!(s.column_at(&buf, 7), Some(3));
    }

    #[test]
    fn test_invalid_scope_answers_none() {
        let buf = RopeBuffer::new("a,b");
        let mut s = scanner("", None, &[1]);
        s.rebuild_all(&buf);
        assert_eq!(s.column_at(&buf, 0), None);
        assert!(!s.is_position_selected(&buf, 0));
    }

    #[test]
    fn test_membership_exhaustive_and_exclusive() {
        let buf = RopeBuffer::new("a,\"b,c\",d");
        let mut s = scanner(",", Some('"'), &[1, 2, 3]);
        s.rebuild_all(&buf);
        for pos in 0..9 {
            let col = s.column_at(&buf, pos);
            assert!(
                matches!(col, Some(1..=3)),
                "pos {} got column {:?}",
                pos,
                col
            );
        }
    }

    #[test]
    fn test_column_text() {
        let buf = RopeBuffer::new("a,\"b,c\",d\nx,y\n");
        let mut s = scanner(",", Some('"'), &[1, 2, 3]);
        s.rebuild_all(&buf);
        assert_eq!(s.column_text(&buf, 0, 1), "a");
        assert_eq!(s.column_text(&buf, 0, 2), "\"b,c\"");
        assert_eq!(s.column_text(&buf, 0, 3), "d");
        assert_eq!(s.column_text(&buf, 0, 4), "");
        assert_eq!(s.column_text(&buf, 1, 2), "y");
    }

    #[test]
    fn test_document_switch_forces_rebuild() {
        let a = RopeBuffer::new("1,2");
        let b = RopeBuffer::new("3,4,5");
        let mut s = scanner(",", None, &[1]);
        s.rebuild_all(&a);
        assert_eq!(s.index().lines[0].delimiters.len(), 1);
        // Querying against another buffer must not reuse a's cache
        assert_eq!(s.column_at(&b, 4), Some(3));
        assert_eq!(s.index().owner, Some(b.buffer_id()));
    }

    #[test]
    fn test_column_selection_change_keeps_index() {
        let buf = RopeBuffer::new("a,b,c");
        let mut s = scanner(",", None, &[1]);
        s.rebuild_all(&buf);
        let before = s.index().clone();
        s.set_scope(ColumnScope::from_config(&ColumnScopeConfig {
            delimiter: ",".to_string(),
            quote: None,
            columns: vec![2],
        }));
        assert_eq!(s.index(), &before);
        // Delimiter change drops it
        s.set_scope(ColumnScope::from_config(&ColumnScopeConfig {
            delimiter: ";".to_string(),
            quote: None,
            columns: vec![2],
        }));
        assert!(s.index().is_empty());
    }
}
