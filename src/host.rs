//! Host buffer adapter - the narrow interface the engine owns the document through
//!
//! The engine never stores the document itself; every read and write goes
//! through [`HostBuffer`] so any host text representation (rope, gap buffer,
//! flat array) can back it. [`RopeBuffer`] is the ropey-based implementation
//! used by the CLI and the test suite.
//!
//! All positions are char offsets. Line numbers are 0-based; line bounds
//! exclude the line terminator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

/// Identity of a host document, used to detect document switches so a cached
/// line index is never applied to the wrong buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

impl BufferId {
    /// Allocate a fresh process-unique id
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What happened to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    Modify,
}

/// One entry of the buffer change stream.
///
/// Line numbers reference post-edit state, and entries must be consumed in
/// arrival order: later entries assume earlier entries' shifts have already
/// been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub line: usize,
}

/// Buffer access contract consumed by the scanner and the matching engine.
pub trait HostBuffer {
    /// Identity of the underlying document
    fn buffer_id(&self) -> BufferId;

    /// Total length in chars
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `[start, end)` as owned text
    fn read_range(&self, start: usize, end: usize) -> String;

    /// Replace `[start, end)` with `text`, returning the new end position.
    /// Modeled as read-then-write; implementations must emit change events
    /// for every line touched.
    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> usize;

    fn line_count(&self) -> usize;

    /// `(start, end)` char offsets of a line, excluding the terminator
    fn line_bounds(&self, line: usize) -> (usize, usize);

    fn position_to_line(&self, pos: usize) -> usize;

    /// Active selection, if any
    fn current_selection(&self) -> Option<(usize, usize)>;

    /// Word-character classification for whole-word matching. The host owns
    /// this so matching agrees with its own word navigation.
    fn is_word_char(&self, ch: char) -> bool;

    /// Take the pending change events in arrival order. Pull-based stand-in
    /// for a change-notification callback registration.
    fn drain_changes(&mut self) -> Vec<ChangeEvent>;
}

/// Ropey-backed [`HostBuffer`].
#[derive(Debug)]
pub struct RopeBuffer {
    id: BufferId,
    rope: Rope,
    selection: Option<(usize, usize)>,
    changes: VecDeque<ChangeEvent>,
}

impl RopeBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            id: BufferId::next(),
            rope: Rope::from_str(text),
            selection: None,
            changes: VecDeque::new(),
        }
    }

    /// Full document text (tests and CLI output)
    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.selection = Some((start, end));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Number of pending change events
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }
}

impl HostBuffer for RopeBuffer {
    fn buffer_id(&self) -> BufferId {
        self.id
    }

    fn len(&self) -> usize {
        self.rope.len_chars()
    }

    fn read_range(&self, start: usize, end: usize) -> String {
        self.rope.slice(start..end).to_string()
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> usize {
        let start_line = self.rope.char_to_line(start);
        let end_line = self.rope.char_to_line(end);

        if end > start {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }

        // Post-edit line numbers, in the order the maintainer must apply
        // them: collapse removed lines into the start line, then insert the
        // lines the new text introduced, then rescan the start line.
        let removed_lines = end_line - start_line;
        let inserted_lines = text.matches('\n').count();
        for _ in 0..removed_lines {
            self.changes.push_back(ChangeEvent {
                kind: ChangeKind::Delete,
                line: start_line + 1,
            });
        }
        for i in 0..inserted_lines {
            self.changes.push_back(ChangeEvent {
                kind: ChangeKind::Insert,
                line: start_line + 1 + i,
            });
        }
        self.changes.push_back(ChangeEvent {
            kind: ChangeKind::Modify,
            line: start_line,
        });

        start + text.chars().count()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_bounds(&self, line: usize) -> (usize, usize) {
        let start = self.rope.line_to_char(line);
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        // Strip the terminator: \n, \r\n or \r
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
        }
        if len > 0 && slice.char(len - 1) == '\r' {
            len -= 1;
        }
        (start, start + len)
    }

    fn position_to_line(&self, pos: usize) -> usize {
        self.rope.char_to_line(pos)
    }

    fn current_selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    fn is_word_char(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_'
    }

    fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        self.changes.drain(..).collect()
    }
}
