//! Change-log maintenance - incremental line index updates
//!
//! Consumes the buffer change stream in arrival order and patches the cached
//! index instead of rescanning the document: O(edited lines) amortized
//! instead of O(document) per keystroke. After a well-ordered log is applied
//! in full, the index is identical to a cold rebuild of the final buffer
//! state; that equivalence is the correctness property the integration tests
//! pin down.

use crate::columns::scanner::DelimiterScanner;
use crate::host::{ChangeEvent, ChangeKind, HostBuffer};

impl DelimiterScanner {
    /// Apply drained change events in FIFO order.
    ///
    /// Events carry post-edit line numbers; each kind patches exactly the
    /// entries it names. An out-of-range line means notifications were
    /// missed or misordered - the index is no longer trustworthy, so it is
    /// rebuilt from scratch and the rest of the log is discarded (the
    /// rebuild already reflects it).
    pub fn apply_changes(&mut self, buf: &dyn HostBuffer, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }
        // A document switch invalidates everything the log refers to; the
        // cold rebuild happens lazily on the next query.
        if self.index().owner != Some(buf.buffer_id()) {
            return;
        }

        for event in events {
            let line_count = self.index().len();
            match event.kind {
                ChangeKind::Insert => {
                    if event.line > line_count {
                        self.recover_stale(buf, event);
                        return;
                    }
                    let entry = self.scan_line(buf, event.line);
                    self.index_mut().lines.insert(event.line, entry);
                }
                ChangeKind::Delete => {
                    if event.line >= line_count {
                        self.recover_stale(buf, event);
                        return;
                    }
                    self.index_mut().lines.remove(event.line);
                }
                ChangeKind::Modify => {
                    if event.line >= line_count {
                        self.recover_stale(buf, event);
                        return;
                    }
                    let entry = self.scan_line(buf, event.line);
                    self.index_mut().lines[event.line] = entry;
                }
            }
        }
    }

    /// BufferStale recovery: log it, rebuild, move on. Callers never see
    /// this except as a latency spike.
    fn recover_stale(&mut self, buf: &dyn HostBuffer, event: ChangeEvent) {
        tracing::warn!(
            kind = ?event.kind,
            line = event.line,
            cached_lines = self.index().len(),
            "stale change-log entry, forcing full rebuild"
        );
        self.rebuild_all(buf);
    }
}
