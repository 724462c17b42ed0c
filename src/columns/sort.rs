//! Row sort and restore - reorder document lines by a column's text
//!
//! Sort keys come from the scanned columns, header lines are never
//! reordered, and the pre-sort row order is captured so one restore can undo
//! the whole cycle. The capture is only valid while no edit outside the
//! sort/restore cycle has touched the document.

use crate::columns::scanner::DelimiterScanner;
use crate::error::EngineError;
use crate::host::{BufferId, HostBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Pre-sort line order: `permutation[i]` is the original absolute line
/// number of the row now sitting at body position `i`.
#[derive(Debug, Clone)]
struct RowOrder {
    buffer_id: BufferId,
    permutation: Vec<usize>,
    line_count: usize,
}

/// Sorter with tri-state per-column cycling
/// (ascending -> descending -> restored).
#[derive(Debug)]
pub struct RowSorter {
    header_lines: usize,
    captured: Option<RowOrder>,
    last_column: Option<usize>,
    last_direction: Option<SortDirection>,
}

impl RowSorter {
    pub fn new(header_lines: usize) -> Self {
        Self {
            header_lines,
            captured: None,
            last_column: None,
            last_direction: None,
        }
    }

    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    /// The document changed outside the sort/restore cycle; the captured
    /// order no longer describes it.
    pub fn note_external_edit(&mut self) {
        self.captured = None;
        self.last_column = None;
        self.last_direction = None;
    }

    /// Stable sort of the body rows by the text of `column`.
    ///
    /// Captures the pre-sort order on the first sort of a cycle; repeated
    /// sorts keep the original capture so restore always returns to the
    /// true pre-cycle order.
    pub fn sort(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), EngineError> {
        let (first, end) = self.body_range(buf);
        if end - first < 2 {
            return Ok(());
        }

        let mut keyed: Vec<(String, usize)> = (first..end)
            .map(|line| (scanner.column_text(buf, line, column), line))
            .collect();
        match direction {
            SortDirection::Ascending => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            SortDirection::Descending => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        // Map new body position -> pre-sort absolute line. Across repeated
        // sorts the capture composes so it always points at the pre-cycle
        // order.
        let permutation: Vec<usize> = match &self.captured {
            Some(order) if order.buffer_id == buf.buffer_id() => keyed
                .iter()
                .map(|&(_, line)| order.permutation[line - first])
                .collect(),
            _ => keyed.iter().map(|&(_, line)| line).collect(),
        };

        let rows: Vec<String> = keyed
            .iter()
            .map(|&(_, line)| {
                let (s, e) = buf.line_bounds(line);
                buf.read_range(s, e)
            })
            .collect();
        self.write_body(buf, scanner, first, end, rows);

        self.captured = Some(RowOrder {
            buffer_id: buf.buffer_id(),
            permutation,
            line_count: buf.line_count(),
        });
        self.last_column = Some(column);
        self.last_direction = Some(direction);
        tracing::debug!(column, ?direction, rows = end - first, "sorted rows");
        Ok(())
    }

    /// Put the rows back in their captured pre-sort order.
    ///
    /// Fails with [`EngineError::StaleOrder`] when nothing was captured or
    /// the document no longer matches the capture; current order is then
    /// authoritative.
    pub fn restore(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
    ) -> Result<(), EngineError> {
        let order = self.captured.take().ok_or(EngineError::StaleOrder)?;
        if order.buffer_id != buf.buffer_id() || order.line_count != buf.line_count() {
            return Err(EngineError::StaleOrder);
        }

        let (first, end) = self.body_range(buf);
        if order.permutation.len() != end - first {
            return Err(EngineError::StaleOrder);
        }

        let mut rows: Vec<String> = vec![String::new(); end - first];
        for (body_pos, &original_line) in order.permutation.iter().enumerate() {
            let (s, e) = buf.line_bounds(first + body_pos);
            rows[original_line - first] = buf.read_range(s, e);
        }
        self.write_body(buf, scanner, first, end, rows);

        self.last_column = None;
        self.last_direction = None;
        tracing::debug!("restored pre-sort row order");
        Ok(())
    }

    /// Tri-state sort cycle for one column: ascending, then descending, then
    /// back to the original order. Switching columns starts a fresh cycle.
    /// Returns the direction now in effect, None once restored.
    pub fn cycle(
        &mut self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        column: usize,
    ) -> Result<Option<SortDirection>, EngineError> {
        let next = if self.last_column != Some(column) {
            Some(SortDirection::Ascending)
        } else {
            match self.last_direction {
                None => Some(SortDirection::Ascending),
                Some(SortDirection::Ascending) => Some(SortDirection::Descending),
                Some(SortDirection::Descending) => None,
            }
        };

        match next {
            Some(direction) => {
                self.sort(buf, scanner, column, direction)?;
                Ok(Some(direction))
            }
            None => {
                self.restore(buf, scanner)?;
                Ok(None)
            }
        }
    }

    /// Sortable body: `[first, end)` line numbers, excluding headers and the
    /// phantom empty line after a trailing newline.
    fn body_range(&self, buf: &dyn HostBuffer) -> (usize, usize) {
        let mut end = buf.line_count();
        if end > 0 {
            let (s, e) = buf.line_bounds(end - 1);
            if s == e && s == buf.len() {
                end -= 1;
            }
        }
        (self.header_lines.min(end), end)
    }

    /// Rewrite the body rows in one buffer write and bring the scanner's
    /// index up to date with the resulting change events.
    ///
    /// Row content moves, line terminators stay with their positions, so a
    /// CRLF (or mixed-ending) document keeps its exact terminator bytes and
    /// sort-then-restore stays byte-identical.
    fn write_body(
        &self,
        buf: &mut dyn HostBuffer,
        scanner: &mut DelimiterScanner,
        first: usize,
        end: usize,
        rows: Vec<String>,
    ) {
        let (body_start, _) = buf.line_bounds(first);
        let mut out = String::new();
        let mut body_end = body_start;
        for (i, row) in rows.iter().enumerate() {
            let line = first + i;
            let (_, content_end) = buf.line_bounds(line);
            let next_start = if line + 1 < buf.line_count() {
                buf.line_bounds(line + 1).0
            } else {
                buf.len()
            };
            out.push_str(row);
            out.push_str(&buf.read_range(content_end, next_start));
            body_end = next_start;
        }
        buf.replace_range(body_start, body_end, &out);
        let events = buf.drain_changes();
        scanner.apply_changes(buf, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::scope::{ColumnScope, ColumnScopeConfig};
    use crate::host::RopeBuffer;

    fn comma_scanner() -> DelimiterScanner {
        DelimiterScanner::new(ColumnScope::from_config(&ColumnScopeConfig {
            delimiter: ",".to_string(),
            quote: None,
            columns: vec![1, 2],
        }))
    }

    #[test]
    fn test_sort_ascending_by_column() {
        let mut buf = RopeBuffer::new("name,age\ncarol,30\nalice,25\nbob,28\n");
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(1);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        assert_eq!(
            buf.to_string(),
            "name,age\nalice,25\nbob,28\ncarol,30\n"
        );
    }

    #[test]
    fn test_sort_descending_by_second_column() {
        let mut buf = RopeBuffer::new("a,1\nb,3\nc,2\n");
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 2, SortDirection::Descending)
            .unwrap();
        assert_eq!(buf.to_string(), "b,3\nc,2\na,1\n");
    }

    #[test]
    fn test_sort_is_stable_on_equal_keys() {
        let mut buf = RopeBuffer::new("x,first\nx,second\na,third\n");
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        assert_eq!(buf.to_string(), "a,third\nx,first\nx,second\n");
    }

    #[test]
    fn test_sort_then_restore_is_identity() {
        let original = "hdr\nc,3\na,1\nb,2\n";
        let mut buf = RopeBuffer::new(original);
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(1);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        assert_ne!(buf.to_string(), original);
        sorter.restore(&mut buf, &mut scanner).unwrap();
        assert_eq!(buf.to_string(), original);
    }

    #[test]
    fn test_repeated_sorts_restore_to_pre_cycle_order() {
        let original = "c,3\na,1\nb,2\n";
        let mut buf = RopeBuffer::new(original);
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Descending)
            .unwrap();
        sorter.restore(&mut buf, &mut scanner).unwrap();
        assert_eq!(buf.to_string(), original);
    }

    #[test]
    fn test_cycle_asc_desc_restore() {
        let original = "b\na\nc\n";
        let mut buf = RopeBuffer::new(original);
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        assert_eq!(
            sorter.cycle(&mut buf, &mut scanner, 1).unwrap(),
            Some(SortDirection::Ascending)
        );
        assert_eq!(buf.to_string(), "a\nb\nc\n");
        assert_eq!(
            sorter.cycle(&mut buf, &mut scanner, 1).unwrap(),
            Some(SortDirection::Descending)
        );
        assert_eq!(buf.to_string(), "c\nb\na\n");
        assert_eq!(sorter.cycle(&mut buf, &mut scanner, 1).unwrap(), None);
        assert_eq!(buf.to_string(), original);
    }

    #[test]
    fn test_crlf_sort_restore_byte_identical() {
        let original = "b,2\r\na,1\r\n";
        let mut buf = RopeBuffer::new(original);
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        assert_eq!(buf.to_string(), "a,1\r\nb,2\r\n");
        sorter.restore(&mut buf, &mut scanner).unwrap();
        assert_eq!(buf.to_string(), original);
    }

    #[test]
    fn test_mixed_line_endings_stay_with_their_positions() {
        let original = "b\na\r\nc";
        let mut buf = RopeBuffer::new(original);
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        assert_eq!(buf.to_string(), "a\nb\r\nc");
        sorter.restore(&mut buf, &mut scanner).unwrap();
        assert_eq!(buf.to_string(), original);
    }

    #[test]
    fn test_external_edit_invalidates_restore() {
        let mut buf = RopeBuffer::new("b,2\na,1\n");
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);

        sorter
            .sort(&mut buf, &mut scanner, 1, SortDirection::Ascending)
            .unwrap();
        sorter.note_external_edit();
        assert!(matches!(
            sorter.restore(&mut buf, &mut scanner),
            Err(EngineError::StaleOrder)
        ));
    }

    #[test]
    fn test_restore_without_sort_fails() {
        let mut buf = RopeBuffer::new("a\n");
        let mut scanner = comma_scanner();
        scanner.rebuild_all(&buf);
        let mut sorter = RowSorter::new(0);
        assert!(matches!(
            sorter.restore(&mut buf, &mut scanner),
            Err(EngineError::StaleOrder)
        ));
    }
}
