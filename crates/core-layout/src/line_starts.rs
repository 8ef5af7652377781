//! Line-start table: one buffer offset per visible row.
//!
//! `None` marks a row below the end of the text. Rows fill top to bottom, so
//! once a row is `None` every later row is too. The table is refilled row by
//! row from the last good entry; callers decide which rows are stale.

use core_text::TextSource;

use crate::counter::LineCounter;
use crate::error::LayoutError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStarts {
    rows: Vec<Option<usize>>,
}

impl LineStarts {
    /// Fresh table: first row at offset 0, the rest unknown.
    pub fn new(visible_lines: usize) -> Self {
        let mut rows = vec![None; visible_lines.max(1)];
        rows[0] = Some(0);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<usize> {
        self.rows.get(row).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.rows
    }

    pub(crate) fn resize(&mut self, visible_lines: usize) {
        self.rows.resize(visible_lines.max(1), None);
    }

    /// Index of the last row holding text.
    pub fn last_filled(&self) -> Option<usize> {
        self.rows.iter().rposition(Option::is_some)
    }

    /// Blank rows are showing below the end of the text.
    pub fn has_ghost_rows(&self) -> bool {
        matches!(self.rows.last(), Some(None))
    }

    /// Last row whose start is at or before `pos`.
    pub(crate) fn row_at_or_before(&self, pos: usize) -> Option<usize> {
        self.rows
            .iter()
            .rposition(|start| start.is_some_and(|s| pos >= s))
    }

    /// Add `delta` to every filled row.
    pub(crate) fn shift_all(&mut self, delta: isize) {
        for start in self.rows.iter_mut().map_while(|s| s.as_mut()) {
            *start = start.saturating_add_signed(delta);
        }
    }

    /// Add `delta` to the filled rows from `from` on.
    pub(crate) fn shift_from(&mut self, from: usize, delta: isize) {
        for start in self.rows.iter_mut().skip(from).map_while(|s| s.as_mut()) {
            *start = start.saturating_add_signed(delta);
        }
    }

    /// Move rows `by` places down starting at `from`, shifting the moved
    /// offsets by `delta`. Rows moved past the bottom are dropped.
    pub(crate) fn slide_down(&mut self, from: usize, by: usize, delta: isize) {
        let n = self.rows.len();
        for i in (from.saturating_add(by)..n).rev() {
            self.rows[i] = self.rows[i - by].map(|s| s.saturating_add_signed(delta));
        }
    }

    /// Move rows `by` places up into `from..`, shifting the moved offsets by
    /// `delta`. Vacated bottom rows keep stale values until refilled.
    pub(crate) fn slide_up(&mut self, from: usize, by: usize, delta: isize) {
        let n = self.rows.len();
        for i in from..n.saturating_sub(by) {
            self.rows[i] = self.rows[i + by].map(|s| s.saturating_add_signed(delta));
        }
    }

    /// Recompute rows `start_row..=end_row` (clamped to the table), assuming
    /// the row before `start_row` is correct. Row 0 is set to `first_visible`.
    pub(crate) fn fill(
        &mut self,
        start_row: usize,
        end_row: usize,
        first_visible: usize,
        text: &dyn TextSource,
        counter: &LineCounter<'_>,
    ) {
        if start_row > end_row {
            return;
        }
        let last = self.rows.len() - 1;
        let end_row = end_row.min(last);
        let mut line = start_row.min(last);
        if line == 0 {
            self.rows[0] = Some(first_visible);
            line = 1;
        }
        if line > end_row {
            return;
        }

        let len = text.len_bytes();
        let Some(mut pos) = self.rows[line - 1] else {
            self.rows[line..=end_row].fill(None);
            return;
        };

        while line <= end_row {
            let (line_end, next_start) = counter.find_line_end(pos, true);
            pos = next_start;
            if pos >= len {
                // a text ending in a line break gets one more row at its end
                // so there is somewhere to show a cursor after the break
                if self.rows[line - 1] != Some(len) && line_end != next_start {
                    self.rows[line] = Some(len);
                    line += 1;
                }
                break;
            }
            self.rows[line] = Some(pos);
            line += 1;
        }
        if line <= end_row {
            self.rows[line..=end_row].fill(None);
        }
    }

    /// Check the ordering invariants against `first_visible` and the text
    /// length.
    pub fn validate(&self, first_visible: usize, len: usize) -> Result<(), LayoutError> {
        match self.rows.first().copied().flatten() {
            Some(start) if start == first_visible => {}
            Some(start) => {
                return Err(LayoutError::InconsistentLineStart {
                    index: 0,
                    offset: start,
                    previous: first_visible,
                });
            }
            None => return Err(LayoutError::MissingLineStart { index: 0 }),
        }
        let mut previous: Option<usize> = None;
        for (index, start) in self.rows.iter().enumerate() {
            match (previous, *start) {
                (_, Some(offset)) if offset > len => {
                    return Err(LayoutError::OutOfRangeOffset { offset, len });
                }
                (Some(prev), Some(offset)) if offset < prev => {
                    return Err(LayoutError::InconsistentLineStart {
                        index,
                        offset,
                        previous: prev,
                    });
                }
                (None, Some(_)) if index > 0 => {
                    return Err(LayoutError::MissingLineStart { index: index - 1 });
                }
                _ => {}
            }
            previous = *start;
        }
        Ok(())
    }
}
