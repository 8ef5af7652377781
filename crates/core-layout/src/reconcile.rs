//! Incremental reconciliation of the line-start table after a buffer edit.
//!
//! An edit arrives as a [`BufferChange`]. While wrapping, the changed range is
//! first widened to whole display lines (an edit can re-wrap the line above it
//! and any number of lines below), and the number of display lines it held
//! before and after is measured. The table is then patched according to where
//! the widened range sits relative to the viewport:
//!
//! * wholly above the first visible character: shift every entry
//! * reaching into the first visible line: re-anchor and refill
//! * inside the viewport: keep the rows above, slide the rows below, count
//!   only the changed rows
//! * below the text with blank rows showing: fill the blank rows
//! * below the viewport: nothing
//!
//! Every path ends with a consistency check; a failure is logged and repaired
//! by a full rebuild anchored at the start of the text.

use std::cmp::Ordering;

use core_text::{BufferChange, ScratchText, TextSource};
use tracing::{debug, trace, warn};

use crate::counter::LineCounter;
use crate::engine::LayoutEngine;
use crate::error::LayoutError;
use crate::metrics::LayoutMetrics;
use crate::style::StyleResolver;

/// A buffer edit expressed in display lines. While wrapping, the range is
/// already widened to cover every display line whose wrapping changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDescriptor {
    pub position: usize,
    pub chars_inserted: usize,
    pub chars_deleted: usize,
    pub lines_inserted: usize,
    pub lines_deleted: usize,
}

impl EditDescriptor {
    fn char_delta(&self) -> isize {
        self.chars_inserted as isize - self.chars_deleted as isize
    }

    fn line_delta(&self) -> isize {
        self.lines_inserted as isize - self.lines_deleted as isize
    }
}

/// Where an edit landed relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPlacement {
    BeforeViewport,
    OverlapsTop,
    /// Starts on viewport row `line`.
    Interior { line: usize },
    /// Past the end of the text, onto blank row `line`.
    GhostLines { line: usize },
    Beyond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// The first visible character moved to a different line.
    pub scrolled: bool,
    pub placement: EditPlacement,
}

/// Widened edit range from the wrap-range search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WrapRange {
    mod_start: usize,
    mod_end: usize,
    lines_inserted: usize,
    lines_deleted: usize,
}

impl LayoutEngine {
    /// Hook run before the buffer changes. Proportional wrapping cannot
    /// re-measure deleted text afterwards (its styles are gone), so the
    /// display lines it covered are measured now.
    pub fn on_pre_delete(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        pos: usize,
        deleted: usize,
    ) {
        if self.policy.measures_pixels() {
            self.measure_deleted_lines(text, styles, pos, deleted);
        } else {
            self.pending_deleted = None;
        }
    }

    /// Hook run after the buffer changed. Returns `None` for style-only
    /// changes, which never move a line start.
    pub fn on_modified(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        change: &BufferChange<'_>,
    ) -> Option<Reconciled> {
        if change.inserted == 0 && change.deleted == 0 {
            trace!(target: "layout.reconcile", pos = change.pos, restyled = change.restyled, "restyle_only");
            return None;
        }
        let old_first = self.first_visible;
        let edit = self.describe_edit(text, styles, change);
        let reconciled = self.reconcile(text, styles, edit);
        self.track_edit_absolute_top_line(text, change, old_first);
        self.settle(text, styles);
        debug!(
            target: "layout.reconcile",
            pos = change.pos,
            inserted = change.inserted,
            deleted = change.deleted,
            placement = ?reconciled.placement,
            scrolled = reconciled.scrolled,
            "edit_reconciled"
        );
        Some(reconciled)
    }

    fn describe_edit(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        change: &BufferChange<'_>,
    ) -> EditDescriptor {
        if !self.policy.wraps() {
            self.pending_deleted = None;
            return EditDescriptor {
                position: change.pos,
                chars_inserted: change.inserted,
                chars_deleted: change.deleted,
                lines_inserted: text.count_lines(change.pos, change.pos + change.inserted),
                lines_deleted: change
                    .deleted_text
                    .count_lines(0, change.deleted_text.len()),
            };
        }
        let range = self.find_wrap_range(
            text,
            styles,
            change.deleted_text,
            change.pos,
            change.inserted,
            change.deleted,
        );
        self.pending_deleted = None;
        let resume = change.pos + change.inserted;
        EditDescriptor {
            position: range.mod_start,
            chars_inserted: range.mod_end - range.mod_start,
            chars_deleted: change.deleted
                + (change.pos - range.mod_start)
                + (range.mod_end - resume),
            lines_inserted: range.lines_inserted,
            lines_deleted: range.lines_deleted,
        }
    }

    /// Where to start counting for an edit at `pos`: the visible row above
    /// the one holding `pos` (an edit can pull text up onto it), or the
    /// logical line start when `pos` is off screen. Also returns the row.
    fn count_origin(&self, text: &dyn TextSource, pos: usize) -> (usize, usize) {
        if pos >= self.first_visible && pos <= self.last_visible {
            let row = (1..self.starts.len())
                .rev()
                .find(|&i| self.starts.get(i).is_some_and(|s| pos >= s));
            if let Some(from) = row.and_then(|i| self.starts.get(i - 1)) {
                return (from, row.map_or(0, |i| i - 1));
            }
        }
        (text.line_start(pos), 0)
    }

    /// Widen an edit to whole display lines and count the lines it spans in
    /// the new text and in the old.
    ///
    /// Counting runs forward from [`Self::count_origin`] until it passes the
    /// inserted text and hits a real newline, or until a line start matches
    /// the old table again (shifted by the edit). The old line count comes
    /// from a scratch copy of the old text over the same range, unless it was
    /// measured before the edit.
    fn find_wrap_range(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        deleted_text: &str,
        pos: usize,
        inserted: usize,
        deleted: usize,
    ) -> WrapRange {
        let len = text.len_bytes();
        let n = self.starts.len();
        let resync = self.pending_deleted.is_none();
        let counter = self.counter(text, styles);

        let (mut count_from, mut row) = self.count_origin(text, pos);
        let mut mod_start = count_from;
        let mut line_start = count_from;
        let mut lines = 0;

        let (count_to, mod_end) = loop {
            let r = counter.count(line_start, true, len, 1);
            if r.stop_offset >= len {
                // a break landing exactly on the end of the text still counts
                lines += r.lines_counted;
                break (len, len);
            }
            line_start = r.stop_offset;
            lines += 1;
            if line_start > pos + inserted && text.byte_at(line_start - 1) == b'\n' {
                break (line_start, line_start);
            }
            if !resync {
                continue;
            }

            if line_start <= pos {
                // a line start before the edit that matches the old table means
                // the wrapping above it is unchanged
                while row < n && self.starts.get(row).is_none_or(|s| s < line_start) {
                    row += 1;
                }
                if row < n && self.starts.get(row) == Some(line_start) {
                    count_from = line_start;
                    lines = 0;
                    mod_start = match self.starts.get(row + 1) {
                        Some(next) => pos.min(text.prev_char_boundary(next)),
                        None => count_from,
                    };
                } else {
                    mod_start = mod_start.min(text.prev_char_boundary(line_start));
                }
            } else if pos + inserted < line_start {
                // past the edit: a match against the old table, shifted back
                // by the edit, means the wrapping resynchronized
                let old_start = line_start + deleted - inserted;
                while row < n && self.starts.get(row).is_none_or(|s| s < old_start) {
                    row += 1;
                }
                if row < n && self.starts.get(row) == Some(old_start) {
                    break (counter.line_end(line_start, true), line_start);
                }
            }
        };

        let lines_deleted = match self.pending_deleted {
            Some(measured) => measured,
            None => {
                let scratch =
                    ScratchText::splice(text, count_from, pos, deleted_text, pos + inserted, count_to);
                LineCounter::new(&scratch, styles, self.policy, self.tab_distance, &self.metrics)
                    .with_style_base(count_from)
                    .count(0, true, scratch.len_bytes(), usize::MAX)
                    .lines_counted
            }
        };
        trace!(
            target: "layout.reconcile",
            mod_start,
            mod_end,
            lines_inserted = lines,
            lines_deleted,
            resync,
            "wrap_range"
        );
        WrapRange {
            mod_start,
            mod_end,
            lines_inserted: lines,
            lines_deleted,
        }
    }

    /// Count the display lines from the edit's counting origin through the
    /// first newline past the deleted range, in the text as it is before the
    /// deletion.
    fn measure_deleted_lines(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        pos: usize,
        deleted: usize,
    ) {
        let len = text.len_bytes();
        let (count_from, _) = self.count_origin(text, pos);
        let lines = {
            let counter = self.counter(text, styles);
            let mut line_start = count_from;
            let mut lines = 0;
            loop {
                let r = counter.count(line_start, true, len, 1);
                if r.stop_offset >= len {
                    lines += r.lines_counted;
                    break;
                }
                line_start = r.stop_offset;
                lines += 1;
                if line_start > pos + deleted && text.byte_at(line_start - 1) == b'\n' {
                    break;
                }
            }
            lines
        };
        LayoutMetrics::bump(&self.metrics.pre_measured_deletes);
        trace!(target: "layout.reconcile", pos, deleted, lines, "deleted_lines_measured");
        self.pending_deleted = Some(lines);
    }

    /// Keep a descriptor inside the text: the position on a char boundary
    /// no later than the end, the insertion within the text, and counts
    /// small enough for signed offset arithmetic.
    fn clamp_edit(&self, text: &dyn TextSource, edit: EditDescriptor) -> EditDescriptor {
        let len = text.len_bytes();
        let limit = isize::MAX as usize;
        let position = self.clamp_offset(text, edit.position);
        let clamped = EditDescriptor {
            position,
            chars_inserted: edit.chars_inserted.min(len - position),
            chars_deleted: edit.chars_deleted.min(limit - position),
            lines_inserted: edit.lines_inserted.min(limit),
            lines_deleted: edit.lines_deleted.min(limit),
        };
        if clamped != edit {
            trace!(target: "layout.reconcile", ?edit, ?clamped, "edit_clamped");
        }
        clamped
    }

    fn classify(&self, edit: &EditDescriptor, len: usize) -> EditPlacement {
        let pos = edit.position;
        if pos.saturating_add(edit.chars_deleted) < self.first_visible {
            EditPlacement::BeforeViewport
        } else if pos < self.first_visible {
            EditPlacement::OverlapsTop
        } else if pos <= self.last_visible {
            EditPlacement::Interior {
                line: self.row_of(pos, len).unwrap_or(0),
            }
        } else if self.starts.has_ghost_rows() {
            EditPlacement::GhostLines {
                line: self
                    .row_of(pos, len)
                    .unwrap_or(self.starts.len() - 1),
            }
        } else {
            EditPlacement::Beyond
        }
    }

    /// Patch the line-start table for `edit`, which has already been applied
    /// to `text`.
    pub fn reconcile(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        edit: EditDescriptor,
    ) -> Reconciled {
        let len = text.len_bytes();
        let edit = self.clamp_edit(text, edit);
        let placement = self.classify(&edit, len);
        self.metrics.record_placement(placement);

        let scrolled = match placement {
            EditPlacement::BeforeViewport => {
                let delta = edit.char_delta();
                self.top_line = (self.top_line + edit.lines_inserted)
                    .saturating_sub(edit.lines_deleted)
                    .max(1);
                self.starts.shift_all(delta);
                self.first_visible = self.first_visible.saturating_add_signed(delta);
                self.last_visible = self.last_visible.saturating_add_signed(delta);
                false
            }
            EditPlacement::OverlapsTop => {
                self.reanchor(text, styles, &edit, len);
                true
            }
            EditPlacement::Interior { line } => {
                self.salvage(text, styles, &edit, line);
                false
            }
            EditPlacement::GhostLines { line } => {
                self.refill(line, line + edit.lines_inserted, text, styles);
                self.update_last_visible(text, styles);
                false
            }
            EditPlacement::Beyond => false,
        };
        self.buffer_lines = (self.buffer_lines + edit.lines_inserted).saturating_sub(edit.lines_deleted);

        if let Err(err) = self.starts.validate(self.first_visible, len) {
            self.rebuild_after(text, styles, &err);
            return Reconciled {
                scrolled: true,
                placement,
            };
        }
        Reconciled {
            scrolled,
            placement,
        }
    }

    /// The edit deleted across the first visible character. Find the first
    /// surviving row below the edit and count back from it, or fall back to
    /// the top line number.
    fn reanchor(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        edit: &EditDescriptor,
        len: usize,
    ) {
        let survivor = self
            .row_of(edit.position.saturating_add(edit.chars_deleted), len)
            .map(|row| row + 1)
            .and_then(|row| self.starts.get(row).map(|start| (row, start)));
        let line_delta = edit.line_delta();
        let (top, first) = {
            let counter = self.counter(text, styles);
            if let Some((row, start)) = survivor {
                let anchor = start.saturating_add_signed(edit.char_delta());
                let first = counter.rewind_lines(anchor, row);
                let top = if first == 0 {
                    1
                } else {
                    self.top_line.saturating_add_signed(line_delta).max(1)
                };
                (top, first)
            } else if self.top_line > (self.buffer_lines + edit.lines_inserted).saturating_sub(edit.lines_deleted) {
                (1, 0)
            } else {
                (self.top_line, counter.skip_lines(0, self.top_line - 1, true))
            }
        };
        trace!(target: "layout.reconcile", top, first, survivor = ?survivor, "reanchored");
        self.top_line = top;
        self.first_visible = first;
        self.refill(0, self.starts.len() - 1, text, styles);
        self.update_last_visible(text, styles);
    }

    /// The edit starts on visible row `line`. Rows above it are unchanged;
    /// rows below it move by the line delta and shift by the char delta;
    /// only the changed rows are counted.
    fn salvage(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        edit: &EditDescriptor,
        line: usize,
    ) {
        let n = self.starts.len();
        let delta = edit.char_delta();
        match edit.lines_inserted.cmp(&edit.lines_deleted) {
            Ordering::Equal => self.starts.shift_from(line + 1, delta),
            Ordering::Greater => {
                let by = edit.lines_inserted - edit.lines_deleted;
                self.starts.slide_down(line + 1, by, delta);
            }
            Ordering::Less => {
                let by = edit.lines_deleted - edit.lines_inserted;
                self.starts.slide_up(line + 1, by, delta);
            }
        }
        self.refill(line + 1, line + edit.lines_inserted, text, styles);
        if edit.lines_deleted > edit.lines_inserted {
            let vacated = edit.lines_deleted - edit.lines_inserted;
            self.refill(n.saturating_sub(vacated), n, text, styles);
        }
        self.update_last_visible(text, styles);
    }

    /// Repopulate the whole table from the start of the text, keeping the
    /// top line number.
    fn rebuild_after(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver, err: &LayoutError) {
        warn!(
            target: "layout.reconcile",
            error = %err,
            top_line = self.top_line,
            first_visible = self.first_visible,
            "line_start_table_inconsistent"
        );
        LayoutMetrics::bump(&self.metrics.consistency_failures);
        LayoutMetrics::bump(&self.metrics.full_rebuilds);
        let len = text.len_bytes();
        let (buffer_lines, first, top) = {
            let counter = self.counter(text, styles);
            let first = counter.skip_lines(0, self.top_line.saturating_sub(1), true);
            (
                counter.count_lines(0, len, true),
                first,
                counter.count_lines(0, first, true) + 1,
            )
        };
        self.buffer_lines = buffer_lines;
        self.first_visible = first;
        self.top_line = top;
        self.refill(0, self.starts.len(), text, styles);
        self.update_last_visible(text, styles);
    }
}
