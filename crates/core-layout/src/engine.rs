//! Layout engine state.
//!
//! [`LayoutEngine`] owns the line-start table for the viewport together with
//! the scroll position and the cached display line count of the whole text.
//! It does not own the text or the styles; every operation borrows them, so
//! the engine can sit beside a [`core_text::Buffer`] and be driven from its
//! change notifications (see `reconcile.rs`).

use core_text::{BufferChange, TextSource, displayed_columns};
use tracing::{debug, trace};

use crate::counter::LineCounter;
use crate::error::LayoutError;
use crate::line_starts::LineStarts;
use crate::metrics::{LayoutMetrics, LayoutMetricsSnapshot};
use crate::policy::{WrapMode, WrapPolicy};
use crate::style::StyleResolver;

/// Settings the engine is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub wrap: WrapMode,
    pub tab_distance: usize,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub line_height: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            wrap: WrapMode::NoWrap,
            tab_distance: 8,
            viewport_width: 640,
            viewport_height: 480,
            line_height: 16,
        }
    }
}

/// Rows needed to cover `height` pixels; a partly visible row counts.
pub fn visible_lines(height: u32, line_height: u32) -> usize {
    let rows = height.div_ceil(line_height.max(1)).max(1);
    usize::try_from(rows).unwrap_or(usize::MAX)
}

/// Scroll position and visible offset range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    /// 1-based display line number of the top row.
    pub top_line: usize,
    pub h_offset_px: u32,
    pub first_visible: usize,
    /// End of the last visible display line.
    pub last_visible: usize,
}

#[derive(Debug)]
pub struct LayoutEngine {
    pub(crate) mode: WrapMode,
    pub(crate) policy: WrapPolicy,
    pub(crate) tab_distance: usize,
    pub(crate) viewport_width: u32,
    pub(crate) viewport_height: u32,
    pub(crate) line_height: u32,
    pub(crate) starts: LineStarts,
    pub(crate) top_line: usize,
    pub(crate) h_offset: u32,
    pub(crate) first_visible: usize,
    pub(crate) last_visible: usize,
    /// Display line breaks in the whole text (display lines minus one).
    pub(crate) buffer_lines: usize,
    pub(crate) abs_top_line: usize,
    pub(crate) keep_abs_top_line: bool,
    /// Display lines measured before a proportional-width deletion.
    pub(crate) pending_deleted: Option<usize>,
    pub(crate) metrics: LayoutMetrics,
}

impl LayoutEngine {
    pub fn new(
        options: LayoutOptions,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
    ) -> Self {
        let line_height = options.line_height.max(1);
        let rows = visible_lines(options.viewport_height, line_height);
        let mut engine = Self {
            mode: options.wrap,
            policy: WrapPolicy::resolve(options.wrap, options.viewport_width, styles),
            tab_distance: options.tab_distance.max(1),
            viewport_width: options.viewport_width,
            viewport_height: options.viewport_height,
            line_height,
            starts: LineStarts::new(rows),
            top_line: 1,
            h_offset: 0,
            first_visible: 0,
            last_visible: 0,
            buffer_lines: 0,
            abs_top_line: 1,
            keep_abs_top_line: false,
            pending_deleted: None,
            metrics: LayoutMetrics::default(),
        };
        engine.relayout(text, styles);
        debug!(
            target: "layout.viewport",
            rows,
            policy = ?engine.policy,
            buffer_lines = engine.buffer_lines,
            "layout_created"
        );
        engine
    }

    pub(crate) fn counter<'a>(
        &'a self,
        text: &'a dyn TextSource,
        styles: &'a dyn StyleResolver,
    ) -> LineCounter<'a> {
        LineCounter::new(text, styles, self.policy, self.tab_distance, &self.metrics)
    }

    /// Recompute rows `start..=end` from the row above `start`.
    pub(crate) fn refill(
        &mut self,
        start: usize,
        end: usize,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
    ) {
        let counter = LineCounter::new(text, styles, self.policy, self.tab_distance, &self.metrics);
        self.starts
            .fill(start, end, self.first_visible, text, &counter);
    }

    pub(crate) fn update_last_visible(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver) {
        let last_start = self
            .starts
            .last_filled()
            .and_then(|row| self.starts.get(row))
            .unwrap_or(self.first_visible);
        self.last_visible = self.counter(text, styles).line_end(last_start, true);
    }

    // ---- accessors -------------------------------------------------------

    /// Rows in the viewport (filled or not).
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    pub fn line_start(&self, row: usize) -> Option<usize> {
        self.starts.get(row)
    }

    pub fn line_starts(&self) -> &[Option<usize>] {
        self.starts.as_slice()
    }

    pub fn viewport(&self) -> ViewportState {
        ViewportState {
            top_line: self.top_line,
            h_offset_px: self.h_offset,
            first_visible: self.first_visible,
            last_visible: self.last_visible,
        }
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.mode
    }

    pub fn policy(&self) -> WrapPolicy {
        self.policy
    }

    pub fn tab_distance(&self) -> usize {
        self.tab_distance
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn line_height(&self) -> u32 {
        self.line_height
    }

    /// Display lines in the whole text.
    pub fn buffer_line_count(&self) -> usize {
        self.buffer_lines + 1
    }

    pub fn metrics(&self) -> LayoutMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// `offset` if it lies within the text, otherwise an error.
    pub fn checked_offset(&self, text: &dyn TextSource, offset: usize) -> Result<usize, LayoutError> {
        let len = text.len_bytes();
        if offset > len {
            return Err(LayoutError::OutOfRangeOffset { offset, len });
        }
        Ok(offset)
    }

    /// Clamp `offset` into the text and onto a character boundary.
    pub(crate) fn clamp_offset(&self, text: &dyn TextSource, offset: usize) -> usize {
        if let Err(err) = self.checked_offset(text, offset) {
            trace!(target: "layout.viewport", error = %err, "offset_clamped");
        }
        text.snap_char_boundary(offset)
    }

    // ---- display line navigation ---------------------------------------

    pub fn count_lines(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        start: usize,
        end: usize,
        is_line_start: bool,
    ) -> usize {
        self.counter(text, styles)
            .count_lines(start, end, is_line_start)
    }

    pub fn skip_lines(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        start: usize,
        n: usize,
        is_line_start: bool,
    ) -> usize {
        self.counter(text, styles)
            .skip_lines(start, n, is_line_start)
    }

    pub fn rewind_lines(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        start: usize,
        n: usize,
    ) -> usize {
        self.counter(text, styles).rewind_lines(start, n)
    }

    pub fn display_line_start(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        pos: usize,
    ) -> usize {
        self.counter(text, styles).display_line_start(pos)
    }

    pub fn display_line_end(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        pos: usize,
        is_line_start: bool,
    ) -> usize {
        self.counter(text, styles).line_end(pos, is_line_start)
    }

    /// Viewport row displaying `pos`, if any.
    pub fn position_to_row(&self, text: &dyn TextSource, pos: usize) -> Option<usize> {
        self.row_of(pos, text.len_bytes())
    }

    /// Row lookup against the table. Past the last visible character a row
    /// is still reported when blank rows follow the text, so a cursor at the
    /// very end has somewhere to go.
    pub(crate) fn row_of(&self, pos: usize, len: usize) -> Option<usize> {
        if pos < self.first_visible {
            return None;
        }
        if pos > self.last_visible {
            if !self.starts.has_ghost_rows() {
                return None;
            }
            if self.last_visible < len {
                let row = self.row_of(self.last_visible, len)? + 1;
                return (row < self.starts.len()).then_some(row);
            }
            return Some(self.row_of(self.last_visible.saturating_sub(1), len).unwrap_or(0));
        }
        self.starts.row_at_or_before(pos)
    }

    // ---- re-wrapping -----------------------------------------------------

    /// Re-wrap the whole text, keeping the first visible character on screen.
    pub fn relayout(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver) {
        self.policy = WrapPolicy::resolve(self.mode, self.viewport_width, styles);
        let len = text.len_bytes();
        let (buffer_lines, first, top) = {
            let counter = self.counter(text, styles);
            let first = counter.display_line_start(self.first_visible.min(len));
            (
                counter.count_lines(0, len, true),
                first,
                counter.count_lines(0, first, true) + 1,
            )
        };
        self.buffer_lines = buffer_lines;
        self.first_visible = first;
        self.top_line = top;
        self.reset_absolute_top_line(text);
        self.refill(0, self.starts.len(), text, styles);
        self.update_last_visible(text, styles);
        LayoutMetrics::bump(&self.metrics.relayouts);
        debug!(
            target: "layout.viewport",
            policy = ?self.policy,
            buffer_lines,
            top_line = top,
            "relayout"
        );
        self.settle(text, styles);
    }

    /// Start over on a replaced text: top of the text, no scroll.
    pub fn attach(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver) {
        self.first_visible = 0;
        self.top_line = 1;
        self.h_offset = 0;
        self.pending_deleted = None;
        self.starts = LineStarts::new(self.starts.len());
        LayoutMetrics::bump(&self.metrics.full_rebuilds);
        self.relayout(text, styles);
    }

    pub fn set_wrap_mode(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        mode: WrapMode,
    ) {
        self.mode = mode;
        self.relayout(text, styles);
    }

    pub fn set_tab_distance(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        tab_distance: usize,
    ) {
        self.tab_distance = tab_distance.max(1);
        self.relayout(text, styles);
    }

    // ---- absolute line numbers -------------------------------------------

    /// Keep a logical line number for the top row while wrapping. Costs a
    /// newline count over the skipped range on every scroll.
    pub fn maintain_absolute_top_line(&mut self, text: &dyn TextSource, on: bool) {
        self.keep_abs_top_line = on;
        if on {
            self.reset_absolute_top_line(text);
        }
    }

    fn maintaining_absolute_top_line(&self) -> bool {
        self.policy.wraps() && self.keep_abs_top_line
    }

    /// Logical line number (1-based) of the line holding the first visible
    /// character, when known.
    pub fn absolute_top_line(&self) -> Option<usize> {
        if !self.policy.wraps() {
            Some(self.top_line)
        } else if self.keep_abs_top_line {
            Some(self.abs_top_line)
        } else {
            None
        }
    }

    pub(crate) fn reset_absolute_top_line(&mut self, text: &dyn TextSource) {
        self.abs_top_line = 1;
        self.track_absolute_top_line(text, 0);
    }

    /// Follow a move of the first visible character away from `old_first`.
    pub(crate) fn track_absolute_top_line(&mut self, text: &dyn TextSource, old_first: usize) {
        if !self.maintaining_absolute_top_line() {
            return;
        }
        if self.first_visible < old_first {
            let moved = text.count_lines(self.first_visible, old_first);
            self.abs_top_line = self.abs_top_line.saturating_sub(moved).max(1);
        } else {
            self.abs_top_line += text.count_lines(old_first, self.first_visible);
        }
    }

    /// Follow a buffer edit: shift by its logical line delta when it lies
    /// wholly above the first visible character, recount when it reached it.
    pub(crate) fn track_edit_absolute_top_line(
        &mut self,
        text: &dyn TextSource,
        change: &BufferChange<'_>,
        old_first: usize,
    ) {
        if !self.maintaining_absolute_top_line() {
            return;
        }
        if change.pos + change.deleted < old_first {
            let inserted = text.count_lines(change.pos, change.pos + change.inserted);
            let deleted = change
                .deleted_text
                .count_lines(0, change.deleted_text.len());
            self.abs_top_line = (self.abs_top_line + inserted)
                .saturating_sub(deleted)
                .max(1);
        } else if change.pos < old_first {
            self.reset_absolute_top_line(text);
        }
    }

    /// 1-based logical line and 0-based display column of `pos`.
    ///
    /// While wrapping this needs [`Self::maintain_absolute_top_line`] and only
    /// answers for visible positions.
    pub fn position_to_line_col(&self, text: &dyn TextSource, pos: usize) -> Option<(usize, usize)> {
        if self.policy.wraps() {
            if !self.maintaining_absolute_top_line()
                || pos < self.first_visible
                || pos > self.last_visible
            {
                return None;
            }
            let line = self.abs_top_line + text.count_lines(self.first_visible, pos);
            let col = displayed_columns(text, text.line_start(pos), pos, self.tab_distance);
            return Some((line, col));
        }
        let row = self.row_of(pos, text.len_bytes())?;
        let start = self.starts.get(row)?;
        let col = displayed_columns(text, start, pos.max(start), self.tab_distance);
        Some((self.top_line + row, col))
    }
}
