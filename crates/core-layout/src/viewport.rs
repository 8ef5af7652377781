//! Scrolling, resizing and keeping a position on screen.

use core_text::TextSource;
use tracing::{debug, trace};

use crate::engine::{LayoutEngine, ViewportState, visible_lines};
use crate::metrics::LayoutMetrics;
use crate::policy::WrapMode;
use crate::style::StyleResolver;

impl LayoutEngine {
    /// Scroll so display line `top_line` (1-based) is the top row and the
    /// view is shifted `h_offset` pixels right.
    ///
    /// The top line is clamped so the text never scrolls further than leaving
    /// its last line (plus one blank row) on screen, and the horizontal offset
    /// so the longest visible line still reaches the right edge.
    pub fn scroll_to(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        top_line: usize,
        h_offset: u32,
    ) -> ViewportState {
        let rows = self.starts.len();
        let max_top = (self.buffer_lines + 3).saturating_sub(rows).max(1);
        let top = top_line.clamp(1, max_top);
        if top != top_line {
            debug!(target: "layout.viewport", requested = top_line, top, max_top, "top_line_clamped");
        }
        if top != self.top_line {
            self.offset_line_starts(text, styles, top);
            LayoutMetrics::bump(&self.metrics.scrolls);
        }

        let max_h = self
            .longest_visible_line(text, styles)
            .saturating_sub(self.viewport_width);
        let h = h_offset.min(max_h);
        if h != h_offset {
            debug!(target: "layout.viewport", requested = h_offset, h, max_h, "h_offset_clamped");
        }
        if h != self.h_offset {
            self.h_offset = h;
            LayoutMetrics::bump(&self.metrics.scrolls);
        }
        self.viewport()
    }

    /// Move the table to start at display line `new_top`, counting from
    /// whichever known position is nearest: the start of the text, the
    /// current first row, a row already in the table, the last row, or the
    /// end of the text.
    fn offset_line_starts(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver, new_top: usize) {
        let old_top = self.top_line;
        let old_first = self.first_visible;
        if new_top == old_top {
            return;
        }
        let rows = self.starts.len();
        let last_line = old_top + rows - 1;
        let (first, strategy) = {
            let counter = self.counter(text, styles);
            let from_start = || counter.skip_lines(0, new_top - 1, true);
            if new_top < old_top && new_top < old_top - new_top {
                (from_start(), "from_start")
            } else if new_top < old_top {
                (counter.rewind_lines(old_first, old_top - new_top), "back_from_top")
            } else if new_top < last_line {
                match self.starts.get(new_top - old_top) {
                    Some(start) => (start, "cached_row"),
                    None => (from_start(), "from_start"),
                }
            } else if new_top - last_line < self.buffer_lines.saturating_sub(new_top) {
                match self.starts.get(rows - 1) {
                    Some(start) => (counter.skip_lines(start, new_top - last_line, true), "forward_from_bottom"),
                    None => (from_start(), "from_start"),
                }
            } else {
                let back = (self.buffer_lines + 1).saturating_sub(new_top);
                (counter.rewind_lines(text.len_bytes(), back), "back_from_end")
            }
        };
        trace!(target: "layout.viewport", old_top, new_top, first, strategy, "offset_line_starts");
        self.first_visible = first;
        self.top_line = new_top;
        self.refill(0, rows, text, styles);
        self.update_last_visible(text, styles);
        self.track_absolute_top_line(text, old_first);
    }

    /// Pull the view back after the text shrank or the window grew: no
    /// scrolling at all when the whole text fits, otherwise no more than one
    /// blank row below the end of the text. Then re-clamp the horizontal
    /// offset.
    pub fn settle(&mut self, text: &dyn TextSource, styles: &dyn StyleResolver) {
        let rows = self.starts.len();
        if self.buffer_lines < rows || text.is_empty() {
            self.scroll_to(text, styles, 1, self.h_offset);
        } else {
            while rows >= 2 && self.top_line > 1 && self.starts.get(rows - 2).is_none() {
                let before = self.top_line;
                self.scroll_to(text, styles, before - 1, self.h_offset);
                if self.top_line >= before {
                    break;
                }
            }
        }
        let max_h = self
            .longest_visible_line(text, styles)
            .saturating_sub(self.viewport_width);
        if self.h_offset > max_h {
            self.scroll_to(text, styles, self.top_line, max_h);
        }
    }

    /// Change the viewport size. Wrapping at the viewport edge re-wraps the
    /// whole text when the width changes; otherwise only the row count is
    /// adjusted.
    pub fn resize(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        width: u32,
        height: u32,
    ) -> ViewportState {
        let old_width = self.viewport_width;
        let old_rows = self.starts.len();
        self.viewport_width = width;
        self.viewport_height = height;
        let rows = visible_lines(height, self.line_height);
        if rows != old_rows {
            self.starts.resize(rows);
        }

        if self.mode == WrapMode::AtBounds && width != old_width {
            debug!(target: "layout.viewport", old_width, width, rows, "rewrap_for_width");
            self.relayout(text, styles);
            return self.viewport();
        }
        if rows != old_rows {
            debug!(target: "layout.viewport", old_rows, rows, "rows_changed");
            self.refill(0, rows, text, styles);
            self.update_last_visible(text, styles);
        }
        self.settle(text, styles);
        self.viewport()
    }

    pub fn set_line_height(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        line_height: u32,
    ) -> ViewportState {
        self.line_height = line_height.max(1);
        self.resize(text, styles, self.viewport_width, self.viewport_height)
    }

    /// Scroll the least distance that puts `pos` on screen, keeping it off
    /// the last row (which may be cut off) and inside the viewport width.
    pub fn show_position(
        &mut self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        pos: usize,
    ) -> ViewportState {
        let pos = self.clamp_offset(text, pos);
        let rows = self.starts.len();
        let top = {
            let counter = self.counter(text, styles);
            if pos < self.first_visible {
                let up = counter.count_lines(pos, self.first_visible, false);
                self.top_line.saturating_sub(up).max(1)
            } else if let Some(anchor) = self.starts.get(rows.saturating_sub(2)) {
                self.top_line + counter.count_lines(anchor, pos, true)
            } else {
                self.top_line
            }
        };
        if top != self.top_line {
            self.scroll_to(text, styles, top, self.h_offset);
        }

        let x = self.offset_to_pixel(text, styles, pos).x;
        let width = i64::from(self.viewport_width);
        let mut h = i64::from(self.h_offset);
        if x > width {
            h += x - width;
        } else if x < 0 {
            h += x;
        }
        let h = u32::try_from(h.max(0)).unwrap_or(u32::MAX);
        if h != self.h_offset {
            self.scroll_to(text, styles, self.top_line, h);
        }
        self.viewport()
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{LayoutEngine, LayoutOptions};
    use crate::policy::{WrapMode, WrapPolicy};
    use crate::style::Monospace;
    use core_text::ScratchText;

    fn numbered(lines: usize) -> ScratchText {
        ScratchText::new((0..lines).map(|i| format!("line{i}\n")).collect::<String>())
    }

    fn engine(text: &ScratchText, styles: &Monospace, wrap: WrapMode, width: u32, rows: u32) -> LayoutEngine {
        let options = LayoutOptions {
            wrap,
            tab_distance: 8,
            viewport_width: width,
            viewport_height: rows,
            line_height: 1,
        };
        LayoutEngine::new(options, text, styles)
    }

    #[test]
    fn every_strategy_lands_on_the_same_rows() {
        let text = numbered(40);
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 80, 4);
        for top in [30, 29, 12, 13, 15, 2, 37, 1] {
            e.scroll_to(&text, &styles, top, 0);
            let expected = (top - 1) * 6;
            assert_eq!(e.viewport().first_visible, expected, "top {top}");
            assert_eq!(e.line_start(1), Some(expected + 6));
        }
    }

    #[test]
    fn top_line_is_clamped_to_the_end() {
        let text = numbered(10);
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 80, 4);
        // ten lines plus the empty line after the final newline
        let v = e.scroll_to(&text, &styles, 50, 0);
        assert_eq!(v.top_line, 9);
        assert_eq!(e.line_starts(), &[Some(48), Some(54), Some(60), None]);
        assert_eq!(e.scroll_to(&text, &styles, 0, 0).top_line, 1);
    }

    #[test]
    fn h_offset_is_clamped_to_the_longest_line() {
        let text = ScratchText::new("0123456789\nab");
        let styles = Monospace::new(2);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 10, 3);
        assert_eq!(e.scroll_to(&text, &styles, 1, 100).h_offset_px, 10);
    }

    #[test]
    fn show_position_scrolls_down_and_up() {
        let text = numbered(30);
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 80, 5);
        // keeps the target off the last row
        let v = e.show_position(&text, &styles, 10 * 6);
        assert_eq!(v.top_line, 8);
        assert_eq!(e.line_start(3), Some(60));
        let v = e.show_position(&text, &styles, 6);
        assert_eq!(v.top_line, 2);
        assert_eq!(v.first_visible, 6);
    }

    #[test]
    fn show_position_scrolls_horizontally() {
        let text = ScratchText::new("abcdefghijklmnopqrstuvwxyz");
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 10, 2);
        let v = e.show_position(&text, &styles, 20);
        assert_eq!(v.h_offset_px, 10);
        let v = e.show_position(&text, &styles, 2);
        assert_eq!(v.h_offset_px, 2);
    }

    #[test]
    fn resize_rewraps_at_bounds() {
        let text = ScratchText::new("aaaa bbbb cccc");
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::AtBounds, 5, 3);
        assert_eq!(e.policy(), WrapPolicy::FixedColumn(5));
        assert_eq!(e.line_starts(), &[Some(0), Some(5), Some(10)]);
        e.resize(&text, &styles, 10, 4);
        assert_eq!(e.policy(), WrapPolicy::FixedColumn(10));
        assert_eq!(e.line_starts(), &[Some(0), Some(10), None, None]);
    }

    #[test]
    fn taller_lines_mean_fewer_rows() {
        let text = numbered(6);
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 80, 3);
        e.set_line_height(&text, &styles, 3);
        assert_eq!(e.line_height(), 3);
        assert_eq!(e.line_starts(), &[Some(0)]);
        e.set_line_height(&text, &styles, 0);
        assert_eq!(e.line_height(), 1);
        assert_eq!(e.line_starts(), &[Some(0), Some(6), Some(12)]);
    }

    #[test]
    fn growing_the_window_settles_back_to_the_top() {
        let text = numbered(6);
        let styles = Monospace::new(1);
        let mut e = engine(&text, &styles, WrapMode::NoWrap, 80, 3);
        e.scroll_to(&text, &styles, 4, 0);
        assert_eq!(e.viewport().top_line, 4);
        let v = e.resize(&text, &styles, 80, 10);
        assert_eq!(v.top_line, 1);
        assert_eq!(e.line_count(), 10);
        assert_eq!(e.line_start(6), Some(36));
        assert_eq!(e.line_start(7), None);
    }
}
