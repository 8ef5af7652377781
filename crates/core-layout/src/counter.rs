//! Wrapped line counter.
//!
//! Every question the engine asks about display lines ("where does line N
//! start", "how many lines between these offsets", "where does this line
//! end") is answered by one forward scan from a known line start. The scan
//! tracks the running column (fixed-width wrapping) or running pixel width
//! (proportional wrapping) and breaks lines at the last blank before the
//! budget, or at the overflowing character when the line has no blank.
//!
//! The counter works over any [`TextSource`], which lets the wrap-range finder
//! run it over a scratch copy of text that no longer exists in the buffer.
//! `style_base` maps scratch offsets back to buffer offsets for style lookup.

use core_text::{Glyphs, TextSource, expand};
use tracing::trace;

use crate::metrics::LayoutMetrics;
use crate::policy::WrapPolicy;
use crate::style::{StyleResolver, glyph_width};

/// Result of one counting scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCount {
    /// Where counting ended. When counting lines, the start of the line
    /// `max_lines` lines after the start.
    pub stop_offset: usize,
    /// Line breaks counted.
    pub lines_counted: usize,
    /// Start of the line where counting ended.
    pub last_line_start: usize,
    /// End of the last line traversed.
    pub last_line_end: usize,
    /// The scan reached the end of the text inside a line that holds
    /// characters but no terminator.
    pub unterminated_tail: bool,
}

pub struct LineCounter<'a> {
    text: &'a dyn TextSource,
    styles: &'a dyn StyleResolver,
    policy: WrapPolicy,
    tab_distance: usize,
    style_base: usize,
    metrics: &'a LayoutMetrics,
}

impl<'a> LineCounter<'a> {
    pub fn new(
        text: &'a dyn TextSource,
        styles: &'a dyn StyleResolver,
        policy: WrapPolicy,
        tab_distance: usize,
        metrics: &'a LayoutMetrics,
    ) -> Self {
        Self {
            text,
            styles,
            policy,
            tab_distance: tab_distance.max(1),
            style_base: 0,
            metrics,
        }
    }

    /// Offset added to text offsets before asking for their style.
    pub fn with_style_base(mut self, style_base: usize) -> Self {
        self.style_base = style_base;
        self
    }

    pub fn policy(&self) -> WrapPolicy {
        self.policy
    }

    /// Count forward from `start` until `stop_at` is reached or `max_lines`
    /// line breaks have been seen, whichever comes first.
    ///
    /// Counting continues past `stop_at` to the end of the line containing
    /// it, since a later character may wrap the line back before `stop_at`.
    pub fn count(
        &self,
        start: usize,
        is_line_start: bool,
        stop_at: usize,
        max_lines: usize,
    ) -> LineCount {
        LayoutMetrics::bump(&self.metrics.counter_invocations);
        let len = self.text.len_bytes();
        let (margin, max_width) = self.policy.budgets();
        let pixels = self.policy.measures_pixels();

        let mut line_start = if is_line_start {
            start.min(len)
        } else {
            self.display_line_start(start)
        };
        let mut lines = 0;
        let mut col = 0usize;
        let mut width = 0u64;
        let mut p = line_start;

        while p < len {
            let ch = self.text.char_at(p);
            let next = self.text.next_char_boundary(p);

            if ch == '\n' {
                if p >= stop_at {
                    return LineCount {
                        stop_offset: stop_at,
                        lines_counted: lines,
                        last_line_start: line_start,
                        last_line_end: stop_at,
                        unterminated_tail: false,
                    };
                }
                lines += 1;
                if lines >= max_lines {
                    return LineCount {
                        stop_offset: p + 1,
                        lines_counted: lines,
                        last_line_start: p + 1,
                        last_line_end: p,
                        unterminated_tail: false,
                    };
                }
                line_start = p + 1;
                col = 0;
                width = 0;
                p = next;
                continue;
            }

            let glyphs = expand(ch, col, self.tab_distance);
            if pixels {
                width += self.glyph_px(p, glyphs);
            }
            col += glyphs.columns();

            if col > margin || width > max_width {
                let blank = self.last_blank(line_start, p);
                let new_line_start = match blank {
                    Some(b) => b + 1,
                    None if p > line_start => p,
                    // a lone character at the end of the text has nothing to
                    // push down, so it is not a break
                    None if next >= len => {
                        p = next;
                        continue;
                    }
                    // a lone character wider than the budget keeps its own line
                    None => next,
                };

                if p >= stop_at && stop_at < new_line_start {
                    return LineCount {
                        stop_offset: stop_at,
                        lines_counted: lines,
                        last_line_start: line_start,
                        last_line_end: stop_at,
                        unterminated_tail: false,
                    };
                }
                lines += 1;
                if lines >= max_lines {
                    return LineCount {
                        stop_offset: new_line_start,
                        lines_counted: lines,
                        last_line_start: line_start,
                        last_line_end: blank.unwrap_or(new_line_start),
                        unterminated_tail: false,
                    };
                }
                // measure the new line from its own start, so the carried
                // text wraps again if it still does not fit
                line_start = new_line_start;
                col = 0;
                width = 0;
                p = new_line_start;
                continue;
            }
            p = next;
        }

        LineCount {
            stop_offset: len,
            lines_counted: lines,
            last_line_start: line_start,
            last_line_end: len,
            unterminated_tail: line_start < len,
        }
    }

    /// Rightmost space or tab in `(line_start, p]`. A blank at the line start
    /// itself would produce an empty wrapped line and is not eligible.
    fn last_blank(&self, line_start: usize, p: usize) -> Option<usize> {
        let mut b = p;
        while b > line_start {
            // blanks are ASCII, so a byte scan cannot match inside a sequence
            let byte = self.text.byte_at(b);
            if byte == b' ' || byte == b'\t' {
                return Some(b);
            }
            b -= 1;
        }
        None
    }

    fn glyph_px(&self, offset: usize, glyphs: Glyphs) -> u64 {
        let tag = self.styles.style_of(offset + self.style_base);
        u64::from(glyph_width(self.styles, tag, glyphs))
    }

    /// Start of the display line containing `pos`.
    pub fn display_line_start(&self, pos: usize) -> usize {
        let logical = self.text.line_start(pos);
        if !self.policy.wraps() {
            return logical;
        }
        self.count(logical, true, pos, usize::MAX).last_line_start
    }

    /// Display line breaks in `[start, end)`.
    pub fn count_lines(&self, start: usize, end: usize, is_line_start: bool) -> usize {
        if !self.policy.wraps() {
            return self.text.count_lines(start, end);
        }
        self.count(start, is_line_start, end, usize::MAX)
            .lines_counted
    }

    /// Start of the display line `n` lines after the one containing `start`.
    pub fn skip_lines(&self, start: usize, n: usize, is_line_start: bool) -> usize {
        if !self.policy.wraps() {
            return self.text.skip_lines(start, n);
        }
        if n == 0 {
            return start;
        }
        self.count(start, is_line_start, self.text.len_bytes(), n)
            .stop_offset
    }

    /// Start of the display line `n` lines before the one containing `start`.
    pub fn rewind_lines(&self, start: usize, n: usize) -> usize {
        if !self.policy.wraps() {
            return self.text.rewind_lines(start, n);
        }
        let mut pos = start.min(self.text.len_bytes());
        let mut n = n;
        loop {
            let logical = self.text.line_start(pos);
            let above = self.count(logical, true, pos, usize::MAX).lines_counted;
            if above >= n {
                return self.skip_lines(logical, above - n, true);
            }
            // the newline before `logical` accounts for one more line
            n -= above + 1;
            if logical == 0 {
                trace!(target: "layout.counter", start, "rewind_hit_buffer_start");
                return 0;
            }
            pos = logical - 1;
        }
    }

    /// End of the display line starting at (or containing) `pos`: the offset
    /// past its last displayable character. A blank consumed as a wrap point
    /// is not displayable.
    pub fn line_end(&self, pos: usize, is_line_start: bool) -> usize {
        if !self.policy.wraps() {
            return self.text.line_end(pos);
        }
        let len = self.text.len_bytes();
        if pos >= len {
            return len;
        }
        self.count(pos, is_line_start, len, 1).last_line_end
    }

    /// `(line_end, next_line_start)` for the display line at `start`.
    pub fn find_line_end(&self, start: usize, is_line_start: bool) -> (usize, usize) {
        let len = self.text.len_bytes();
        if !self.policy.wraps() {
            let end = self.text.line_end(start);
            return (end, (end + 1).min(len));
        }
        let r = self.count(start, is_line_start, len, 1);
        (r.last_line_end, r.stop_offset)
    }

    /// Whether the character at `line_end` terminates its display line (a
    /// newline, or a blank used as a wrap point) rather than starting the
    /// next one. A trailing blank at the very end of the text is assumed not
    /// to be a wrap point.
    pub fn wrap_uses_character(&self, line_end: usize) -> bool {
        let len = self.text.len_bytes();
        if !self.policy.wraps() || line_end >= len {
            return true;
        }
        match self.text.byte_at(line_end) {
            b'\n' => true,
            b' ' | b'\t' => line_end + 1 != len,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{GlyphTable, Monospace};
    use core_text::ScratchText;

    fn columns(text: &str, margin: u32, f: impl FnOnce(&LineCounter<'_>)) {
        let metrics = LayoutMetrics::default();
        let styles = Monospace::new(1);
        let text = ScratchText::new(text);
        let counter =
            LineCounter::new(&text, &styles, WrapPolicy::FixedColumn(margin), 8, &metrics);
        f(&counter);
    }

    #[test]
    fn wraps_after_last_blank() {
        columns("aaaa bbbb cccc", 10, |c| {
            // "aaaa bbbb " fills the ten columns; "cccc" moves down
            let r = c.count(0, true, 14, usize::MAX);
            assert_eq!(r.lines_counted, 1);
            assert_eq!(r.last_line_start, 10);
            assert!(r.unterminated_tail);
            assert_eq!(c.skip_lines(0, 1, true), 10);
            assert_eq!(c.find_line_end(0, true), (9, 10));
        });
    }

    #[test]
    fn hard_wraps_without_blanks() {
        columns("abcdefghij", 4, |c| {
            assert_eq!(c.skip_lines(0, 1, true), 4);
            assert_eq!(c.skip_lines(0, 2, true), 8);
            assert_eq!(c.count_lines(0, 10, true), 2);
            assert_eq!(c.find_line_end(0, true), (4, 4));
        });
    }

    #[test]
    fn blank_at_line_start_is_not_a_wrap_point() {
        columns(" abcdef", 3, |c| {
            // the leading blank cannot end an empty line, so the run hard-wraps
            assert_eq!(c.skip_lines(0, 1, true), 3);
        });
    }

    #[test]
    fn newlines_reset_the_budget() {
        columns("abc\nabcdef", 4, |c| {
            assert_eq!(c.skip_lines(0, 1, true), 4);
            assert_eq!(c.skip_lines(0, 2, true), 8);
            assert_eq!(c.rewind_lines(10, 1), 4);
            assert_eq!(c.rewind_lines(10, 2), 0);
            assert_eq!(c.display_line_start(9), 8);
            assert_eq!(c.line_end(4, true), 8);
        });
    }

    #[test]
    fn stop_offset_inside_a_line_reports_its_start() {
        columns("aaaa bbbb cccc", 10, |c| {
            let r = c.count(0, true, 7, usize::MAX);
            assert_eq!(r.stop_offset, 7);
            assert_eq!(r.lines_counted, 0);
            assert_eq!(r.last_line_start, 0);
            let r = c.count(0, true, 12, usize::MAX);
            assert_eq!(r.lines_counted, 1);
            assert_eq!(r.last_line_start, 10);
            // not a line start: resolved to the display line first
            assert_eq!(c.count(12, false, 14, usize::MAX).lines_counted, 0);
            assert_eq!(c.display_line_start(12), 10);
        });
    }

    #[test]
    fn rescanning_is_idempotent() {
        columns("one two three four five six", 7, |c| {
            let a = c.count(0, true, 27, usize::MAX);
            let b = c.count(0, true, 27, usize::MAX);
            assert_eq!(a, b);
        });
    }

    #[test]
    fn wide_characters_count_two_columns() {
        columns("漢字漢字", 4, |c| {
            // two wide characters fill a line
            assert_eq!(c.skip_lines(0, 1, true), 6);
        });
    }

    #[test]
    fn pixel_budget_uses_style_widths() {
        let metrics = LayoutMetrics::default();
        let styles = GlyphTable::new(10).with_advance(0, 'i', 2);
        let text = ScratchText::new("iiiii mmmm");
        let counter = LineCounter::new(&text, &styles, WrapPolicy::PixelWidth(40), 8, &metrics);
        // "iiiii " is 20px, "mmmm" is 40px and fits exactly only on its own line
        assert_eq!(counter.skip_lines(0, 1, true), 6);
        assert_eq!(counter.count_lines(0, text.len_bytes(), true), 1);
        assert!(metrics.snapshot().counter_invocations >= 2);
    }

    #[test]
    fn carried_text_wraps_again_when_still_too_wide() {
        let metrics = LayoutMetrics::default();
        let styles = GlyphTable::new(3)
            .with_advance(0, ' ', 2)
            .with_advance(0, 'x', 11);
        let text = ScratchText::new("a  xx");
        let counter = LineCounter::new(&text, &styles, WrapPolicy::PixelWidth(18), 8, &metrics);
        // "a  x" is exactly 18px; the second x forces a break after the
        // blanks, and "xx" is 22px so it breaks once more
        let second = counter.skip_lines(0, 1, true);
        assert_eq!(second, 3);
        assert_eq!(counter.skip_lines(second, 1, true), 4);
        assert_eq!(counter.skip_lines(0, 2, true), 4);
        assert_eq!(counter.count_lines(0, text.len_bytes(), true), 2);
    }

    #[test]
    fn lone_wide_character_at_the_end_is_not_a_break() {
        columns("a\n\t", 3, |c| {
            assert_eq!(c.count_lines(0, 3, true), 1);
            assert_eq!(c.skip_lines(2, 1, true), 3);
        });
        columns("\tb", 3, |c| {
            // with text after it the tab keeps a line of its own
            assert_eq!(c.skip_lines(0, 1, true), 1);
            assert_eq!(c.count_lines(0, 2, true), 1);
        });
    }

    #[test]
    fn no_wrap_uses_logical_lines() {
        let metrics = LayoutMetrics::default();
        let styles = Monospace::default();
        let text = ScratchText::new("a very long line\nb");
        let counter = LineCounter::new(&text, &styles, WrapPolicy::NoWrap, 8, &metrics);
        assert_eq!(counter.skip_lines(0, 1, true), 17);
        assert_eq!(counter.find_line_end(0, true), (16, 17));
        assert_eq!(metrics.snapshot().counter_invocations, 0);
    }

    #[test]
    fn wrap_uses_character_distinguishes_blanks() {
        columns("aaaa bbbb", 5, |c| {
            assert!(c.wrap_uses_character(4));
            assert!(!c.wrap_uses_character(3));
            assert!(c.wrap_uses_character(9));
        });
    }
}
