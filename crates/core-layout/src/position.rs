//! Offset and pixel conversion within the viewport.

use core_text::{Glyphs, TextSource, expand};

use crate::engine::LayoutEngine;
use crate::style::{StyleResolver, glyph_width};

/// How a pixel that falls inside a character is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Nearest gap between characters: past the middle of a character goes
    /// to the next offset.
    Cursor,
    /// The character under the pixel.
    Character,
}

/// Position relative to the top-left corner of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelPos {
    pub x: i64,
    pub y: i64,
}

/// Characters of `[start, end)` with their offsets and tab-expanded glyphs.
fn glyph_run<'a>(
    text: &'a dyn TextSource,
    tab_distance: usize,
    start: usize,
    end: usize,
) -> impl Iterator<Item = (usize, Glyphs)> + 'a {
    let mut p = start;
    let mut col = 0;
    std::iter::from_fn(move || {
        if p >= end {
            return None;
        }
        let at = p;
        let glyphs = expand(text.char_at(at), col, tab_distance);
        col += glyphs.columns();
        p = text.next_char_boundary(at);
        Some((at, glyphs))
    })
}

impl LayoutEngine {
    /// Displayable length in bytes of viewport row `row`: no newline and no
    /// blank that was used as a wrap point.
    pub fn line_length(&self, text: &dyn TextSource, styles: &dyn StyleResolver, row: usize) -> usize {
        let Some(start) = self.starts.get(row) else {
            return 0;
        };
        match self.starts.get(row + 1) {
            Some(next) if next > start => {
                if self.counter(text, styles).wrap_uses_character(next - 1) {
                    next - 1 - start
                } else {
                    next - start
                }
            }
            Some(_) => 0,
            None => self.last_visible.saturating_sub(start),
        }
    }

    /// Buffer offset at viewport pixel `(x, y)`.
    ///
    /// Above the viewport resolves to the first visible character; below the
    /// end of the text resolves to the end of the text.
    pub fn pixel_to_offset(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        x: i64,
        y: i64,
        rounding: Rounding,
    ) -> usize {
        if y < 0 {
            return self.first_visible;
        }
        let row = usize::try_from(y / i64::from(self.line_height))
            .unwrap_or(usize::MAX)
            .min(self.starts.len() - 1);
        let Some(start) = self.starts.get(row) else {
            return text.len_bytes();
        };
        let end = start + self.line_length(text, styles, row);

        let mut left = -i64::from(self.h_offset);
        let mut last_char = start;
        for (at, glyphs) in glyph_run(text, self.tab_distance, start, end) {
            let width = i64::from(glyph_width(styles, styles.style_of(at), glyphs));
            let reach = match rounding {
                Rounding::Cursor => width / 2,
                Rounding::Character => width,
            };
            if x < left + reach {
                return at;
            }
            left += width;
            last_char = at;
        }

        // a hard-wrapped row has no terminator to land on, so the character
        // under a pixel past its end is its last character
        if rounding == Rounding::Character && end > start && self.starts.get(row + 1) == Some(end) {
            return last_char;
        }
        end
    }

    /// Viewport pixel of the left edge of the character at `offset`, after
    /// clamping the offset to the visible range.
    pub fn offset_to_pixel(
        &self,
        text: &dyn TextSource,
        styles: &dyn StyleResolver,
        offset: usize,
    ) -> PixelPos {
        let len = text.len_bytes();
        let mut pos = self.clamp_offset(text, offset);
        if pos < self.first_visible {
            pos = self.first_visible;
        } else if pos > self.last_visible && !self.starts.has_ghost_rows() {
            pos = self.last_visible;
        }
        let row = self.row_of(pos, len).unwrap_or(0);
        let y = row as i64 * i64::from(self.line_height);
        let mut x = -i64::from(self.h_offset);
        let Some(start) = self.starts.get(row) else {
            return PixelPos { x, y };
        };
        let end = (start + self.line_length(text, styles, row)).min(pos);
        for (at, glyphs) in glyph_run(text, self.tab_distance, start, end) {
            x += i64::from(glyph_width(styles, styles.style_of(at), glyphs));
        }
        PixelPos { x, y }
    }

    /// Rendered width in pixels of viewport row `row`.
    pub fn visible_line_width(&self, text: &dyn TextSource, styles: &dyn StyleResolver, row: usize) -> u32 {
        let Some(start) = self.starts.get(row) else {
            return 0;
        };
        let end = start + self.line_length(text, styles, row);
        glyph_run(text, self.tab_distance, start, end)
            .map(|(at, glyphs)| glyph_width(styles, styles.style_of(at), glyphs))
            .fold(0u32, u32::saturating_add)
    }

    /// Widest row in the viewport, used to bound horizontal scrolling.
    pub fn longest_visible_line(&self, text: &dyn TextSource, styles: &dyn StyleResolver) -> u32 {
        (0..self.starts.len())
            .map(|row| self.visible_line_width(text, styles, row))
            .max()
            .unwrap_or(0)
    }
}
