//! Style lookup and glyph measurement.
//!
//! The engine never measures text itself. It asks a [`StyleResolver`] for the
//! style tag at a buffer offset and for the advance of a character in that
//! style. Expanded glyphs (tab runs, caret sequences) are measured as the sum
//! of their parts so wrapping and hit testing agree on every width.

use std::collections::HashMap;

use core_text::{Glyphs, char_columns};

pub type StyleTag = u8;

pub const DEFAULT_STYLE: StyleTag = 0;

pub trait StyleResolver {
    /// Style in effect at `offset`.
    fn style_of(&self, offset: usize) -> StyleTag;

    /// Rendered advance of `ch` in style `tag`, in pixels.
    fn width_of(&self, tag: StyleTag, ch: char) -> u32;

    /// Width of one display column when every style measures every character
    /// as a whole number of equal cells. Enables column-based wrapping.
    fn uniform_width(&self) -> Option<u32> {
        None
    }
}

/// Pixel width of an expanded character.
pub fn glyph_width(styles: &dyn StyleResolver, tag: StyleTag, glyphs: Glyphs) -> u32 {
    match glyphs {
        Glyphs::Char { ch, .. } => styles.width_of(tag, ch),
        Glyphs::Spaces(n) => {
            let n = u32::try_from(n).unwrap_or(u32::MAX);
            styles.width_of(tag, ' ').saturating_mul(n)
        }
        Glyphs::Caret(letter) => styles
            .width_of(tag, '^')
            .saturating_add(styles.width_of(tag, letter)),
    }
}

/// Fixed-cell font: every column is `cell_width` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monospace {
    cell_width: u32,
}

impl Monospace {
    pub fn new(cell_width: u32) -> Self {
        Self {
            cell_width: cell_width.max(1),
        }
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }
}

impl Default for Monospace {
    fn default() -> Self {
        Self::new(8)
    }
}

impl StyleResolver for Monospace {
    fn style_of(&self, _offset: usize) -> StyleTag {
        DEFAULT_STYLE
    }

    fn width_of(&self, _tag: StyleTag, ch: char) -> u32 {
        let columns = u32::try_from(char_columns(ch, 0, 1)).unwrap_or(0);
        self.cell_width.saturating_mul(columns)
    }

    fn uniform_width(&self) -> Option<u32> {
        Some(self.cell_width)
    }
}

/// Run of offsets sharing one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    pub start: usize,
    pub end: usize,
    pub tag: StyleTag,
}

/// Proportional font table: per-style default advance plus per-character
/// overrides, with optional style runs over buffer offsets.
///
/// Runs are positional; keeping them in step with edits is the caller's job,
/// the same way a separate style buffer would be.
#[derive(Debug, Clone, Default)]
pub struct GlyphTable {
    advances: Vec<u32>,
    overrides: HashMap<(StyleTag, char), u32>,
    runs: Vec<StyleRun>,
}

impl GlyphTable {
    /// Table with a single style whose characters default to `advance`.
    pub fn new(advance: u32) -> Self {
        Self {
            advances: vec![advance],
            ..Self::default()
        }
    }

    /// Register a style with default `advance`. Returns its tag.
    pub fn add_style(&mut self, advance: u32) -> StyleTag {
        self.advances.push(advance);
        StyleTag::try_from(self.advances.len() - 1).unwrap_or(StyleTag::MAX)
    }

    pub fn with_advance(mut self, tag: StyleTag, ch: char, advance: u32) -> Self {
        self.set_advance(tag, ch, advance);
        self
    }

    pub fn set_advance(&mut self, tag: StyleTag, ch: char, advance: u32) {
        self.overrides.insert((tag, ch), advance);
    }

    /// Apply `tag` to `[start, end)`, dropping any run it overlaps.
    pub fn set_run(&mut self, start: usize, end: usize, tag: StyleTag) {
        self.runs.retain(|r| r.end <= start || r.start >= end);
        self.runs.push(StyleRun { start, end, tag });
        self.runs.sort_by_key(|r| r.start);
    }

    fn default_advance(&self, tag: StyleTag) -> u32 {
        let idx = usize::from(tag).min(self.advances.len().saturating_sub(1));
        self.advances.get(idx).copied().unwrap_or(0)
    }
}

impl StyleResolver for GlyphTable {
    fn style_of(&self, offset: usize) -> StyleTag {
        let idx = self.runs.partition_point(|r| r.start <= offset);
        match idx.checked_sub(1).map(|i| self.runs[i]) {
            Some(run) if offset < run.end => run.tag,
            _ => DEFAULT_STYLE,
        }
    }

    fn width_of(&self, tag: StyleTag, ch: char) -> u32 {
        if let Some(advance) = self.overrides.get(&(tag, ch)) {
            return *advance;
        }
        let columns = u32::try_from(char_columns(ch, 0, 1)).unwrap_or(0);
        self.default_advance(tag).saturating_mul(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_scales_by_columns() {
        let m = Monospace::new(7);
        assert_eq!(m.width_of(0, 'a'), 7);
        assert_eq!(m.width_of(0, '漢'), 14);
        assert_eq!(m.width_of(0, '\u{301}'), 0);
        assert_eq!(m.uniform_width(), Some(7));
    }

    #[test]
    fn expanded_glyphs_sum_their_parts() {
        let m = Monospace::new(5);
        assert_eq!(glyph_width(&m, 0, Glyphs::Spaces(3)), 15);
        assert_eq!(glyph_width(&m, 0, Glyphs::Caret('A')), 10);
    }

    #[test]
    fn glyph_table_overrides_and_runs() {
        let mut t = GlyphTable::new(6).with_advance(0, 'i', 2);
        let bold = t.add_style(9);
        t.set_run(10, 20, bold);
        assert_eq!(t.width_of(0, 'i'), 2);
        assert_eq!(t.width_of(0, 'm'), 6);
        assert_eq!(t.width_of(bold, 'm'), 9);
        assert_eq!(t.style_of(9), DEFAULT_STYLE);
        assert_eq!(t.style_of(10), bold);
        assert_eq!(t.style_of(19), bold);
        assert_eq!(t.style_of(20), DEFAULT_STYLE);
        assert_eq!(t.uniform_width(), None);
    }

    #[test]
    fn new_run_drops_overlapping_runs() {
        let mut t = GlyphTable::new(4);
        let a = t.add_style(5);
        let b = t.add_style(6);
        t.set_run(0, 10, a);
        t.set_run(5, 8, b);
        assert_eq!(t.style_of(2), DEFAULT_STYLE);
        assert_eq!(t.style_of(6), b);
    }
}
