//! Display expansion of single characters.
//!
//! A buffer character is shown either as itself, as a run of spaces (tab to
//! the next tab stop), or as a two-glyph caret sequence (`^A`, `^?`) for
//! control characters. Column counts feed fixed-column wrapping; the
//! expansion itself feeds pixel measurement, which must agree with it.
//!
//! Newlines are never measured: line counting closes the line first.

use unicode_width::UnicodeWidthChar;

use crate::source::TextSource;

/// Displayed form of one buffer character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyphs {
    /// Shown as itself, occupying `columns` cells (0 for combining marks, 2 for wide CJK).
    Char { ch: char, columns: usize },
    /// Tab expanded to this many spaces.
    Spaces(usize),
    /// Control character shown as `^` followed by this letter.
    Caret(char),
}

impl Glyphs {
    pub fn columns(&self) -> usize {
        match *self {
            Glyphs::Char { columns, .. } => columns,
            Glyphs::Spaces(n) => n,
            Glyphs::Caret(_) => 2,
        }
    }
}

/// Expand `ch` displayed at column `indent`.
pub fn expand(ch: char, indent: usize, tab_distance: usize) -> Glyphs {
    if ch == '\t' {
        let tab = tab_distance.max(1);
        return Glyphs::Spaces(tab - (indent % tab));
    }
    if (ch as u32) < 0x20 || ch == '\u{7f}' {
        return Glyphs::Caret(char::from((ch as u8) ^ 0x40));
    }
    Glyphs::Char {
        ch,
        columns: ch.width().unwrap_or(0),
    }
}

/// Columns occupied by `ch` displayed at column `indent`.
#[inline]
pub fn char_columns(ch: char, indent: usize, tab_distance: usize) -> usize {
    expand(ch, indent, tab_distance).columns()
}

/// Columns occupied by `[line_start, target)`; `line_start` must begin a
/// display line so tab stops line up.
pub fn displayed_columns<T: TextSource + ?Sized>(
    text: &T,
    line_start: usize,
    target: usize,
    tab_distance: usize,
) -> usize {
    let end = target.min(text.len_bytes());
    let mut col = 0;
    let mut pos = line_start;
    while pos < end {
        col += char_columns(text.char_at(pos), col, tab_distance);
        pos = text.next_char_boundary(pos);
    }
    col
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_advance_to_next_stop() {
        assert_eq!(expand('\t', 0, 8), Glyphs::Spaces(8));
        assert_eq!(expand('\t', 3, 8), Glyphs::Spaces(5));
        assert_eq!(expand('\t', 8, 4), Glyphs::Spaces(4));
        // a zero tab distance behaves like 1
        assert_eq!(expand('\t', 5, 0), Glyphs::Spaces(1));
    }

    #[test]
    fn control_characters_use_caret_notation() {
        assert_eq!(expand('\u{1}', 0, 8), Glyphs::Caret('A'));
        assert_eq!(expand('\u{7f}', 0, 8), Glyphs::Caret('?'));
        assert_eq!(char_columns('\u{1b}', 0, 8), 2);
    }

    #[test]
    fn wide_and_combining_columns() {
        assert_eq!(char_columns('a', 0, 8), 1);
        assert_eq!(char_columns('漢', 0, 8), 2);
        assert_eq!(char_columns('\u{301}', 0, 8), 0);
    }

    #[test]
    fn displayed_columns_counts_from_line_start() {
        let s = "ab\tc漢";
        assert_eq!(displayed_columns(s, 0, 2, 4), 2);
        assert_eq!(displayed_columns(s, 0, 3, 4), 4);
        assert_eq!(displayed_columns(s, 0, s.len(), 4), 7);
    }
}
