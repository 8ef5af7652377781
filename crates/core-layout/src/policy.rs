//! Wrap policy selection.
//!
//! [`WrapMode`] is what the user asks for; [`WrapPolicy`] is what the counter
//! runs. Wrapping at the viewport edge becomes a column budget when the style
//! resolver reports a uniform cell width and a pixel budget otherwise.

use crate::style::StyleResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    NoWrap,
    /// Wrap after this many display columns.
    AtColumn(u32),
    /// Wrap at the right edge of the viewport.
    AtBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapPolicy {
    NoWrap,
    FixedColumn(u32),
    PixelWidth(u32),
}

impl WrapPolicy {
    pub fn resolve(mode: WrapMode, viewport_width: u32, styles: &dyn StyleResolver) -> Self {
        match mode {
            WrapMode::NoWrap => WrapPolicy::NoWrap,
            WrapMode::AtColumn(margin) => WrapPolicy::FixedColumn(margin.max(1)),
            WrapMode::AtBounds => match styles.uniform_width() {
                Some(cell) if cell > 0 => WrapPolicy::FixedColumn((viewport_width / cell).max(1)),
                _ => WrapPolicy::PixelWidth(viewport_width),
            },
        }
    }

    pub fn wraps(&self) -> bool {
        !matches!(self, WrapPolicy::NoWrap)
    }

    /// Deleted text must be measured before the edit lands.
    pub fn measures_pixels(&self) -> bool {
        matches!(self, WrapPolicy::PixelWidth(_))
    }

    /// `(column budget, pixel budget)`; unused budgets are unbounded.
    pub(crate) fn budgets(&self) -> (usize, u64) {
        match *self {
            WrapPolicy::NoWrap => (usize::MAX, u64::MAX),
            WrapPolicy::FixedColumn(margin) => (margin as usize, u64::MAX),
            WrapPolicy::PixelWidth(width) => (usize::MAX, u64::from(width)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{GlyphTable, Monospace};

    #[test]
    fn bounds_with_uniform_font_counts_columns() {
        let p = WrapPolicy::resolve(WrapMode::AtBounds, 800, &Monospace::new(10));
        assert_eq!(p, WrapPolicy::FixedColumn(80));
    }

    #[test]
    fn bounds_with_proportional_font_counts_pixels() {
        let p = WrapPolicy::resolve(WrapMode::AtBounds, 300, &GlyphTable::new(7));
        assert_eq!(p, WrapPolicy::PixelWidth(300));
        assert!(p.measures_pixels());
    }

    #[test]
    fn column_margin_never_zero() {
        let p = WrapPolicy::resolve(WrapMode::AtColumn(0), 300, &Monospace::default());
        assert_eq!(p, WrapPolicy::FixedColumn(1));
        assert!(!WrapPolicy::NoWrap.wraps());
    }
}
