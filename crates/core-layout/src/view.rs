//! A buffer, its styles and its layout kept in step.
//!
//! [`TextView`] routes every buffer edit through the engine's change hooks so
//! callers cannot forget one. It is the surface the binary drives.

use core_text::{Buffer, BufferChange, BufferObserver, NoopObserver, TextSource};

use crate::engine::{LayoutEngine, LayoutOptions, ViewportState};
use crate::policy::WrapMode;
use crate::position::{PixelPos, Rounding};
use crate::reconcile::Reconciled;
use crate::style::StyleResolver;

/// Forwards buffer notifications to the engine.
struct EngineHooks<'a> {
    engine: &'a mut LayoutEngine,
    styles: &'a dyn StyleResolver,
    reconciled: Option<Reconciled>,
}

impl BufferObserver for EngineHooks<'_> {
    fn on_pre_delete(&mut self, text: &Buffer, pos: usize, deleted: usize) {
        self.engine.on_pre_delete(text, self.styles, pos, deleted);
    }

    fn on_modified(&mut self, text: &Buffer, change: &BufferChange<'_>) {
        self.reconciled = self.engine.on_modified(text, self.styles, change);
    }
}

pub struct TextView {
    buffer: Buffer,
    styles: Box<dyn StyleResolver>,
    engine: LayoutEngine,
}

impl TextView {
    pub fn new(buffer: Buffer, styles: Box<dyn StyleResolver>, options: LayoutOptions) -> Self {
        let engine = LayoutEngine::new(options, &buffer, styles.as_ref());
        Self {
            buffer,
            styles,
            engine,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn styles(&self) -> &dyn StyleResolver {
        self.styles.as_ref()
    }

    pub fn viewport(&self) -> ViewportState {
        self.engine.viewport()
    }

    pub fn insert(&mut self, pos: usize, text: &str) -> Option<Reconciled> {
        let mut hooks = EngineHooks {
            engine: &mut self.engine,
            styles: self.styles.as_ref(),
            reconciled: None,
        };
        self.buffer.insert(pos, text, &mut hooks);
        hooks.reconciled
    }

    pub fn remove(&mut self, start: usize, end: usize) -> Option<Reconciled> {
        let mut hooks = EngineHooks {
            engine: &mut self.engine,
            styles: self.styles.as_ref(),
            reconciled: None,
        };
        self.buffer.remove(start, end, &mut hooks);
        hooks.reconciled
    }

    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Option<Reconciled> {
        let mut hooks = EngineHooks {
            engine: &mut self.engine,
            styles: self.styles.as_ref(),
            reconciled: None,
        };
        self.buffer.replace(start, end, text, &mut hooks);
        hooks.reconciled
    }

    /// Report a style change over `[pos, pos + len)`.
    pub fn restyle(&mut self, pos: usize, len: usize) {
        let mut hooks = EngineHooks {
            engine: &mut self.engine,
            styles: self.styles.as_ref(),
            reconciled: None,
        };
        self.buffer.restyle(pos, len, &mut hooks);
    }

    /// Replace the whole text and lay it out from the top.
    pub fn set_text(&mut self, text: &str) {
        self.buffer.set_text(text, &mut NoopObserver);
        self.engine.attach(&self.buffer, self.styles.as_ref());
    }

    /// Swap in new styles. Widths may have changed everywhere, so the whole
    /// text is re-wrapped.
    pub fn set_styles(&mut self, styles: Box<dyn StyleResolver>) {
        self.styles = styles;
        self.engine.relayout(&self.buffer, self.styles.as_ref());
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        self.engine
            .set_wrap_mode(&self.buffer, self.styles.as_ref(), mode);
    }

    pub fn set_tab_distance(&mut self, tab_distance: usize) {
        self.engine
            .set_tab_distance(&self.buffer, self.styles.as_ref(), tab_distance);
    }

    pub fn set_line_height(&mut self, line_height: u32) -> ViewportState {
        self.engine
            .set_line_height(&self.buffer, self.styles.as_ref(), line_height)
    }

    pub fn maintain_absolute_top_line(&mut self, on: bool) {
        self.engine.maintain_absolute_top_line(&self.buffer, on);
    }

    pub fn scroll_to(&mut self, top_line: usize, h_offset: u32) -> ViewportState {
        self.engine
            .scroll_to(&self.buffer, self.styles.as_ref(), top_line, h_offset)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> ViewportState {
        self.engine
            .resize(&self.buffer, self.styles.as_ref(), width, height)
    }

    pub fn show_position(&mut self, pos: usize) -> ViewportState {
        self.engine
            .show_position(&self.buffer, self.styles.as_ref(), pos)
    }

    pub fn pixel_to_offset(&self, x: i64, y: i64, rounding: Rounding) -> usize {
        self.engine
            .pixel_to_offset(&self.buffer, self.styles.as_ref(), x, y, rounding)
    }

    pub fn offset_to_pixel(&self, offset: usize) -> PixelPos {
        self.engine
            .offset_to_pixel(&self.buffer, self.styles.as_ref(), offset)
    }

    pub fn position_to_line_col(&self, pos: usize) -> Option<(usize, usize)> {
        self.engine.position_to_line_col(&self.buffer, pos)
    }

    /// Displayed text of each filled row, top to bottom.
    pub fn visible_lines(&self) -> Vec<String> {
        (0..self.engine.line_count())
            .map_while(|row| {
                let start = self.engine.line_start(row)?;
                let len = self
                    .engine
                    .line_length(&self.buffer, self.styles.as_ref(), row);
                Some(self.buffer.text_range(start, start + len))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::EditPlacement;
    use crate::style::{GlyphTable, Monospace};

    fn view(content: &str, wrap: WrapMode, rows: u32) -> TextView {
        let buffer = Buffer::from_str("view", content).unwrap();
        let options = LayoutOptions {
            wrap,
            tab_distance: 8,
            viewport_width: 10,
            viewport_height: rows,
            line_height: 1,
        };
        TextView::new(buffer, Box::new(Monospace::new(1)), options)
    }

    #[test]
    fn edits_keep_rows_in_step() {
        let mut v = view("one two three", WrapMode::AtBounds, 4);
        assert_eq!(v.visible_lines(), vec!["one two", "three"]);
        let r = v.insert(4, "big ").unwrap();
        assert_eq!(r.placement, EditPlacement::Interior { line: 0 });
        assert_eq!(v.visible_lines(), vec!["one big", "two three"]);
        v.remove(0, 8);
        assert_eq!(v.visible_lines(), vec!["two three"]);
    }

    #[test]
    fn set_text_starts_over() {
        let mut v = view("a\nb\nc\nd\ne\nf", WrapMode::NoWrap, 2);
        v.scroll_to(4, 0);
        assert_eq!(v.viewport().top_line, 4);
        v.set_text("x\ny");
        assert_eq!(v.viewport().top_line, 1);
        assert_eq!(v.visible_lines(), vec!["x", "y"]);
    }

    #[test]
    fn wider_glyphs_rewrap_everything() {
        let mut v = view("one two three", WrapMode::AtBounds, 4);
        v.set_styles(Box::new(GlyphTable::new(2)));
        assert_eq!(v.visible_lines(), vec!["one", "two", "three"]);
        assert_eq!(v.engine().buffer_line_count(), 3);
    }

    #[test]
    fn restyle_leaves_layout_alone() {
        let mut v = view("abc", WrapMode::NoWrap, 2);
        let before = v.engine().line_starts().to_vec();
        v.restyle(0, 3);
        assert_eq!(v.engine().line_starts(), before.as_slice());
    }
}
