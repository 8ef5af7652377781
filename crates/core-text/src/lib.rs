//! Rope-based text store with change notification.
//!
//! Offsets are UTF-8 byte offsets. Every mutation reports itself to a
//! [`BufferObserver`] twice: `on_pre_delete` before the rope changes (the
//! doomed text is still readable; pure inserts report zero deleted bytes)
//! and `on_modified` once the rope reflects the change. Observers receive the
//! buffer by shared reference so they can read the new contents.
//!
//! Edit positions are clamped to the buffer and snapped down to a char
//! boundary; an out-of-range request never panics.

use anyhow::Result;
use ropey::Rope;
use tracing::trace;

pub mod column;
pub mod scratch;
pub mod source;

pub use column::{Glyphs, char_columns, displayed_columns, expand};
pub use scratch::ScratchText;
pub use source::TextSource;

/// One completed modification, as reported after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferChange<'a> {
    pub pos: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub restyled: usize,
    pub deleted_text: &'a str,
}

/// Receiver of buffer change notifications.
pub trait BufferObserver {
    /// Called before `deleted` bytes starting at `pos` are removed.
    fn on_pre_delete(&mut self, _text: &Buffer, _pos: usize, _deleted: usize) {}

    /// Called after the buffer has been modified.
    fn on_modified(&mut self, text: &Buffer, change: &BufferChange<'_>);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BufferObserver for NoopObserver {
    fn on_modified(&mut self, _text: &Buffer, _change: &BufferChange<'_>) {}
}

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            rope: Rope::new(),
            name: name.into(),
        }
    }

    /// Number of logical lines (newline count + 1).
    pub fn line_count(&self) -> usize {
        self.count_lines(0, self.len_bytes()) + 1
    }

    /// Entire contents as an owned string.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: usize, text: &str, observer: &mut dyn BufferObserver) {
        let pos = self.clamp_edit_offset(pos);
        if text.is_empty() {
            return;
        }
        observer.on_pre_delete(self, pos, 0);
        self.rope.insert(self.rope.byte_to_char(pos), text);
        observer.on_modified(
            self,
            &BufferChange {
                pos,
                inserted: text.len(),
                deleted: 0,
                restyled: 0,
                deleted_text: "",
            },
        );
    }

    /// Remove `[start, end)`. Returns the removed text.
    pub fn remove(
        &mut self,
        start: usize,
        end: usize,
        observer: &mut dyn BufferObserver,
    ) -> String {
        self.replace(start, end, "", observer)
    }

    /// Replace `[start, end)` with `text`. Returns the removed text.
    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        observer: &mut dyn BufferObserver,
    ) -> String {
        let start = self.clamp_edit_offset(start);
        let end = self.clamp_edit_offset(end).max(start);
        if start == end && text.is_empty() {
            return String::new();
        }
        observer.on_pre_delete(self, start, end - start);
        let removed = self.delete_bytes(start, end);
        if !text.is_empty() {
            self.rope.insert(self.rope.byte_to_char(start), text);
        }
        observer.on_modified(
            self,
            &BufferChange {
                pos: start,
                inserted: text.len(),
                deleted: removed.len(),
                restyled: 0,
                deleted_text: &removed,
            },
        );
        removed
    }

    /// Replace the whole contents.
    pub fn set_text(&mut self, text: &str, observer: &mut dyn BufferObserver) -> String {
        let len = self.len_bytes();
        self.replace(0, len, text, observer)
    }

    /// Report `[pos, pos + len)` as restyled without changing any text.
    pub fn restyle(&self, pos: usize, len: usize, observer: &mut dyn BufferObserver) {
        let pos = self.clamp_edit_offset(pos);
        let len = len.min(self.len_bytes() - pos);
        observer.on_modified(
            self,
            &BufferChange {
                pos,
                inserted: 0,
                deleted: 0,
                restyled: len,
                deleted_text: "",
            },
        );
    }

    /// Return the UTF-8 slice in the absolute byte range `[start,end)`
    /// (clamped, snapped to char boundaries).
    pub fn slice_bytes(&self, start: usize, end: usize) -> String {
        let s = self.snap_char_boundary(start);
        let e = self.snap_char_boundary(end);
        if s >= e {
            return String::new();
        }
        // Translate byte offsets to char indices (rope.slice expects char range)
        let start_char = self.rope.byte_to_char(s);
        let end_char = self.rope.byte_to_char(e);
        self.rope.slice(start_char..end_char).to_string()
    }

    /// Delete the UTF-8 slice in absolute byte range `[start,end)` (clamped)
    /// without notifying anyone. Returns the removed text.
    fn delete_bytes(&mut self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        let start_char = self.rope.byte_to_char(start);
        let end_char = self.rope.byte_to_char(end);
        let removed = self.rope.slice(start_char..end_char).to_string();
        self.rope.remove(start_char..end_char);
        removed
    }

    fn clamp_edit_offset(&self, pos: usize) -> usize {
        let clamped = self.snap_char_boundary(pos);
        if clamped != pos {
            trace!(target: "text.buffer", requested = pos, clamped, "edit_offset_clamped");
        }
        clamped
    }
}

impl TextSource for Buffer {
    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn byte_at(&self, offset: usize) -> u8 {
        self.rope.byte(offset)
    }

    fn char_at(&self, offset: usize) -> char {
        self.rope.char(self.rope.byte_to_char(offset))
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        self.slice_bytes(start, end)
    }
}
