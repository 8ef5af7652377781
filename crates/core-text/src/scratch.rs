//! Owned text used to re-measure a region as it looked before an edit.

use crate::source::TextSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScratchText {
    text: String,
}

impl ScratchText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Rebuild the pre-edit form of `[from, to)` of `source`: the unchanged
    /// prefix `[from, pos)`, the `deleted` text, then the unchanged suffix
    /// `[resume, to)` where `resume` is the first offset after the inserted
    /// text.
    pub fn splice<T: TextSource + ?Sized>(
        source: &T,
        from: usize,
        pos: usize,
        deleted: &str,
        resume: usize,
        to: usize,
    ) -> Self {
        let mut text = source.text_range(from, pos);
        text.push_str(deleted);
        if resume < to {
            text.push_str(&source.text_range(resume, to));
        }
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl TextSource for ScratchText {
    fn len_bytes(&self) -> usize {
        self.text.len()
    }

    fn byte_at(&self, offset: usize) -> u8 {
        self.text.as_str().byte_at(offset)
    }

    fn char_at(&self, offset: usize) -> char {
        self.text.as_str().char_at(offset)
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        self.text.as_str().text_range(start, end)
    }
}
