//! Read-only text access shared by the buffer and scratch copies.
//!
//! All offsets are UTF-8 byte offsets. Logical line helpers only look for
//! `'\n'`, which is a single byte in UTF-8, so they can scan bytes without
//! decoding. Callers that step through characters use
//! [`TextSource::next_char_boundary`] so multi-byte sequences are consumed as
//! one unit.

/// Length of the UTF-8 sequence introduced by `lead`. Continuation bytes
/// report 1 so a scan that lands mid-sequence still makes progress.
#[inline]
pub fn utf8_seq_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xFF => 4,
        _ => 1,
    }
}

#[inline]
pub fn is_continuation(byte: u8) -> bool {
    (byte & 0xC0) == 0x80
}

pub trait TextSource {
    /// Total length in bytes.
    fn len_bytes(&self) -> usize;

    /// Raw byte at `offset` (`offset < len_bytes()`).
    fn byte_at(&self, offset: usize) -> u8;

    /// Character starting at `offset` (`offset` on a char boundary, `< len_bytes()`).
    fn char_at(&self, offset: usize) -> char;

    /// Owned copy of `[start, end)`, clamped to the text.
    fn text_range(&self, start: usize, end: usize) -> String;

    fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    /// Offset of the character following the one at `offset`.
    fn next_char_boundary(&self, offset: usize) -> usize {
        let len = self.len_bytes();
        if offset >= len {
            return len;
        }
        (offset + utf8_seq_len(self.byte_at(offset))).min(len)
    }

    /// Offset of the character preceding `offset` (0 stays 0).
    fn prev_char_boundary(&self, offset: usize) -> usize {
        let mut pos = offset.min(self.len_bytes());
        if pos == 0 {
            return 0;
        }
        pos -= 1;
        while pos > 0 && is_continuation(self.byte_at(pos)) {
            pos -= 1;
        }
        pos
    }

    /// Snap `offset` down to a char boundary inside `[0, len]`.
    fn snap_char_boundary(&self, offset: usize) -> usize {
        let len = self.len_bytes();
        if offset >= len {
            return len;
        }
        let mut pos = offset;
        while pos > 0 && is_continuation(self.byte_at(pos)) {
            pos -= 1;
        }
        pos
    }

    /// Start of the logical line containing `pos`.
    fn line_start(&self, pos: usize) -> usize {
        let mut p = pos.min(self.len_bytes());
        while p > 0 {
            if self.byte_at(p - 1) == b'\n' {
                return p;
            }
            p -= 1;
        }
        0
    }

    /// Offset of the newline ending the logical line containing `pos`, or the
    /// text length for the last line.
    fn line_end(&self, pos: usize) -> usize {
        let len = self.len_bytes();
        let mut p = pos.min(len);
        while p < len {
            if self.byte_at(p) == b'\n' {
                return p;
            }
            p += 1;
        }
        len
    }

    /// Number of newlines in `[start, end)`.
    fn count_lines(&self, start: usize, end: usize) -> usize {
        let end = end.min(self.len_bytes());
        (start..end).filter(|&p| self.byte_at(p) == b'\n').count()
    }

    /// Start of the logical line `n` lines after the one containing `start`.
    /// Stops at the text length when the text runs out first.
    fn skip_lines(&self, start: usize, n: usize) -> usize {
        if n == 0 {
            return start;
        }
        let len = self.len_bytes();
        let mut seen = 0;
        let mut p = start;
        while p < len {
            let byte = self.byte_at(p);
            p += 1;
            if byte == b'\n' {
                seen += 1;
                if seen == n {
                    return p;
                }
            }
        }
        len
    }

    /// Start of the logical line `n` lines before the one containing `start`.
    /// A newline at `start - 1` is not counted; `n == 0` returns the start of
    /// the current line.
    fn rewind_lines(&self, start: usize, n: usize) -> usize {
        if start == 0 {
            return 0;
        }
        let mut seen = 0;
        let mut p = start.min(self.len_bytes()) - 1;
        loop {
            if self.byte_at(p) == b'\n' {
                if seen == n {
                    return p + 1;
                }
                seen += 1;
            }
            if p == 0 {
                return 0;
            }
            p -= 1;
        }
    }
}

impl TextSource for str {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn byte_at(&self, offset: usize) -> u8 {
        self.as_bytes()[offset]
    }

    fn char_at(&self, offset: usize) -> char {
        self[offset..].chars().next().unwrap_or('\0')
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len());
        let start = start.min(end);
        self.get(start..end).map(str::to_owned).unwrap_or_default()
    }
}
