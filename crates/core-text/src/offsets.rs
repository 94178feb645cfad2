//! Character offset helpers over plain `&str`.
//!
//! Pure functions, no buffer state. Offsets past the end clamp to the end.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `char_idx`-th character (clamped to `text.len()`).
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Character index of a byte offset. `byte` must sit on a char boundary.
pub fn byte_to_char(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    text[..byte].chars().count()
}

/// Slice by character range `[start, end)` (clamped).
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let s = char_to_byte(text, start);
    let e = char_to_byte(text, end.max(start));
    &text[s..e]
}

/// One line of the buffer in character offsets. `end` excludes the newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// All lines of `text`. A trailing newline yields an empty final line, so
/// the result is never empty.
pub fn line_spans(text: &str) -> Vec<LineSpan> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut pos = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            out.push(LineSpan {
                index: out.len(),
                start,
                end: pos,
            });
            start = pos + 1;
        }
        pos += 1;
    }
    out.push(LineSpan {
        index: out.len(),
        start,
        end: pos,
    });
    out
}

/// Line containing `offset` (offsets past the end map to the last line).
pub fn line_at(text: &str, offset: usize) -> LineSpan {
    let spans = line_spans(text);
    let last = spans[spans.len() - 1];
    spans
        .into_iter()
        .find(|l| offset <= l.end)
        .unwrap_or(last)
}
