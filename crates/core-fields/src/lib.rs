//! Template field navigation.
//!
//! Pure functions over buffer text. Fields are bracket-delimited slots
//! (`[___]`, `[]`, `[size]`) derived fresh on every call; edits invalidate
//! offsets so nothing is cached. Offsets are characters, `end` is exclusive
//! (one past the closing bracket).

use core_text::{Selection, TextHost};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::trace;

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").expect("field pattern is static and valid"));

/// A bracketed field in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderField {
    pub start: usize,
    pub end: usize,
}

impl PlaceholderField {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Selection spanning the whole field so the next keystroke replaces it.
    pub fn selection(&self) -> Selection {
        Selection::new(self.start, self.end)
    }
}

/// Every non-overlapping bracket span in left-to-right order. Nested
/// brackets resolve to the innermost pair.
pub fn find_fields(text: &str) -> Vec<PlaceholderField> {
    let mut out = Vec::new();
    let mut chars_before = 0usize;
    let mut byte_cursor = 0usize;
    for m in FIELD.find_iter(text) {
        chars_before += text[byte_cursor..m.start()].chars().count();
        let len = m.as_str().chars().count();
        out.push(PlaceholderField {
            start: chars_before,
            end: chars_before + len,
        });
        chars_before += len;
        byte_cursor = m.end();
    }
    out
}

/// First field starting at or after `from`, wrapping to the first field.
pub fn next_field(text: &str, from: usize) -> Option<PlaceholderField> {
    let fields = find_fields(text);
    fields
        .iter()
        .find(|f| f.start >= from)
        .or_else(|| fields.first())
        .copied()
}

/// Last field starting more than one character before `from`, wrapping to
/// the last field. The one-character slack keeps a caret sitting just inside
/// a field from selecting that same field again.
pub fn prev_field(text: &str, from: usize) -> Option<PlaceholderField> {
    let fields = find_fields(text);
    fields
        .iter()
        .rev()
        .find(|f| f.start + 1 < from)
        .or_else(|| fields.last())
        .copied()
}

/// True when `offset` lies inside a bracket pair: scanning backward reaches
/// `[` before any `]`, and scanning forward reaches `]` before any `[`.
pub fn is_inside_field(text: &str, offset: usize) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let offset = offset.min(chars.len());
    let opened = chars[..offset]
        .iter()
        .rev()
        .find(|c| **c == '[' || **c == ']')
        .is_some_and(|c| *c == '[');
    if !opened {
        return false;
    }
    chars[offset..]
        .iter()
        .find(|c| **c == '[' || **c == ']')
        .is_some_and(|c| *c == ']')
}

/// 1-based index of the field containing `offset` or, failing that, the
/// nearest following one. `None` when no such field exists.
pub fn field_index_at(text: &str, offset: usize) -> Option<usize> {
    find_fields(text)
        .iter()
        .position(|f| f.end > offset)
        .map(|i| i + 1)
}

/// Progress indicator for the footer (`2 / 5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldProgress {
    pub index: usize,
    pub total: usize,
}

impl fmt::Display for FieldProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.index, self.total)
    }
}

pub fn progress(text: &str, offset: usize) -> Option<FieldProgress> {
    let total = find_fields(text).len();
    field_index_at(text, offset).map(|index| FieldProgress { index, total })
}

/// Direction for [`select_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Find the next/previous field relative to the caret and select it on the
/// host. Returns the selected field; the caller resets its auto-advance
/// anchor to `field.start`.
pub fn select_field<H: TextHost + ?Sized>(host: &mut H, direction: Direction) -> Option<PlaceholderField> {
    let text = host.text();
    let caret = host.caret();
    let found = match direction {
        Direction::Next => next_field(&text, caret),
        Direction::Prev => prev_field(&text, host.selection().start),
    }?;
    host.set_selection(found.selection());
    trace!(target: "fields", ?direction, start = found.start, end = found.end, "field_selected");
    Some(found)
}
