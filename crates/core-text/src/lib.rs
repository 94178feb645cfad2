//! Text buffer and host accessor contract for the dictation automaton.
//!
//! The automaton never owns the buffer it edits. Every component reads and
//! mutates text through [`TextHost`], an in-process accessor the host UI
//! implements (get/set text, get/set selection, focus). [`Buffer`] is the
//! reference in-memory host backed by a `ropey::Rope`; tests and the replay
//! binary drive sessions through it.
//!
//! Offsets: all positions exposed by this crate are *character* offsets into
//! the full buffer text (not bytes, not line/column pairs). Helpers in
//! [`offsets`] translate to byte indices for `&str` slicing and compute line
//! geometry for the line-oriented label grammar.

use ropey::Rope;

pub mod echo;
pub mod offsets;

pub use echo::{EchoGuard, content_hash};
pub use offsets::{LineSpan, byte_to_char, char_len, char_to_byte, line_at, line_spans, slice_chars};

/// Active selection. A caret is a selection with `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Construct a selection normalizing ordering so that `start <= end`.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.is_caret()
    }
}

/// Accessor the host UI exposes to the automaton.
///
/// Contract:
/// * Mutations performed through this trait are programmatic. Hosts that echo
///   them back as mutation notifications are tolerated (see [`EchoGuard`]).
/// * Offsets are characters. Implementations clamp out-of-range selections.
pub trait TextHost {
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str);
    fn selection(&self) -> Selection;
    fn set_selection(&mut self, selection: Selection);

    fn has_focus(&self) -> bool {
        true
    }

    /// Hosts that track focus record it here; the default ignores it.
    fn set_focus(&mut self, _focused: bool) {}

    /// Replace the character range `[start, end)` with `with`.
    fn replace_range(&mut self, start: usize, end: usize, with: &str) {
        let text = self.text();
        let s = char_to_byte(&text, start);
        let e = char_to_byte(&text, end.max(start));
        let mut next = String::with_capacity(text.len() + with.len());
        next.push_str(&text[..s]);
        next.push_str(with);
        next.push_str(&text[e..]);
        self.set_text(&next);
    }

    /// Caret position (selection end).
    fn caret(&self) -> usize {
        self.selection().end
    }

    fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// In-memory host backed by a rope.
#[derive(Debug, Clone)]
pub struct Buffer {
    rope: Rope,
    selection: Selection,
    focused: bool,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for Buffer {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl Buffer {
    /// Construct a buffer with the caret at the end of `content`.
    pub fn new(content: &str) -> Self {
        let rope = Rope::from_str(content);
        let end = rope.len_chars();
        Self {
            rope,
            selection: Selection::caret(end),
            focused: true,
        }
    }

    fn clamp(&self, selection: Selection) -> Selection {
        let total = self.rope.len_chars();
        Selection::new(selection.start.min(total), selection.end.min(total))
    }
}

impl TextHost for Buffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.selection = self.clamp(self.selection);
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = self.clamp(selection);
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn replace_range(&mut self, start: usize, end: usize, with: &str) {
        let total = self.rope.len_chars();
        let s = start.min(total);
        let e = end.clamp(s, total);
        if s < e {
            self.rope.remove(s..e);
        }
        self.rope.insert(s, with);
        self.selection = self.clamp(self.selection);
    }

    fn char_len(&self) -> usize {
        self.rope.len_chars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_puts_caret_at_end() {
        let b = Buffer::new("hello\nworld");
        assert_eq!(b.char_len(), 11);
        assert_eq!(b.selection(), Selection::caret(11));
        assert!(b.has_focus());
    }

    #[test]
    fn replace_range_counts_chars_not_bytes() {
        let mut b = Buffer::new("µm [x] end");
        b.replace_range(3, 6, "12");
        assert_eq!(b.text(), "µm 12 end");
    }

    #[test]
    fn default_replace_range_matches_rope_override() {
        struct Plain {
            text: String,
            sel: Selection,
        }
        impl TextHost for Plain {
            fn text(&self) -> String {
                self.text.clone()
            }
            fn set_text(&mut self, text: &str) {
                self.text = text.to_string();
            }
            fn selection(&self) -> Selection {
                self.sel
            }
            fn set_selection(&mut self, selection: Selection) {
                self.sel = selection;
            }
        }
        let mut plain = Plain {
            text: "A1–tissue [__] end".into(),
            sel: Selection::caret(0),
        };
        let mut rope = Buffer::new("A1–tissue [__] end");
        plain.replace_range(10, 14, "cut");
        rope.replace_range(10, 14, "cut");
        assert_eq!(plain.text(), rope.text());
    }

    #[test]
    fn selection_is_clamped_after_shrinking_text() {
        let mut b = Buffer::new("abcdef");
        b.set_selection(Selection::new(5, 2));
        assert_eq!(b.selection(), Selection { start: 2, end: 5 });
        b.set_text("ab");
        assert_eq!(b.selection(), Selection { start: 2, end: 2 });
    }

    #[test]
    fn replace_range_deletes_and_tracks_focus() {
        let mut b = Buffer::new("A1-x\nA2-y");
        b.replace_range(4, 5, "");
        assert_eq!(b.text(), "A1-xA2-y");
        b.set_focus(false);
        assert!(!b.has_focus());
    }
}
