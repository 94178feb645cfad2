//! Increment engine.
//!
//! Watches buffer mutations and selections, decides when a block label should
//! be spliced into the buffer, performs the splice through the host accessor
//! and reports an [`AdvanceEvent`]. Owns the single-level `LastAutoInsert`
//! and the echo guard that keeps its own splices from retriggering it.
//!
//! Trigger priority on every mutation:
//! 1. caret inside a line-start bracket placeholder
//! 2. a newline produced an empty line under a label line
//! 3. the first character typed on a line under a label line
//!
//! Selections exactly spanning a line-start placeholder fill it as well
//! (see [`IncrementEngine::on_selection`]).

use core_events::{AdvanceEvent, AdvanceKind, EditKind};
use core_grammar::{
    Label, LineClass, NumberingFormat, ParsedLabel, PlaceholderToken, classify_line,
    find_last_block, preceding_block,
};
use core_text::{EchoGuard, LineSpan, Selection, TextHost, char_len, line_at, slice_chars};
use tracing::{debug, trace};

/// Separator used when a label has to be invented without a prior block.
pub const DEFAULT_SEPARATOR: &str = "-";

/// The most recent engine splice, kept for single-shot undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAutoInsert {
    pub inserted_text: String,
    /// Length in characters.
    pub len: usize,
    /// Character offset where the text was inserted.
    pub at: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoInsertOutcome {
    Removed(LastAutoInsert),
    NothingToUndo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Placeholder,
    NewLine,
    FirstChar,
    Selection,
    ManualBlock,
    ManualGroup,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Placeholder => "placeholder",
            Trigger::NewLine => "new_line",
            Trigger::FirstChar => "first_char",
            Trigger::Selection => "selection",
            Trigger::ManualBlock => "manual_block",
            Trigger::ManualGroup => "manual_group",
        }
    }
}

#[derive(Debug, Default)]
pub struct IncrementEngine {
    format: NumberingFormat,
    last_insert: Option<LastAutoInsert>,
    guard: EchoGuard,
}

impl IncrementEngine {
    pub fn new(format: NumberingFormat) -> Self {
        Self {
            format,
            last_insert: None,
            guard: EchoGuard::new(),
        }
    }

    pub fn format(&self) -> NumberingFormat {
        self.format
    }

    /// Only affects future increments; existing text is never reparsed.
    pub fn set_format(&mut self, format: NumberingFormat) {
        if self.format != format {
            debug!(target: "cassette", %format, "format_changed");
        }
        self.format = format;
    }

    pub fn last_insert(&self) -> Option<&LastAutoInsert> {
        self.last_insert.as_ref()
    }

    /// Drop undo state and any armed echo, e.g. after the buffer was replaced
    /// wholesale.
    pub fn forget(&mut self) {
        self.last_insert = None;
        self.guard.disarm();
    }

    /// React to a mutation the host already applied.
    pub fn on_mutation<H: TextHost + ?Sized>(
        &mut self,
        host: &mut H,
        kind: EditKind,
    ) -> Option<AdvanceEvent> {
        let text = host.text();
        if self.guard.take_if_echo(&text) {
            return None;
        }
        let caret = host.caret();
        let line = line_at(&text, caret);
        let line_text = slice_chars(&text, line.start, line.end);

        if let LineClass::Placeholder(token) = classify_line(line_text, self.format) {
            let rel = caret - line.start;
            if rel >= 1 && rel < token.bracket_len {
                return Some(self.fill_placeholder(host, &text, line, &token, Trigger::Placeholder));
            }
        }

        match kind {
            EditKind::Newline if line.is_empty() => {
                let prev = preceding_block(&text, line.index, self.format)?;
                Some(self.prepend_next(host, line, &prev, Trigger::NewLine))
            }
            EditKind::PlainInsert
                if line.len() == 1
                    && caret == line.end
                    && !line_text.starts_with(char::is_whitespace) =>
            {
                let prev = preceding_block(&text, line.index, self.format)?;
                Some(self.prepend_next(host, line, &prev, Trigger::FirstChar))
            }
            _ => None,
        }
    }

    /// A selection exactly spanning a line-start placeholder (brackets, or
    /// brackets plus separator) is filled like a placeholder edit.
    pub fn on_selection<H: TextHost + ?Sized>(&mut self, host: &mut H) -> Option<AdvanceEvent> {
        let sel = host.selection();
        if sel.is_caret() {
            return None;
        }
        let text = host.text();
        let line = line_at(&text, sel.start);
        if sel.start != line.start {
            return None;
        }
        let LineClass::Placeholder(token) =
            classify_line(slice_chars(&text, line.start, line.end), self.format)
        else {
            return None;
        };
        let spanned = sel.end - line.start;
        if spanned != token.bracket_len && spanned != token.raw_len {
            return None;
        }
        Some(self.fill_placeholder(host, &text, line, &token, Trigger::Selection))
    }

    /// Explicit "next block": fills a placeholder on the caret line, writes
    /// onto an empty caret line, or appends a new line after the caret line.
    /// Without any prior block the first label of the format is used.
    pub fn insert_next_block<H: TextHost + ?Sized>(&mut self, host: &mut H) -> AdvanceEvent {
        let text = host.text();
        let line = line_at(&text, host.caret());
        if let LineClass::Placeholder(token) =
            classify_line(slice_chars(&text, line.start, line.end), self.format)
        {
            return self.fill_placeholder(host, &text, line, &token, Trigger::ManualBlock);
        }
        let last = find_last_block(&text, line.index, self.format).map(|(_, p)| p);
        let (to, separator) = match &last {
            Some(p) => (p.label.next_block(), p.separator.clone()),
            None => (Label::first(self.format), DEFAULT_SEPARATOR.to_string()),
        };
        let prefix = format!("{to}{separator}");
        self.append_line(host, line, &prefix, Trigger::ManualBlock);
        advance_event(last.as_ref(), &to, prefix, false, AdvanceKind::Block)
    }

    /// Explicit "next group": appends the first label of the next specimen.
    /// `None` without a prior block or when the group cannot advance.
    pub fn insert_next_group<H: TextHost + ?Sized>(&mut self, host: &mut H) -> Option<AdvanceEvent> {
        let text = host.text();
        let line = line_at(&text, host.caret());
        let Some((_, last)) = find_last_block(&text, line.index, self.format) else {
            trace!(target: "cassette", "group_skipped_no_block");
            return None;
        };
        let Some(to) = last.label.next_group() else {
            debug!(target: "cassette", label = %last.label, "group_exhausted");
            return None;
        };
        let prefix = format!("{to}{}", last.separator);
        self.append_line(host, line, &prefix, Trigger::ManualGroup);
        Some(advance_event(Some(&last), &to, prefix, false, AdvanceKind::Group))
    }

    /// Remove the last engine insert when it sits immediately before the caret.
    pub fn undo_last_insert<H: TextHost + ?Sized>(&mut self, host: &mut H) -> UndoInsertOutcome {
        let Some(last) = self.last_insert.take() else {
            return UndoInsertOutcome::NothingToUndo;
        };
        let text = host.text();
        let caret = host.caret();
        if caret < last.len || slice_chars(&text, caret - last.len, caret) != last.inserted_text {
            trace!(target: "cassette", caret, len = last.len, "undo_insert_mismatch");
            self.last_insert = Some(last);
            return UndoInsertOutcome::NothingToUndo;
        }
        let start = caret - last.len;
        host.replace_range(start, caret, "");
        host.set_selection(Selection::caret(start));
        self.guard.arm(&host.text());
        debug!(target: "cassette", at = start, len = last.len, "label_insert_undone");
        UndoInsertOutcome::Removed(last)
    }

    fn fill_placeholder<H: TextHost + ?Sized>(
        &mut self,
        host: &mut H,
        text: &str,
        line: LineSpan,
        token: &PlaceholderToken,
        trigger: Trigger,
    ) -> AdvanceEvent {
        let last = find_last_block(text, line.index, self.format).map(|(_, p)| p);
        let to = match &last {
            Some(p) => p.label.next_block(),
            None => Label::first(self.format),
        };
        let prefix = format!("{to}{}", token.separator);
        let end = line.start + token.raw_len;
        let caret = line.start + char_len(&prefix);
        self.splice(host, line.start, end, &prefix, caret, trigger);
        advance_event(last.as_ref(), &to, prefix, true, AdvanceKind::Block)
    }

    fn prepend_next<H: TextHost + ?Sized>(
        &mut self,
        host: &mut H,
        line: LineSpan,
        prev: &ParsedLabel,
        trigger: Trigger,
    ) -> AdvanceEvent {
        let to = prev.label.next_block();
        let prefix = format!("{to}{}", prev.separator);
        // caret stays after whatever the line already held
        let caret = line.end + char_len(&prefix);
        self.splice(host, line.start, line.start, &prefix, caret, trigger);
        advance_event(Some(prev), &to, prefix, false, AdvanceKind::Block)
    }

    fn append_line<H: TextHost + ?Sized>(
        &mut self,
        host: &mut H,
        line: LineSpan,
        prefix: &str,
        trigger: Trigger,
    ) {
        let (at, inserted) = if line.is_empty() {
            (line.start, prefix.to_string())
        } else {
            (line.end, format!("\n{prefix}"))
        };
        let caret = at + char_len(&inserted);
        self.splice(host, at, at, &inserted, caret, trigger);
    }

    fn splice<H: TextHost + ?Sized>(
        &mut self,
        host: &mut H,
        start: usize,
        end: usize,
        insert: &str,
        caret: usize,
        trigger: Trigger,
    ) {
        host.replace_range(start, end, insert);
        host.set_selection(Selection::caret(caret));
        self.guard.arm(&host.text());
        let len = char_len(insert);
        self.last_insert = Some(LastAutoInsert {
            inserted_text: insert.to_string(),
            len,
            at: start,
        });
        debug!(target: "cassette", trigger = trigger.as_str(), at = start, replaced = end - start, len, "label_inserted");
    }
}

fn advance_event(
    from: Option<&ParsedLabel>,
    to: &Label,
    prefix: String,
    was_placeholder: bool,
    kind: AdvanceKind,
) -> AdvanceEvent {
    AdvanceEvent {
        prefix,
        from_label: from.map(ParsedLabel::secondary),
        to_label: to.secondary(),
        was_range: from.is_some_and(ParsedLabel::is_range),
        was_placeholder,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    fn typed(engine: &mut IncrementEngine, buf: &mut Buffer, s: &str) -> Option<AdvanceEvent> {
        let caret = buf.caret();
        buf.replace_range(caret, caret, s);
        buf.set_selection(Selection::caret(caret + char_len(s)));
        let kind = if s == "\n" {
            EditKind::Newline
        } else {
            EditKind::PlainInsert
        };
        engine.on_mutation(buf, kind)
    }

    #[test]
    fn newline_under_label_inserts_next() {
        let mut e = IncrementEngine::default();
        let mut b = Buffer::new("A1: skin");
        let ev = typed(&mut e, &mut b, "\n").unwrap();
        assert_eq!(b.text(), "A1: skin\nA2: ");
        assert_eq!(b.caret(), 13);
        assert_eq!(ev.prefix, "A2: ");
        assert_eq!(e.last_insert().unwrap().len, 4);
    }

    #[test]
    fn newline_under_prose_does_nothing() {
        let mut e = IncrementEngine::default();
        let mut b = Buffer::new("Received fresh");
        assert_eq!(typed(&mut e, &mut b, "\n"), None);
        assert_eq!(b.text(), "Received fresh\n");
    }

    #[test]
    fn whitespace_first_char_is_ignored() {
        let mut e = IncrementEngine::default();
        let mut b = Buffer::new("A1-x\n");
        assert_eq!(typed(&mut e, &mut b, " "), None);
        assert_eq!(b.text(), "A1-x\n ");
    }

    #[test]
    fn range_line_reports_was_range() {
        let mut e = IncrementEngine::default();
        let mut b = Buffer::new("A5-A10-fat\n");
        let ev = typed(&mut e, &mut b, "y").unwrap();
        assert_eq!(b.text(), "A5-A10-fat\nA11-y");
        assert!(ev.was_range);
        assert_eq!(ev.from_label.as_deref(), Some("10"));
    }

    #[test]
    fn own_splice_is_not_reprocessed() {
        let mut e = IncrementEngine::default();
        let mut b = Buffer::new("A1-x");
        typed(&mut e, &mut b, "\n").unwrap();
        // host echoes the programmatic edit
        assert_eq!(e.on_mutation(&mut b, EditKind::Other), None);
        assert_eq!(b.text(), "A1-x\nA2-");
    }

    #[test]
    fn format_switch_ignores_other_format_lines() {
        let mut e = IncrementEngine::new(NumberingFormat::NumberLetter);
        let mut b = Buffer::new("A1-x");
        assert_eq!(typed(&mut e, &mut b, "\n"), None);
        e.set_format(NumberingFormat::LetterNumber);
        assert!(typed(&mut e, &mut b, "z").is_some());
        assert_eq!(b.text(), "A1-x\nA2-z");
    }
}
