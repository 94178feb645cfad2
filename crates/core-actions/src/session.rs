use crate::{Clock, Outcome, SnapshotScheduler, SystemClock};
use core_advance::{AutoAdvance, Effect, Effects, MutationInput};
use core_cassette::{IncrementEngine, UndoInsertOutcome};
use core_config::{MemoryStore, PreferenceStore, Preferences, load_or_default, save_or_warn};
use core_events::{AdvanceEvent, AdvanceObserver, EditKind, HostEvent};
use core_fields::{Direction, FieldProgress, PlaceholderField, is_inside_field, progress, select_field};
use core_grammar::{BlockMap, NumberingFormat, block_map};
use core_state::{DiffStats, HistoryOutcome, HistoryTape, RecordOutcome, SnapshotLabel};
use core_text::{Buffer, Selection, TextHost, char_len, line_at, slice_chars};
use std::time::SystemTime;
use tracing::{debug, info, trace};

/// Characters that close a sentence and mark a word-boundary snapshot.
const SENTENCE_END: [char; 3] = ['.', '!', '?'];

/// One row of the history browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub index: usize,
    pub label: SnapshotLabel,
    pub timestamp: SystemTime,
    pub diff: DiffStats,
    pub chars: usize,
    pub current: bool,
}

/// One dictation session: a host buffer plus the automaton around it.
pub struct Session<H: TextHost = Buffer> {
    host: H,
    engine: IncrementEngine,
    advance: AutoAdvance,
    history: HistoryTape,
    scheduler: SnapshotScheduler,
    prefs: Preferences,
    store: Box<dyn PreferenceStore>,
    clock: Box<dyn Clock>,
    observers: Vec<Box<dyn AdvanceObserver>>,
    /// Selection the last navigation left on the host; its echo is ignored.
    pending_nav: Option<Selection>,
}

impl Default for Session<Buffer> {
    fn default() -> Self {
        Self::new(
            Buffer::default(),
            Box::new(MemoryStore::default()),
            Box::new(SystemClock),
        )
    }
}

impl<H: TextHost> Session<H> {
    /// Build a session from whatever the store holds; storage failures fall
    /// back to defaults. The initial buffer is recorded as the first entry.
    pub fn new(host: H, store: Box<dyn PreferenceStore>, clock: Box<dyn Clock>) -> Self {
        let prefs = load_or_default(store.as_ref());
        let mut session = Self {
            host,
            engine: IncrementEngine::new(prefs.cassette.format),
            advance: AutoAdvance::new(
                prefs.advance.enabled,
                prefs.effective_delay_ms(),
                prefs.hold_vocabulary(),
            ),
            history: HistoryTape::new(prefs.history.capacity),
            scheduler: SnapshotScheduler::new(prefs.history.idle_ms),
            prefs,
            store,
            clock,
            observers: Vec::new(),
            pending_nav: None,
        };
        let text = session.host.text();
        session.history.record(&text, SnapshotLabel::DraftLoaded, session.clock.wall());
        info!(target: "actions.session", format = %session.engine.format(), auto = session.advance.is_enabled(), "session_started");
        session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access. Edits made here bypass the pipeline unless
    /// followed by [`Session::notify_mutation`].
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn text(&self) -> String {
        self.host.text()
    }

    pub fn selection(&self) -> Selection {
        self.host.selection()
    }

    pub fn engine(&self) -> &IncrementEngine {
        &self.engine
    }

    pub fn advance(&self) -> &AutoAdvance {
        &self.advance
    }

    pub fn history(&self) -> &HistoryTape {
        &self.history
    }

    pub fn scheduler(&self) -> &SnapshotScheduler {
        &self.scheduler
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn format(&self) -> NumberingFormat {
        self.engine.format()
    }

    pub fn add_observer(&mut self, observer: Box<dyn AdvanceObserver>) {
        self.observers.push(observer);
    }

    // ---------------------------------------------------------------------
    // Host notifications
    // ---------------------------------------------------------------------

    /// A mutation of `kind` was already applied to the host.
    pub fn notify_mutation(&mut self, kind: EditKind) -> Outcome {
        self.mutation_pipeline(kind, None)
    }

    /// Route a raw host notification.
    pub fn handle(&mut self, event: HostEvent) -> Outcome {
        match event {
            HostEvent::Mutated(kind) => self.notify_mutation(kind),
            HostEvent::SelectionChanged => self.notify_selection(),
        }
    }

    /// The selection moved. The echo of a selection this session just set
    /// by navigating is ignored; anything else feeds learning and may end
    /// tracking of the anchored field.
    pub fn notify_selection(&mut self) -> Outcome {
        let sel = self.host.selection();
        if self.pending_nav.take() == Some(sel) {
            trace!(target: "actions.session", start = sel.start, end = sel.end, "navigation_echo_ignored");
            return Outcome::Unchanged;
        }
        let now = self.clock.now();
        let caret = sel.end;
        let focused = self.host.has_focus();
        let fx = self.advance.on_selection(caret, focused, now);
        let learned = self.apply_effects(fx);
        self.leave_abandoned_field(caret);
        if let Some(ev) = self.engine.on_selection(&mut self.host) {
            return self.label_inserted(ev);
        }
        learned.unwrap_or(Outcome::Unchanged)
    }

    /// Fire expired deadlines: auto-advance first, then the idle snapshot.
    pub fn tick(&mut self) -> Vec<Outcome> {
        let now = self.clock.now();
        let mut out = Vec::new();
        if self.advance.deadline().is_some_and(|d| now >= d) {
            let fx = self.advance.on_timer(now, self.host.caret());
            if fx.contains(&Effect::NavigateNext) {
                out.push(match self.navigate(Direction::Next, false) {
                    Outcome::FieldSelected(f) => Outcome::AutoAdvanced(f),
                    other => other,
                });
            }
        }
        if self.scheduler.take_due(now) {
            out.push(self.snapshot(SnapshotLabel::Typed));
        }
        out
    }

    // ---------------------------------------------------------------------
    // Host editing (drives the same pipeline a UI would)
    // ---------------------------------------------------------------------

    /// Type `text` one character at a time; `\n` is Enter.
    pub fn type_text(&mut self, text: &str) -> Vec<Outcome> {
        text.chars().map(|c| self.type_char(c)).collect()
    }

    pub fn type_char(&mut self, c: char) -> Outcome {
        let kind = if c == '\n' {
            EditKind::Newline
        } else {
            EditKind::PlainInsert
        };
        self.insert_at_selection(&c.to_string());
        self.notify_mutation(kind)
    }

    pub fn newline(&mut self) -> Outcome {
        self.type_char('\n')
    }

    pub fn backspace(&mut self, count: usize) -> Outcome {
        let sel = self.host.selection();
        let (start, end) = if sel.is_caret() {
            (sel.start.saturating_sub(count), sel.end)
        } else {
            (sel.start, sel.end)
        };
        if start == end {
            return Outcome::Unchanged;
        }
        self.host.replace_range(start, end, "");
        self.host.set_selection(Selection::caret(start));
        self.notify_mutation(EditKind::Other)
    }

    /// Native paste or drop.
    pub fn paste(&mut self, text: &str) -> Outcome {
        self.insert_at_selection(text);
        self.notify_mutation(EditKind::Paste)
    }

    /// Paste through the app's clipboard action; recorded under its own label.
    pub fn paste_clipboard(&mut self, text: &str) -> Outcome {
        self.insert_at_selection(text);
        self.mutation_pipeline(EditKind::Paste, Some(SnapshotLabel::ClipboardPaste))
    }

    pub fn select(&mut self, start: usize, end: usize) -> Outcome {
        self.host.set_selection(Selection::new(start, end));
        self.notify_selection()
    }

    pub fn set_caret(&mut self, at: usize) -> Outcome {
        self.select(at, at)
    }

    /// Host window gained or lost focus. Learning only happens while focused.
    pub fn set_focus(&mut self, focused: bool) -> Outcome {
        self.host.set_focus(focused);
        debug!(target: "actions.session", focused, "focus_changed");
        Outcome::Applied
    }

    // ---------------------------------------------------------------------
    // Navigation and manual label operations
    // ---------------------------------------------------------------------

    pub fn next_field(&mut self) -> Outcome {
        self.navigate(Direction::Next, true)
    }

    pub fn prev_field(&mut self) -> Outcome {
        self.navigate(Direction::Prev, true)
    }

    pub fn insert_next_block(&mut self) -> Outcome {
        let ev = self.engine.insert_next_block(&mut self.host);
        self.label_inserted(ev)
    }

    pub fn insert_next_group(&mut self) -> Outcome {
        match self.engine.insert_next_group(&mut self.host) {
            Some(ev) => self.label_inserted(ev),
            None => Outcome::NoGroup,
        }
    }

    pub fn undo_last_insert(&mut self) -> Outcome {
        match self.engine.undo_last_insert(&mut self.host) {
            UndoInsertOutcome::Removed(_) => {
                self.scheduler.bump(self.clock.now());
                Outcome::InsertUndone
            }
            UndoInsertOutcome::NothingToUndo => Outcome::NothingToUndoInsert,
        }
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    pub fn undo(&mut self) -> Outcome {
        let live = self.host.text();
        let outcome = self.history.undo(&live, self.clock.wall());
        self.apply_history(outcome)
    }

    pub fn redo(&mut self) -> Outcome {
        let outcome = self.history.redo();
        self.apply_history(outcome)
    }

    pub fn restore_to(&mut self, index: usize) -> Outcome {
        match self.history.restore_to(index) {
            Ok(text) => {
                self.replace_buffer(&text);
                Outcome::Restored { index }
            }
            Err(e) => {
                debug!(target: "actions.dispatch", index, error = %e, "restore_failed");
                Outcome::RestoreFailed(e)
            }
        }
    }

    /// Rows for a history browser, oldest first.
    pub fn history_entries(&self) -> Vec<HistoryRow> {
        let current = self.history.index();
        self.history
            .entries()
            .enumerate()
            .map(|(index, s)| HistoryRow {
                index,
                label: s.label,
                timestamp: s.timestamp,
                diff: s.diff,
                chars: char_len(&s.text),
                current: current == Some(index),
            })
            .collect()
    }

    /// Record the live buffer now, bypassing the idle debounce.
    pub fn snapshot(&mut self, label: SnapshotLabel) -> Outcome {
        self.scheduler.cancel();
        let text = self.host.text();
        match self.history.record(&text, label, self.clock.wall()) {
            RecordOutcome::Recorded { index, .. } => Outcome::SnapshotTaken { index },
            RecordOutcome::Duplicate => Outcome::Unchanged,
        }
    }

    // ---------------------------------------------------------------------
    // Case lifecycle
    // ---------------------------------------------------------------------

    pub fn load_draft(&mut self, text: &str) -> Outcome {
        self.replace_buffer(text);
        self.snapshot(SnapshotLabel::DraftLoaded)
    }

    pub fn new_case(&mut self) -> Outcome {
        self.replace_buffer("");
        self.snapshot(SnapshotLabel::NewCase)
    }

    /// Start a specimen from a template and land on its first field.
    pub fn new_specimen(&mut self, template: &str) -> Outcome {
        self.replace_buffer(template);
        self.host.set_selection(Selection::caret(0));
        let snap = self.snapshot(SnapshotLabel::NewSpecimen);
        match self.navigate(Direction::Next, false) {
            Outcome::NoField => snap,
            other => other,
        }
    }

    // ---------------------------------------------------------------------
    // Preferences
    // ---------------------------------------------------------------------

    pub fn set_format(&mut self, format: NumberingFormat) -> Outcome {
        self.engine.set_format(format);
        self.prefs.cassette.format = format;
        self.persist();
        Outcome::PreferencesChanged
    }

    pub fn set_auto_advance(&mut self, enabled: bool) -> Outcome {
        let fx = self.advance.set_enabled(enabled);
        self.apply_effects(fx);
        self.prefs.advance.enabled = enabled;
        self.persist();
        Outcome::PreferencesChanged
    }

    pub fn set_advance_delay(&mut self, ms: u64) -> Outcome {
        self.prefs.advance.delay_ms = ms;
        self.advance.set_delay_ms(self.prefs.effective_delay_ms());
        self.persist();
        Outcome::PreferencesChanged
    }

    pub fn clear_learned_words(&mut self) -> Outcome {
        self.advance.clear_learned();
        self.prefs.advance.learned_words.clear();
        self.persist();
        info!(target: "actions.session", "learned_words_cleared");
        Outcome::PreferencesChanged
    }

    // ---------------------------------------------------------------------
    // Display helpers
    // ---------------------------------------------------------------------

    pub fn block_map(&self) -> BlockMap {
        block_map(&self.host.text(), self.engine.format())
    }

    pub fn field_progress(&self) -> Option<FieldProgress> {
        progress(&self.host.text(), self.host.selection().start)
    }

    // ---------------------------------------------------------------------
    // Pipeline internals
    // ---------------------------------------------------------------------

    fn mutation_pipeline(&mut self, kind: EditKind, paste_label: Option<SnapshotLabel>) -> Outcome {
        self.pending_nav = None;
        if let Some(ev) = self.engine.on_mutation(&mut self.host, kind) {
            return self.label_inserted(ev);
        }
        let now = self.clock.now();
        let text = self.host.text();
        let caret = self.host.caret();
        let input = MutationInput {
            text: &text,
            caret,
            inside_field: is_inside_field(&text, caret),
        };
        let fx = self.advance.on_mutation(input, now);
        self.apply_effects(fx);

        match kind {
            EditKind::Paste => {
                self.snapshot(paste_label.unwrap_or(SnapshotLabel::Paste));
            }
            EditKind::Newline => {
                self.snapshot(SnapshotLabel::WordBoundary);
            }
            EditKind::PlainInsert if ends_sentence(&text, caret) => {
                self.snapshot(SnapshotLabel::WordBoundary);
            }
            _ => self.scheduler.bump(now),
        }
        Outcome::Applied
    }

    fn label_inserted(&mut self, ev: AdvanceEvent) -> Outcome {
        debug!(target: "actions.dispatch", prefix_len = ev.prefix.len(), was_placeholder = ev.was_placeholder, was_range = ev.was_range, "advance_event");
        for obs in &self.observers {
            obs.on_advance(&ev);
        }
        let fx = self.advance.reset();
        self.apply_effects(fx);
        self.snapshot(SnapshotLabel::BlockInsert);
        Outcome::Advanced(ev)
    }

    /// Select the next/previous field, re-anchor the controller and let the
    /// engine fill a line-start placeholder. `user` navigation also feeds the
    /// learning watch; timer-driven navigation must not.
    fn navigate(&mut self, direction: Direction, user: bool) -> Outcome {
        let Some(field) = select_field(&mut self.host, direction) else {
            return Outcome::NoField;
        };
        if user {
            let fx = self
                .advance
                .on_selection(field.start, self.host.has_focus(), self.clock.now());
            self.apply_effects(fx);
        }
        let fx = self.advance.set_anchor(field.start);
        self.apply_effects(fx);
        let outcome = match self.engine.on_selection(&mut self.host) {
            Some(ev) => self.label_inserted(ev),
            None => Outcome::FieldSelected(field),
        };
        self.pending_nav = Some(self.host.selection());
        outcome
    }

    /// Caret moved before the anchor or off its line: the field is abandoned.
    fn leave_abandoned_field(&mut self, caret: usize) {
        let Some(anchor) = self.advance.anchor() else {
            return;
        };
        let text = self.host.text();
        if caret < anchor || line_at(&text, caret).index != line_at(&text, anchor).index {
            debug!(target: "actions.session", anchor, caret, "field_abandoned");
            let fx = self.advance.leave_field();
            self.apply_effects(fx);
        }
    }

    fn apply_history(&mut self, outcome: HistoryOutcome) -> Outcome {
        match outcome {
            HistoryOutcome::Restored { index, text } => {
                self.replace_buffer(&text);
                Outcome::Restored { index }
            }
            HistoryOutcome::NothingToUndo => Outcome::NothingToUndo,
            HistoryOutcome::NothingToRedo => Outcome::NothingToRedo,
        }
    }

    /// Direct buffer replace: not a keystroke, never recorded, never seen by
    /// the engine.
    fn replace_buffer(&mut self, text: &str) {
        self.host.set_text(text);
        self.host.set_selection(Selection::caret(char_len(text)));
        self.engine.forget();
        self.scheduler.cancel();
        self.pending_nav = None;
        let fx = self.advance.reset();
        self.apply_effects(fx);
        trace!(target: "actions.dispatch", len = text.len(), "buffer_replaced");
    }

    fn insert_at_selection(&mut self, s: &str) {
        let sel = self.host.selection();
        self.host.replace_range(sel.start, sel.end, s);
        self.host
            .set_selection(Selection::caret(sel.start + char_len(s)));
    }

    /// Timer effects need no action here: deadlines live in the controller
    /// and are polled by `tick`. Learned words are persisted.
    fn apply_effects(&mut self, fx: Effects) -> Option<Outcome> {
        let mut learned = None;
        for effect in fx {
            if let Effect::Learned(word) = effect {
                self.prefs
                    .set_learned_words(self.advance.vocabulary().learned_words());
                self.persist();
                learned = Some(Outcome::Learned(word));
            }
        }
        learned
    }

    fn persist(&mut self) {
        if !save_or_warn(self.store.as_mut(), &self.prefs) {
            debug!(target: "actions.session", "preferences_session_only");
        }
    }
}

fn ends_sentence(text: &str, caret: usize) -> bool {
    caret > 0
        && slice_chars(text, caret - 1, caret)
            .chars()
            .next()
            .is_some_and(|c| SENTENCE_END.contains(&c))
}
