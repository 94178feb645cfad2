//! Session pipeline and action dispatch.
//!
//! A [`Session`] owns one host buffer plus every automaton component and
//! delivers each host notification through a fixed pipeline:
//!
//! 1. increment engine (its splice must land first; it shifts field offsets)
//! 2. auto-advance controller
//! 3. history tape (immediate labelled snapshot or idle debounce)
//!
//! Exactly one component writes the buffer per turn. Timers are deadlines
//! polled by [`Session::tick`] against an injected [`Clock`]. No operation
//! returns an error to the host; everything reports an [`Outcome`].
//!
//! [`dispatch`] maps the [`Action`] vocabulary used by scripted hosts onto
//! session calls and notifies [`ActionObserver`]s first.

use core_events::AdvanceEvent;
use core_fields::PlaceholderField;
use core_grammar::NumberingFormat;
use core_state::RestoreError;
use std::time::{Instant, SystemTime};

mod dispatcher;
mod scheduler;
mod session;

pub use dispatcher::dispatch;
pub use scheduler::SnapshotScheduler;
pub use session::{HistoryRow, Session};

/// Source of monotonic and wall-clock time.
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Host-level operations a script or UI can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Type text at the selection one character at a time (`\n` = Enter).
    Type(String),
    Newline,
    /// Delete `n` characters before the caret (or the selection).
    Backspace(usize),
    /// Native paste / drop at the selection.
    Paste(String),
    /// Paste from the app's clipboard button.
    PasteClipboard(String),
    Select { start: usize, end: usize },
    Caret(usize),
    /// Host window gained or lost focus.
    SetFocus(bool),
    NextField,
    PrevField,
    InsertNextBlock,
    InsertNextGroup,
    UndoInsert,
    Undo,
    Redo,
    Restore(usize),
    SetFormat(NumberingFormat),
    SetAutoAdvance(bool),
    SetAdvanceDelay(u64),
    ClearLearnedWords,
    LoadDraft(String),
    NewCase,
    NewSpecimen(String),
    /// Fire expired deadlines.
    Tick,
}

/// Observer notified before an action is dispatched.
pub trait ActionObserver {
    fn on_action(&self, action: &Action);
}

/// What an operation did. Variants with a notice are transient user messages,
/// not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text or selection changed with no automation reacting.
    Applied,
    /// The increment engine spliced a label.
    Advanced(AdvanceEvent),
    /// A field was selected by navigation.
    FieldSelected(PlaceholderField),
    /// The auto-advance timer fired and moved to this field.
    AutoAdvanced(PlaceholderField),
    NoField,
    NoGroup,
    InsertUndone,
    NothingToUndoInsert,
    Restored { index: usize },
    NothingToUndo,
    NothingToRedo,
    RestoreFailed(RestoreError),
    SnapshotTaken { index: usize },
    /// A hold word was learned from the user backing up.
    Learned(String),
    PreferencesChanged,
    Unchanged,
}

impl Outcome {
    /// Transient notice for the footer, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            Outcome::NoField => Some("no fields".to_string()),
            Outcome::NoGroup => Some("no group to advance".to_string()),
            Outcome::NothingToUndoInsert => Some("nothing to undo".to_string()),
            Outcome::NothingToUndo => Some("nothing to undo".to_string()),
            Outcome::NothingToRedo => Some("nothing to redo".to_string()),
            Outcome::RestoreFailed(e) => Some(e.to_string()),
            Outcome::Learned(word) => Some(format!("learned hold word `{word}`")),
            Outcome::Advanced(ev) => Some(ev.to_string()),
            _ => None,
        }
    }

    pub fn is_advance(&self) -> bool {
        matches!(self, Outcome::Advanced(_))
    }
}
