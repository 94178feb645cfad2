//! Maps [`Action`]s onto [`Session`] operations.
//!
//! Observers see every action before it is applied. `Type` fans out into one
//! outcome per character; everything else yields exactly one.

use crate::{Action, ActionObserver, Outcome, Session};
use core_text::TextHost;
use tracing::trace;

pub fn dispatch<H: TextHost>(
    action: Action,
    session: &mut Session<H>,
    observers: &[Box<dyn ActionObserver>],
) -> Vec<Outcome> {
    for obs in observers {
        obs.on_action(&action);
    }
    trace!(target: "actions.dispatch", ?action, "dispatch");

    let single = match action {
        Action::Type(text) => return session.type_text(&text),
        Action::Tick => return session.tick(),
        Action::Newline => session.newline(),
        Action::Backspace(n) => session.backspace(n),
        Action::Paste(text) => session.paste(&text),
        Action::PasteClipboard(text) => session.paste_clipboard(&text),
        Action::Select { start, end } => session.select(start, end),
        Action::Caret(at) => session.set_caret(at),
        Action::NextField => session.next_field(),
        Action::PrevField => session.prev_field(),
        Action::InsertNextBlock => session.insert_next_block(),
        Action::InsertNextGroup => session.insert_next_group(),
        Action::UndoInsert => session.undo_last_insert(),
        Action::Undo => session.undo(),
        Action::Redo => session.redo(),
        Action::Restore(index) => session.restore_to(index),
        Action::SetFormat(format) => session.set_format(format),
        Action::SetFocus(focused) => session.set_focus(focused),
        Action::SetAutoAdvance(on) => session.set_auto_advance(on),
        Action::SetAdvanceDelay(ms) => session.set_advance_delay(ms),
        Action::ClearLearnedWords => session.clear_learned_words(),
        Action::LoadDraft(text) => session.load_draft(&text),
        Action::NewCase => session.new_case(),
        Action::NewSpecimen(template) => session.new_specimen(&template),
    };
    vec![single]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountObs(Rc<Cell<usize>>);

    impl ActionObserver for CountObs {
        fn on_action(&self, _action: &Action) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn observers_see_every_action() {
        let count = Rc::new(Cell::new(0));
        let observers: Vec<Box<dyn ActionObserver>> = vec![Box::new(CountObs(count.clone()))];
        let mut session = Session::default();
        let out = dispatch(Action::Type("ab".into()), &mut session, &observers);
        assert_eq!(out.len(), 2);
        dispatch(Action::Redo, &mut session, &observers);
        assert_eq!(count.get(), 2);
        assert_eq!(session.text(), "ab");
    }

    #[test]
    fn type_then_newline_under_label_advances() {
        let mut session = Session::default();
        dispatch(Action::LoadDraft("A1-skin".into()), &mut session, &[]);
        let out = dispatch(Action::Newline, &mut session, &[]);
        assert!(out[0].is_advance());
        assert_eq!(session.text(), "A1-skin\nA2-");
    }
}
