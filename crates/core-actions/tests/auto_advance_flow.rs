//! Field navigation and auto-advance driven through a session on a virtual clock.

mod common;

use common::{dictate, session, session_with_store};
use core_actions::Outcome;
use core_config::{MemoryStore, PreferenceStore, TomlFileStore};
use core_events::HostEvent;
use core_text::Selection;
use pretty_assertions::assert_eq;
use std::time::Duration;

const TEMPLATE: &str = "Site: [___]\nSize: [___] cm";

#[test]
fn filled_field_advances_after_delay() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "breast mass", 100);
    assert_eq!(s.text(), "Site: breast mass\nSize: [___] cm");

    clock.advance_ms(1499);
    // only the idle snapshot is due so far
    assert!(matches!(s.tick().as_slice(), [Outcome::SnapshotTaken { .. }]));
    clock.advance_ms(1);
    let out = s.tick();
    assert!(matches!(out.as_slice(), [Outcome::AutoAdvanced(f)] if f.start == 24));
    assert_eq!(s.advance().anchor(), Some(24));
    assert_eq!(s.field_progress().unwrap().to_string(), "1 / 1");
}

#[test]
fn trailing_comma_holds_the_field() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "breast, ", 100);
    clock.advance_ms(10_000);
    let out = s.tick();
    assert!(!out.iter().any(|o| matches!(o, Outcome::AutoAdvanced(_))));
    assert_eq!(s.advance().anchor(), Some(6));
}

#[test]
fn caret_inside_raw_field_holds() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    s.set_caret(8);
    dictate(&mut s, &clock, "x", 100);
    assert_eq!(s.text(), "Site: [_x__]\nSize: [___] cm");
    assert_eq!(s.advance().deadline(), None);
}

#[test]
fn manual_navigation_wraps_between_fields() {
    let (mut s, _clock) = session(TEMPLATE);
    assert!(matches!(s.next_field(), Outcome::FieldSelected(f) if f.start == 6));
    assert!(matches!(s.next_field(), Outcome::FieldSelected(f) if f.start == 18));
    assert!(matches!(s.next_field(), Outcome::FieldSelected(f) if f.start == 6));
    assert!(matches!(s.prev_field(), Outcome::FieldSelected(f) if f.start == 18));
    assert_eq!(s.advance().anchor(), Some(18));
    let (mut empty, _clock) = session("no fields here");
    assert_eq!(empty.next_field(), Outcome::NoField);
}

#[test]
fn navigating_onto_line_start_placeholder_fills_label() {
    let (mut s, _clock) = session("A1-skin\n[___]-fat");
    match s.next_field() {
        Outcome::Advanced(ev) => assert_eq!(ev.prefix, "A2-"),
        other => panic!("expected label fill, got {other:?}"),
    }
    assert_eq!(s.text(), "A1-skin\nA2-fat");
}

#[test]
fn disabling_cancels_timer_and_keeps_anchor() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "breast mass", 100);
    assert!(s.advance().deadline().is_some());
    s.set_auto_advance(false);
    assert_eq!(s.advance().deadline(), None);
    assert_eq!(s.advance().anchor(), Some(6));
    clock.advance_ms(5000);
    assert!(s.tick().iter().all(|o| !matches!(o, Outcome::AutoAdvanced(_))));
    assert!(!s.preferences().advance.enabled);
}

#[test]
fn backing_up_after_advance_learns_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gross.toml");
    let (mut s, clock) = session_with_store("", Box::new(TomlFileStore::new(path.clone())));
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "lesion measuring", 100);
    clock.advance_ms(1500);
    s.tick();
    assert_eq!(s.advance().anchor(), Some(29));

    clock.advance_ms(800);
    assert_eq!(s.set_caret(15), Outcome::Learned("measuring".into()));
    assert_eq!(s.preferences().advance.learned_words, ["measuring"]);
    let stored = TomlFileStore::new(path).load().unwrap();
    assert_eq!(stored.advance.learned_words, ["measuring"]);

    s.clear_learned_words();
    assert!(s.preferences().advance.learned_words.is_empty());
    assert!(s.advance().vocabulary().learned_words().is_empty());
}

#[test]
fn late_backtrack_learns_nothing() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "lesion measuring", 100);
    clock.advance_ms(1500);
    s.tick();
    clock.advance_ms(4500);
    assert_eq!(s.set_caret(2), Outcome::Unchanged);
    assert!(s.preferences().advance.learned_words.is_empty());
}

#[test]
fn unfocused_backtrack_learns_nothing() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "lesion measuring", 100);
    clock.advance_ms(1500);
    s.tick();
    s.set_focus(false);
    assert_eq!(s.set_caret(15), Outcome::Unchanged);
    assert!(s.advance().vocabulary().learned_words().is_empty());
}

#[test]
fn echoed_auto_advance_selection_teaches_nothing() {
    let (mut s, clock) = session("");
    s.new_specimen(TEMPLATE);
    s.next_field();
    dictate(&mut s, &clock, "large mass", 100);
    assert_eq!(s.text(), "Site: [___]\nSize: large mass cm");
    clock.advance_ms(1500);
    let out = s.tick();
    assert!(matches!(out.first(), Some(Outcome::AutoAdvanced(f)) if f.start == 6));

    // the host reports the wrap back to the first field
    assert_eq!(s.handle(HostEvent::SelectionChanged), Outcome::Unchanged);
    assert!(s.advance().vocabulary().learned_words().is_empty());
    assert_eq!(s.advance().anchor(), Some(6));

    clock.advance_ms(500);
    assert_eq!(s.set_caret(20), Outcome::Learned("mass".into()));
}

#[test]
fn moving_out_of_the_field_stops_tracking() {
    let (mut s, clock) = session("");
    s.new_specimen("Site: [___]\nNotes: ");
    assert_eq!(s.advance().anchor(), Some(6));
    let end = s.text().chars().count();
    s.set_caret(end);
    assert_eq!(s.advance().anchor(), None);

    dictate(&mut s, &clock, "see above", 100);
    clock.advance_ms(1500);
    assert!(!s.tick().iter().any(|o| matches!(o, Outcome::AutoAdvanced(_))));
    assert_eq!(s.selection(), Selection::caret(end + 9));
}

#[test]
fn caret_before_the_anchor_stops_tracking() {
    let (mut s, _clock) = session("");
    s.new_specimen(TEMPLATE);
    s.set_caret(2);
    assert_eq!(s.advance().anchor(), None);
    assert!(matches!(s.next_field(), Outcome::FieldSelected(f) if f.start == 6));
    assert_eq!(s.advance().anchor(), Some(6));
}

#[test]
fn unavailable_storage_keeps_learning_in_session() {
    let (mut s, clock) = session_with_store("", Box::new(MemoryStore::unavailable()));
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "cyst measuring", 100);
    clock.advance_ms(1500);
    s.tick();
    assert_eq!(s.set_caret(3), Outcome::Learned("measuring".into()));
    assert!(s.advance().vocabulary().is_known("measuring"));
}

#[test]
fn short_delay_is_clamped_but_stored_as_given() {
    let (mut s, clock) = session("");
    assert_eq!(s.set_advance_delay(100), Outcome::PreferencesChanged);
    assert_eq!(s.advance().delay(), Duration::from_millis(300));
    assert_eq!(s.preferences().advance.delay_ms, 100);
    s.new_specimen(TEMPLATE);
    dictate(&mut s, &clock, "cyst", 50);
    clock.advance_ms(300);
    assert!(s.tick().iter().any(|o| matches!(o, Outcome::AutoAdvanced(_))));
}
