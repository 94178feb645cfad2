//! Auto-advance transitions driven by a virtual clock.

use core_advance::{AutoAdvance, Effect, HoldVocabulary, LEARN_WINDOW, MutationInput, Phase};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

struct Clock {
    now: Instant,
}

impl Clock {
    fn new() -> Self {
        Self { now: Instant::now() }
    }

    fn advance(&mut self, ms: u64) -> Instant {
        self.now += Duration::from_millis(ms);
        self.now
    }
}

fn typed(text: &str) -> MutationInput<'_> {
    MutationInput {
        text,
        caret: text.chars().count(),
        inside_field: false,
    }
}

/// Simulate typing `filled` one character at a time after `prefix`, 100 ms apart.
fn type_into(a: &mut AutoAdvance, clock: &mut Clock, prefix: &str, filled: &str) -> Vec<Effect> {
    let mut effects = Vec::new();
    let mut text = prefix.to_string();
    for c in filled.chars() {
        text.push(c);
        let now = clock.advance(100);
        effects.extend(a.on_mutation(typed(&text), now));
    }
    effects
}

#[test]
fn trailing_comma_never_fires() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(6);
    type_into(&mut a, &mut clock, "Site: ", "breast, ");
    assert_eq!(a.deadline(), None);
    let later = clock.advance(10_000);
    assert!(a.on_timer(later, 14).is_empty());
    assert_eq!(a.phase(), &Phase::Tracking { anchor: 6 });
}

#[test]
fn plain_words_fire_after_delay() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(6);
    let effects = type_into(&mut a, &mut clock, "Site: ", "breast mass");
    assert!(matches!(effects.last(), Some(Effect::ArmTimer(_))));
    let deadline = a.deadline().expect("timer armed");
    assert_eq!(deadline, clock.now + Duration::from_millis(1500));

    let early = clock.advance(1499);
    assert!(a.on_timer(early, 17).is_empty());
    let due = clock.advance(1);
    let fired = a.on_timer(due, 17);
    assert_eq!(fired.as_slice(), &[Effect::NavigateNext]);
    assert_eq!(a.phase(), &Phase::Idle);
    assert!(a.is_watching());
}

#[test]
fn each_keystroke_restarts_the_debounce() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(0);
    a.on_mutation(typed("firm"), clock.now);
    let first = a.deadline().unwrap();
    let t = clock.advance(1000);
    a.on_mutation(typed("firm tan"), t);
    let second = a.deadline().unwrap();
    assert!(second > first);
    // the first deadline passing no longer fires
    assert!(a.on_timer(first + Duration::from_millis(1), 8).is_empty());
    assert_eq!(a.on_timer(second, 8).as_slice(), &[Effect::NavigateNext]);
}

#[test]
fn continuation_word_clears_an_armed_timer() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(0);
    a.on_mutation(typed("mass"), clock.now);
    assert!(a.deadline().is_some());
    let fx = a.on_mutation(typed("mass with"), clock.advance(200));
    assert_eq!(fx.as_slice(), &[Effect::ClearTimer]);
    assert_eq!(a.deadline(), None);
}

#[test]
fn backing_up_after_advance_learns_context_word() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(0);
    a.on_mutation(typed("lesion measuring"), clock.now);
    a.on_timer(clock.advance(1500), 16);
    a.set_anchor(30);

    // small moves are ignored
    assert!(a.on_selection(14, true, clock.advance(300)).is_empty());
    let fx = a.on_selection(10, true, clock.advance(300));
    assert_eq!(fx.as_slice(), &[Effect::Learned("measuring".to_string())]);
    assert!(!a.is_watching());

    // next time the word holds
    a.set_anchor(0);
    let fx = a.on_mutation(typed("cyst measuring"), clock.advance(100));
    assert!(fx.is_empty());
    assert_eq!(a.deadline(), None);
}

#[test]
fn learning_requires_focus_and_window() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(0);
    a.on_mutation(typed("nodule measuring"), clock.now);
    a.on_timer(clock.advance(1500), 16);

    assert!(a.on_selection(2, false, clock.advance(100)).is_empty());
    assert!(a.is_watching());
    let late = clock.advance(LEARN_WINDOW.as_millis() as u64);
    assert!(a.on_selection(2, true, late).is_empty());
    assert!(!a.is_watching());
    assert!(a.vocabulary().learned_words().is_empty());
}

#[test]
fn known_context_word_is_not_relearned() {
    let vocab = HoldVocabulary::new([','], ["of".to_string()], ["cm".to_string()]);
    let mut clock = Clock::new();
    let mut a = AutoAdvance::new(true, 300, vocab);
    a.set_anchor(0);
    a.on_mutation(typed("lesion x"), clock.now);
    a.on_timer(clock.advance(300), 8);
    // single character context word is too short
    assert!(a.on_selection(0, true, clock.advance(10)).is_empty());
    assert!(!a.is_watching());
    assert!(!a.learn("CM"));
    assert_eq!(a.vocabulary().learned_words().len(), 1);
}

#[test]
fn reset_returns_to_idle_and_drops_watch() {
    let mut clock = Clock::new();
    let mut a = AutoAdvance::default();
    a.set_anchor(0);
    a.on_mutation(typed("tan"), clock.now);
    let fx = a.reset();
    assert_eq!(fx.as_slice(), &[Effect::ClearTimer]);
    assert_eq!(a.phase(), &Phase::Idle);
    assert!(a.on_timer(clock.advance(5000), 3).is_empty());
}
