//! Auto-advance controller.
//!
//! Decides, on every buffer change, whether the field being filled looks
//! finished enough to move to the next field, and learns hold words from
//! the user backing up right after an advance.
//!
//! State machine per field visit:
//!
//! ```text
//! Idle ──set_anchor──▶ Tracking ──qualifying edit──▶ CountingDown
//!   ▲                     ▲  ◀──hold / raw field──────────┘ │
//!   └──reset──────────────┴───────────── timer fired ◀─────┘ (NavigateNext)
//! ```
//!
//! The controller never owns a real timer. Arming produces
//! `Effect::ArmTimer(deadline)`; the host calls [`AutoAdvance::on_timer`] with
//! the current `Instant` and the controller fires only if the armed deadline
//! has passed. Clearing the deadline is total: a cleared timer never fires.
//! All transitions take `now` explicitly so tests drive a virtual clock.

use smallvec::SmallVec;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

mod vocab;

pub use vocab::{
    DEFAULT_CONTINUATION_CHARS, DEFAULT_CONTINUATION_WORDS, HoldVocabulary, MIN_LEARNED_LEN,
    last_token,
};

pub const DEFAULT_DELAY_MS: u64 = 1500;
pub const MIN_DELAY_MS: u64 = 300;
pub const MAX_DELAY_MS: u64 = 8000;
/// Backward moves must happen within this window after an advance to teach a word.
pub const LEARN_WINDOW: Duration = Duration::from_secs(4);
/// Minimum backward distance (characters, exclusive) that counts as backing up.
pub const LEARN_BACKTRACK: usize = 3;

/// Clamp a configured delay to the supported range.
pub fn clamp_delay_ms(ms: u64) -> u64 {
    ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Tracking {
        anchor: usize,
    },
    CountingDown {
        anchor: usize,
        deadline: Instant,
        context_word: Option<String>,
    },
}

impl Phase {
    pub fn anchor(&self) -> Option<usize> {
        match self {
            Phase::Idle => None,
            Phase::Tracking { anchor } | Phase::CountingDown { anchor, .. } => Some(*anchor),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Phase::CountingDown { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }
}

/// Side effects requested by a transition; the host applies them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ArmTimer(Instant),
    ClearTimer,
    /// Move to the next field and call [`AutoAdvance::set_anchor`] with its start.
    NavigateNext,
    /// A hold word was learned; persist preferences.
    Learned(String),
}

pub type Effects = SmallVec<[Effect; 2]>;

/// Snapshot of one buffer mutation as seen by the controller.
#[derive(Debug, Clone, Copy)]
pub struct MutationInput<'a> {
    pub text: &'a str,
    pub caret: usize,
    /// Caret sits inside a bracket placeholder.
    pub inside_field: bool,
}

#[derive(Debug, Clone)]
struct LearnWatch {
    advanced_at: Instant,
    from_pos: usize,
    context_word: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AutoAdvance {
    phase: Phase,
    enabled: bool,
    delay: Duration,
    vocab: HoldVocabulary,
    watch: Option<LearnWatch>,
}

impl Default for AutoAdvance {
    fn default() -> Self {
        Self::new(true, DEFAULT_DELAY_MS, HoldVocabulary::default())
    }
}

impl AutoAdvance {
    pub fn new(enabled: bool, delay_ms: u64, vocab: HoldVocabulary) -> Self {
        Self {
            phase: Phase::Idle,
            enabled,
            delay: Duration::from_millis(clamp_delay_ms(delay_ms)),
            vocab,
            watch: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn anchor(&self) -> Option<usize> {
        self.phase.anchor()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.phase.deadline()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn vocabulary(&self) -> &HoldVocabulary {
        &self.vocab
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    pub fn set_delay_ms(&mut self, ms: u64) {
        self.delay = Duration::from_millis(clamp_delay_ms(ms));
    }

    /// The caret landed on a field (navigation or auto-advance).
    pub fn set_anchor(&mut self, anchor: usize) -> Effects {
        let effects = self.clear_pending();
        self.phase = Phase::Tracking { anchor };
        trace!(target: "advance", anchor, "anchor_set");
        effects
    }

    /// Field abandoned or buffer cleared.
    pub fn reset(&mut self) -> Effects {
        let effects = self.clear_pending();
        self.phase = Phase::Idle;
        self.watch = None;
        effects
    }

    /// The caret left the anchored field. Tracking stops; a learning watch
    /// from the last advance stays open.
    pub fn leave_field(&mut self) -> Effects {
        let effects = self.clear_pending();
        if let Some(anchor) = self.phase.anchor() {
            trace!(target: "advance", anchor, "field_left");
        }
        self.phase = Phase::Idle;
        effects
    }

    /// Turning auto-advance off cancels a pending timer but keeps the anchor
    /// so manual navigation resumes where the user was.
    pub fn set_enabled(&mut self, enabled: bool) -> Effects {
        self.enabled = enabled;
        debug!(target: "advance", enabled, "auto_advance_toggled");
        if enabled {
            return Effects::new();
        }
        match self.phase.anchor() {
            Some(anchor) => self.hold(anchor),
            None => Effects::new(),
        }
    }

    pub fn on_mutation(&mut self, input: MutationInput<'_>, now: Instant) -> Effects {
        let Some(anchor) = self.phase.anchor() else {
            return Effects::new();
        };
        if input.inside_field {
            return self.hold(anchor);
        }
        if !self.enabled {
            return Effects::new();
        }
        let filled = filled_text(input.text, anchor, input.caret);
        let filled = filled.trim();
        if filled.is_empty() || self.vocab.holds(filled) {
            trace!(target: "advance", anchor, filled_len = filled.len(), "hold");
            return self.hold(anchor);
        }
        let deadline = now + self.delay;
        self.phase = Phase::CountingDown {
            anchor,
            deadline,
            context_word: last_token(filled),
        };
        trace!(target: "advance", anchor, delay_ms = self.delay.as_millis() as u64, "timer_armed");
        let mut effects = Effects::new();
        effects.push(Effect::ArmTimer(deadline));
        effects
    }

    /// Host timer callback. Fires only when the armed deadline has passed.
    pub fn on_timer(&mut self, now: Instant, caret: usize) -> Effects {
        let Phase::CountingDown {
            deadline,
            context_word,
            ..
        } = &self.phase
        else {
            return Effects::new();
        };
        if now < *deadline {
            return Effects::new();
        }
        debug!(target: "advance", from_pos = caret, has_context = context_word.is_some(), "auto_advance_fired");
        self.watch = Some(LearnWatch {
            advanced_at: now,
            from_pos: caret,
            context_word: context_word.clone(),
        });
        self.phase = Phase::Idle;
        let mut effects = Effects::new();
        effects.push(Effect::NavigateNext);
        effects
    }

    /// Selection moved. Drives the learning sub-protocol.
    pub fn on_selection(&mut self, caret: usize, focused: bool, now: Instant) -> Effects {
        let Some(watch) = &self.watch else {
            return Effects::new();
        };
        if now.saturating_duration_since(watch.advanced_at) > LEARN_WINDOW {
            self.watch = None;
            return Effects::new();
        }
        if !focused || caret + LEARN_BACKTRACK >= watch.from_pos {
            return Effects::new();
        }
        let word = self.watch.take().and_then(|w| w.context_word);
        let mut effects = Effects::new();
        if let Some(word) = word
            && self.vocab.learn(&word)
        {
            info!(target: "advance", word_len = word.len(), "hold_word_learned");
            effects.push(Effect::Learned(word));
        }
        effects
    }

    pub fn learn(&mut self, word: &str) -> bool {
        self.vocab.learn(word)
    }

    pub fn clear_learned(&mut self) {
        self.vocab.clear_learned();
    }

    fn hold(&mut self, anchor: usize) -> Effects {
        let effects = self.clear_pending();
        self.phase = Phase::Tracking { anchor };
        effects
    }

    fn clear_pending(&mut self) -> Effects {
        let mut effects = Effects::new();
        if matches!(self.phase, Phase::CountingDown { .. }) {
            effects.push(Effect::ClearTimer);
        }
        effects
    }
}

/// Text between the anchor and the caret (empty when the caret is before it).
fn filled_text(text: &str, anchor: usize, caret: usize) -> String {
    if caret <= anchor {
        return String::new();
    }
    text.chars().skip(anchor).take(caret - anchor).collect()
}
