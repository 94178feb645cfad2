#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{Clock, Session};
use core_config::{MemoryStore, PreferenceStore, Preferences};
use core_events::{AdvanceEvent, AdvanceObserver};
use core_text::Buffer;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime};

/// Virtual clock shared between a test and the session it drives.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
    wall: Rc<Cell<SystemTime>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
            wall: Rc::new(Cell::new(SystemTime::UNIX_EPOCH)),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        let d = Duration::from_millis(ms);
        self.now.set(self.now.get() + d);
        self.wall.set(self.wall.get() + d);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn wall(&self) -> SystemTime {
        self.wall.get()
    }
}

/// Collects every advance notification.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<AdvanceEvent>>>,
}

impl AdvanceObserver for Recorder {
    fn on_advance(&self, event: &AdvanceEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

pub fn session_with(text: &str, prefs: Preferences) -> (Session<Buffer>, ManualClock) {
    session_with_store(text, Box::new(MemoryStore::new(prefs)))
}

pub fn session_with_store(
    text: &str,
    store: Box<dyn PreferenceStore>,
) -> (Session<Buffer>, ManualClock) {
    let clock = ManualClock::new();
    let session = Session::new(Buffer::new(text), store, Box::new(clock.clone()));
    (session, clock)
}

pub fn session(text: &str) -> (Session<Buffer>, ManualClock) {
    session_with(text, Preferences::default())
}

/// Type `text` with `gap_ms` between keystrokes, ticking before each one.
pub fn dictate(session: &mut Session<Buffer>, clock: &ManualClock, text: &str, gap_ms: u64) {
    for c in text.chars() {
        clock.advance_ms(gap_ms);
        session.tick();
        session.type_char(c);
    }
}
