//! Reentrancy guard for programmatic edits.
//!
//! Components that splice the buffer themselves arm the guard with the text
//! they are about to produce. The next mutation notification is swallowed only
//! when the buffer still hashes to that text; any other notification disarms
//! the guard and is processed normally. Hosts that never echo programmatic
//! edits therefore cannot lose a real keystroke to a stale flag.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tracing::trace;

/// Content hash used for echo detection and snapshot de-duplication.
pub fn content_hash(text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    h.write(text.as_bytes());
    h.finish()
}

#[derive(Debug, Default, Clone)]
pub struct EchoGuard {
    pending: Option<u64>,
}

impl EchoGuard {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Expect the next notification to report `text_after`.
    pub fn arm(&mut self, text_after: &str) {
        self.pending = Some(content_hash(text_after));
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn disarm(&mut self) {
        self.pending = None;
    }

    /// Consume the armed expectation. Returns `true` when `text` is the echo
    /// of the programmatic edit and should be ignored.
    pub fn take_if_echo(&mut self, text: &str) -> bool {
        match self.pending.take() {
            Some(h) if h == content_hash(text) => {
                trace!(target: "text.echo", len = text.len(), "echo_suppressed");
                true
            }
            _ => false,
        }
    }
}
