//! Idle-snapshot debounce for the history tape.

use std::time::{Duration, Instant};
use tracing::trace;

/// Single pending deadline; each qualifying edit restarts it. Cancelling is
/// total: a cancelled deadline never reports due.
#[derive(Debug, Clone)]
pub struct SnapshotScheduler {
    idle: Duration,
    deadline: Option<Instant>,
}

impl SnapshotScheduler {
    pub fn new(idle_ms: u64) -> Self {
        Self {
            idle: Duration::from_millis(idle_ms),
            deadline: None,
        }
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn bump(&mut self, now: Instant) {
        self.deadline = Some(now + self.idle);
        trace!(target: "actions.history", idle_ms = self.idle.as_millis() as u64, "idle_snapshot_armed");
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Consume the deadline when it has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
