//! Event types shared by the dictation automaton and its hosts.
//!
//! Two layers live here:
//! * Host notifications (`EditKind`, `HostEvent`) and the outward
//!   `AdvanceEvent` the increment engine emits. These are synchronous and
//!   carry no runtime dependency.
//! * The async plumbing the replay binary uses (`Event`, `AsyncEventSource`,
//!   `EventSourceRegistry`, `TickEventSource`). The automaton itself never
//!   awaits; timers are deadlines polled on `Event::Tick`.

use std::fmt;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Bounded channel capacity for the runtime event loop.
pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Kind of native edit the host already applied before notifying the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Ordinary typed text (one or more characters, no newline).
    PlainInsert,
    /// A newline / paragraph break was inserted.
    Newline,
    /// Paste or drop.
    Paste,
    /// Deletions and anything else.
    Other,
}

/// Notifications a host delivers after its own state already changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Mutated(EditKind),
    SelectionChanged,
}

/// What produced an advance notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvanceKind {
    /// Next block within the current group (`A1` → `A2`).
    Block,
    /// First block of the next group (`A3` → `B1`).
    Group,
}

/// Emitted whenever the increment engine splices a label into the buffer.
///
/// `from_label` / `to_label` carry the block component of the label (the
/// number in `A1`, the suffix in `1A`); `prefix` is the full inserted label
/// including its separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceEvent {
    pub prefix: String,
    pub from_label: Option<String>,
    pub to_label: String,
    pub was_range: bool,
    pub was_placeholder: bool,
    pub kind: AdvanceKind,
}

impl fmt::Display for AdvanceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from_label {
            Some(from) => write!(f, "{} → {} ({})", from, self.to_label, self.prefix.trim_end()),
            None => write!(f, "→ {} ({})", self.to_label, self.prefix.trim_end()),
        }
    }
}

/// Collaborators interested in advance notifications (footer, toasts,
/// batch-mode cursor adjustment). Observers must not block.
pub trait AdvanceObserver {
    fn on_advance(&self, event: &AdvanceEvent);
}

// -------------------------------------------------------------------------------------------------
// Runtime events (replay binary)
// -------------------------------------------------------------------------------------------------

/// Top-level event consumed by the runtime loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    /// Periodic monotonic tick used to fire expired debounce deadlines.
    Tick,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    /// One raw directive line, interpreted by the binary's script layer.
    Directive(String),
    /// The script source finished; the loop drains pending timers then exits.
    EndOfInput,
}

/// Trait implemented by any async event producer. Each source spawns one
/// task pushing `Event`s into the shared channel and stops when the channel
/// closes.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources. Each source receives its own `Sender`
    /// clone; the caller drops its final clone at shutdown so sources observe
    /// the closed channel and exit.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Emits `Event::Tick` every configured interval.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}
