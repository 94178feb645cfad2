//! Replay loop: script directives and ticks drive one session.

use crate::script::{Directive, parse_directive};
use anyhow::Result;
use core_actions::{Action, ActionObserver, Clock, Outcome, Session, dispatch};
use core_events::{AdvanceEvent, AdvanceObserver, Event, InputEvent};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Monotonic time from the tokio clock so paused test runtimes stay
/// deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Collects advance notifications until the runtime prints them.
#[derive(Clone, Default)]
struct Toasts(Rc<RefCell<Vec<String>>>);

impl AdvanceObserver for Toasts {
    fn on_advance(&self, event: &AdvanceEvent) {
        self.0.borrow_mut().push(event.to_string());
    }
}

impl Toasts {
    fn drain(&self) -> Vec<String> {
        self.0.borrow_mut().drain(..).collect()
    }
}

struct ActionTrace;

impl ActionObserver for ActionTrace {
    fn on_action(&self, action: &Action) {
        trace!(target: "runtime.actions", ?action, "action");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub directives: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Stop,
}

pub struct ReplayRuntime<W: Write> {
    session: Session,
    observers: Vec<Box<dyn ActionObserver>>,
    toasts: Toasts,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    out: W,
    draining: bool,
    summary: ReplaySummary,
}

impl<W: Write> ReplayRuntime<W> {
    pub fn new(
        mut session: Session,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
        out: W,
    ) -> Self {
        let toasts = Toasts::default();
        session.add_observer(Box::new(toasts.clone()));
        Self {
            session,
            observers: vec![Box::new(ActionTrace)],
            toasts,
            rx,
            tx: Some(tx),
            source_handles,
            out,
            draining: false,
            summary: ReplaySummary::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub async fn run(&mut self) -> Result<ReplaySummary> {
        info!(target: "runtime", "replay_start");
        while let Some(event) = self.rx.recv().await {
            let control = match event {
                Event::Input(InputEvent::Directive(line)) => self.handle_directive(&line)?,
                Event::Input(InputEvent::EndOfInput) => {
                    debug!(target: "runtime", "end_of_input");
                    self.draining = true;
                    self.settle_check()
                }
                Event::Tick => {
                    let outcomes = self.session.tick();
                    self.report(&outcomes)?;
                    self.settle_check()
                }
            };
            if control == LoopControl::Stop {
                break;
            }
        }
        self.finalize_shutdown().await;
        info!(
            target: "runtime",
            directives = self.summary.directives,
            errors = self.summary.errors,
            "replay_complete"
        );
        Ok(self.summary)
    }

    /// Write the final buffer, framed, after the replay ends.
    pub fn write_final(&mut self) -> Result<()> {
        writeln!(self.out, "--- final ---")?;
        writeln!(self.out, "{}", self.session.text())?;
        Ok(())
    }

    fn handle_directive(&mut self, line: &str) -> Result<LoopControl> {
        let directive = match parse_directive(line) {
            Ok(Some(d)) => d,
            Ok(None) => return Ok(LoopControl::Continue),
            Err(e) => {
                warn!(target: "runtime.script", error = %e, "directive_rejected");
                self.summary.errors += 1;
                writeln!(self.out, "error: {e}")?;
                return Ok(LoopControl::Continue);
            }
        };
        self.summary.directives += 1;
        match directive {
            Directive::Apply(action) => {
                let outcomes = dispatch(action, &mut self.session, &self.observers);
                self.report(&outcomes)?;
            }
            Directive::Print => {
                writeln!(self.out, "{}", self.session.text())?;
            }
            Directive::History => self.write_history()?,
            Directive::Map => {
                let progress = self
                    .session
                    .field_progress()
                    .map_or_else(|| "-".to_string(), |p| p.to_string());
                writeln!(self.out, "blocks: {}", self.session.block_map())?;
                writeln!(self.out, "field: {progress}")?;
            }
            // Consumed by the script source.
            Directive::Wait(_) => {}
        }
        Ok(LoopControl::Continue)
    }

    fn report(&mut self, outcomes: &[Outcome]) -> Result<()> {
        for toast in self.toasts.drain() {
            writeln!(self.out, "advance {toast}")?;
        }
        for outcome in outcomes {
            match outcome {
                // Printed via the toast observer.
                Outcome::Advanced(_) => {}
                Outcome::AutoAdvanced(field) => {
                    writeln!(self.out, "auto-advance to {}..{}", field.start, field.end)?
                }
                Outcome::FieldSelected(field) => {
                    writeln!(self.out, "field {}..{}", field.start, field.end)?
                }
                Outcome::Restored { index } => writeln!(self.out, "restored #{index}")?,
                Outcome::InsertUndone => writeln!(self.out, "insert undone")?,
                Outcome::SnapshotTaken { index } => {
                    debug!(target: "runtime", index, "idle_snapshot")
                }
                other => {
                    if let Some(notice) = other.notice() {
                        writeln!(self.out, "! {notice}")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_history(&mut self) -> Result<()> {
        for row in self.session.history_entries() {
            let marker = if row.current { '*' } else { ' ' };
            writeln!(
                self.out,
                "{marker}{:>3} {:<15} {:>9} {} chars",
                row.index,
                row.label.as_str(),
                row.diff.to_string(),
                row.chars
            )?;
        }
        Ok(())
    }

    fn settle_check(&self) -> LoopControl {
        let pending =
            self.session.advance().deadline().is_some() || self.session.scheduler().deadline().is_some();
        if self.draining && !pending {
            LoopControl::Stop
        } else {
            LoopControl::Continue
        }
    }

    async fn finalize_shutdown(&mut self) {
        self.tx.take();
        self.rx.close();
        for handle in self.source_handles.drain(..) {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(())) => {
                    trace!(target: "runtime.shutdown", "source_task_joined")
                }
                Ok(Err(e)) => {
                    warn!(target: "runtime.shutdown", error = %e, "source_task_join_error")
                }
                Err(_) => {
                    warn!(target: "runtime.shutdown", "source_task_join_timeout")
                }
            }
        }
    }
}
