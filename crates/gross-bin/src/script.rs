//! Directive scripts: one command per line, `#` comments.
//!
//! Text arguments keep their leading spaces and accept `\n`, `\t` and `\\`
//! escapes so multi-line templates fit on one line.

use core_actions::Action;
use core_events::{AsyncEventSource, Event, InputEvent};
use core_grammar::NumberingFormat;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Apply(Action),
    /// Pause the script; timers keep firing meanwhile.
    Wait(u64),
    History,
    Print,
    Map,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown directive `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{directive}` expects a number, got `{value}`")]
    InvalidNumber {
        directive: &'static str,
        value: String,
    },
    #[error("{0}")]
    InvalidFormat(String),
    #[error("`{directive}` expects on or off, got `{value}`")]
    InvalidToggle {
        directive: &'static str,
        value: String,
    },
}

/// Parse one script line. Blank lines and comments yield `None`.
pub fn parse_directive(line: &str) -> Result<Option<Directive>, ScriptError> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let action = match word {
        "type" => Action::Type(text_arg("type", rest)?),
        "enter" => Action::Newline,
        "backspace" => Action::Backspace(if rest.trim().is_empty() {
            1
        } else {
            number("backspace", rest)?
        }),
        "paste" => Action::Paste(text_arg("paste", rest)?),
        "clip" => Action::PasteClipboard(text_arg("clip", rest)?),
        "select" => {
            let mut parts = rest.split_whitespace();
            let start = number("select", parts.next().unwrap_or(""))?;
            let end = number("select", parts.next().unwrap_or(""))?;
            Action::Select { start, end }
        }
        "caret" => Action::Caret(number("caret", rest)?),
        "next" => Action::NextField,
        "prev" => Action::PrevField,
        "block" => Action::InsertNextBlock,
        "group" => Action::InsertNextGroup,
        "undo-insert" => Action::UndoInsert,
        "undo" => Action::Undo,
        "redo" => Action::Redo,
        "restore" => Action::Restore(number("restore", rest)?),
        "format" => Action::SetFormat(
            rest.parse::<NumberingFormat>()
                .map_err(ScriptError::InvalidFormat)?,
        ),
        "auto" => Action::SetAutoAdvance(toggle("auto", rest)?),
        "focus" => Action::SetFocus(toggle("focus", rest)?),
        "delay" => Action::SetAdvanceDelay(number("delay", rest)?),
        "forget" => Action::ClearLearnedWords,
        "draft" => Action::LoadDraft(unescape(rest)),
        "new-case" => Action::NewCase,
        "specimen" => Action::NewSpecimen(text_arg("specimen", rest)?),
        "tick" => Action::Tick,
        "wait" => return Ok(Some(Directive::Wait(number("wait", rest)?))),
        "history" => return Ok(Some(Directive::History)),
        "print" => return Ok(Some(Directive::Print)),
        "map" => return Ok(Some(Directive::Map)),
        other => return Err(ScriptError::Unknown(other.to_string())),
    };
    Ok(Some(Directive::Apply(action)))
}

fn text_arg(directive: &'static str, rest: &str) -> Result<String, ScriptError> {
    if rest.is_empty() {
        return Err(ScriptError::MissingArgument(directive));
    }
    Ok(unescape(rest))
}

fn toggle(directive: &'static str, raw: &str) -> Result<bool, ScriptError> {
    match raw.trim() {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(ScriptError::InvalidToggle {
            directive,
            value: other.to_string(),
        }),
    }
}

fn number<T: std::str::FromStr>(directive: &'static str, raw: &str) -> Result<T, ScriptError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScriptError::MissingArgument(directive));
    }
    raw.parse().map_err(|_| ScriptError::InvalidNumber {
        directive,
        value: raw.to_string(),
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Feeds script lines into the runtime channel. `wait` is honoured here so
/// tick events keep flowing while the script pauses.
pub struct ScriptSource {
    text: String,
}

impl ScriptSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl AsyncEventSource for ScriptSource {
    fn name(&self) -> &'static str {
        "script"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for line in self.text.lines() {
                if let Ok(Some(Directive::Wait(ms))) = parse_directive(line) {
                    debug!(target: "runtime.script", ms, "script_wait");
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    continue;
                }
                let event = Event::Input(InputEvent::Directive(line.to_string()));
                if tx.send(event).await.is_err() {
                    warn!(target: "runtime.script", "script_channel_closed");
                    return;
                }
            }
            let _ = tx.send(Event::Input(InputEvent::EndOfInput)).await;
        })
    }
}
