use crate::diff::{DiffStats, diff_stats};
use core_text::content_hash;
use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, trace};

/// Default maximum number of snapshots retained on the tape.
pub const HISTORY_CAPACITY: usize = 500;

/// Why a snapshot was taken. Shown in the history browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotLabel {
    Typed,
    WordBoundary,
    Paste,
    ClipboardPaste,
    BlockInsert,
    DraftLoaded,
    /// Unsaved live text captured right before an undo.
    PreUndo,
    NewCase,
    NewSpecimen,
}

impl SnapshotLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotLabel::Typed => "typed",
            SnapshotLabel::WordBoundary => "word-boundary",
            SnapshotLabel::Paste => "paste",
            SnapshotLabel::ClipboardPaste => "clipboard-paste",
            SnapshotLabel::BlockInsert => "block-insert",
            SnapshotLabel::DraftLoaded => "draft-loaded",
            SnapshotLabel::PreUndo => "pre-undo",
            SnapshotLabel::NewCase => "new-case",
            SnapshotLabel::NewSpecimen => "new-specimen",
        }
    }
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub text: String,
    pub timestamp: SystemTime,
    pub label: SnapshotLabel,
    /// Content hash used for de-duplication.
    pub hash: u64,
    /// Change relative to the entry that was current when this one was recorded.
    pub diff: DiffStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded {
        index: usize,
        /// Redo entries discarded by this append.
        truncated: usize,
        /// Oldest entries evicted by the capacity limit.
        evicted: usize,
    },
    Duplicate,
}

/// Result of moving along the tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Replace the buffer with `text`, caret at its end.
    Restored { index: usize, text: String },
    NothingToUndo,
    NothingToRedo,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("history is empty")]
    Empty,
    #[error("history entry {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

pub struct HistoryTape {
    entries: VecDeque<HistorySnapshot>,
    /// Current entry; `None` only while the tape is empty.
    idx: Option<usize>,
    capacity: usize,
    duplicates_skipped: u64,
}

impl Default for HistoryTape {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl HistoryTape {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            idx: None,
            capacity: capacity.max(1),
            duplicates_skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.idx
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn duplicates_skipped(&self) -> u64 {
        self.duplicates_skipped
    }

    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.idx.and_then(|i| self.entries.get(i))
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &HistorySnapshot> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistorySnapshot> {
        self.entries.get(index)
    }

    pub fn can_undo(&self) -> bool {
        self.idx.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.idx.is_some_and(|i| i + 1 < self.entries.len())
    }

    /// Shrinking evicts from the front immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.idx = None;
    }

    pub fn record(&mut self, text: &str, label: SnapshotLabel, at: SystemTime) -> RecordOutcome {
        let hash = content_hash(text);
        if let Some(cur) = self.current()
            && cur.hash == hash
        {
            self.duplicates_skipped += 1;
            trace!(target: "state.history", idx = ?self.idx, label = label.as_str(), "snapshot_dedupe_skip");
            return RecordOutcome::Duplicate;
        }
        let diff = diff_stats(self.current().map_or("", |c| c.text.as_str()), text);
        let truncated = match self.idx {
            Some(i) => {
                let dropped = self.entries.len() - (i + 1);
                self.entries.truncate(i + 1);
                dropped
            }
            None => 0,
        };
        if truncated > 0 {
            trace!(target: "state.history", truncated, "redo_branch_truncated");
        }
        self.entries.push_back(HistorySnapshot {
            text: text.to_string(),
            timestamp: at,
            label,
            hash,
            diff,
        });
        self.idx = Some(self.entries.len() - 1);
        let evicted = self.evict();
        let index = self.entries.len() - 1;
        trace!(target: "state.history", index, len = self.entries.len(), label = label.as_str(), added = diff.added, removed = diff.removed, "snapshot_recorded");
        RecordOutcome::Recorded {
            index,
            truncated,
            evicted,
        }
    }

    /// Step back one entry. Live text that differs from the current entry is
    /// first captured as `PreUndo` so redo can return to it.
    pub fn undo(&mut self, live: &str, at: SystemTime) -> HistoryOutcome {
        if self.current().is_none_or(|c| c.hash != content_hash(live)) {
            self.record(live, SnapshotLabel::PreUndo, at);
        }
        match self.idx {
            Some(i) if i > 0 => {
                debug!(target: "state.history", from = i, to = i - 1, "undo");
                self.restored(i - 1)
            }
            _ => HistoryOutcome::NothingToUndo,
        }
    }

    pub fn redo(&mut self) -> HistoryOutcome {
        match self.idx {
            Some(i) if i + 1 < self.entries.len() => {
                debug!(target: "state.history", from = i, to = i + 1, "redo");
                self.restored(i + 1)
            }
            _ => HistoryOutcome::NothingToRedo,
        }
    }

    /// Jump to any entry (history browser).
    pub fn restore_to(&mut self, index: usize) -> Result<String, RestoreError> {
        if self.entries.is_empty() {
            return Err(RestoreError::Empty);
        }
        if index >= self.entries.len() {
            return Err(RestoreError::OutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        debug!(target: "state.history", from = ?self.idx, to = index, "restore_to");
        self.idx = Some(index);
        Ok(self.entries[index].text.clone())
    }

    fn restored(&mut self, index: usize) -> HistoryOutcome {
        self.idx = Some(index);
        HistoryOutcome::Restored {
            index,
            text: self.entries[index].text.clone(),
        }
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            self.idx = self.idx.map(|i| i.saturating_sub(evicted));
            trace!(target: "state.history", evicted, "history_trimmed");
        }
        evicted
    }
}
