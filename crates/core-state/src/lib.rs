//! History state: the snapshot tape behind undo/redo and the history browser.
//!
//! The tape is a linear log of whole-buffer snapshots with a position index.
//! Hosts record at meaningful moments (idle typing, word boundaries, pastes,
//! label inserts, case/specimen resets), never per keystroke, so the browser
//! stays legible.
//!
//! Invariants:
//! - Appending while the index is not at the end drops the redo branch.
//! - Text identical to the current entry is never appended.
//! - Capacity evicts the oldest entries; the index keeps pointing at the same
//!   snapshot.
//!
//! Restores hand text back to the caller; they are never recorded. The caller
//! replaces the buffer directly so nothing downstream sees it as typing.

mod diff;
pub mod history;

pub use diff::{DiffStats, diff_stats};
pub use history::{
    HISTORY_CAPACITY, HistoryOutcome, HistorySnapshot, HistoryTape, RecordOutcome, RestoreError,
    SnapshotLabel,
};
