//! Hold heuristics: when does a partially filled field look unfinished.

use std::collections::BTreeSet;

pub const DEFAULT_CONTINUATION_CHARS: [char; 2] = [',', '.'];

/// Articles, conjunctions and prepositions that signal more dictation follows.
pub const DEFAULT_CONTINUATION_WORDS: [&str; 24] = [
    "a", "an", "the", "and", "or", "but", "nor", "of", "with", "without", "to", "in", "on", "at",
    "for", "from", "by", "into", "onto", "over", "under", "per", "than", "as",
];

/// Learned words shorter than this are ignored.
pub const MIN_LEARNED_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldVocabulary {
    continuation_chars: BTreeSet<char>,
    continuation_words: BTreeSet<String>,
    learned_words: BTreeSet<String>,
}

impl Default for HoldVocabulary {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONTINUATION_CHARS,
            DEFAULT_CONTINUATION_WORDS.iter().map(|w| w.to_string()),
            std::iter::empty(),
        )
    }
}

impl HoldVocabulary {
    pub fn new(
        chars: impl IntoIterator<Item = char>,
        words: impl IntoIterator<Item = String>,
        learned: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            continuation_chars: chars.into_iter().collect(),
            continuation_words: words.into_iter().map(|w| normalize(&w)).collect(),
            learned_words: learned.into_iter().map(|w| normalize(&w)).collect(),
        }
    }

    pub fn continuation_chars(&self) -> &BTreeSet<char> {
        &self.continuation_chars
    }

    pub fn continuation_words(&self) -> &BTreeSet<String> {
        &self.continuation_words
    }

    pub fn learned_words(&self) -> &BTreeSet<String> {
        &self.learned_words
    }

    /// Held when `filled` ends with a continuation character or its last
    /// token is a continuation or learned word.
    pub fn holds(&self, filled: &str) -> bool {
        let trimmed = filled.trim_end();
        if trimmed
            .chars()
            .last()
            .is_some_and(|c| self.continuation_chars.contains(&c))
        {
            return true;
        }
        last_token(trimmed).is_some_and(|t| self.is_known(&t))
    }

    /// Already held by any set.
    pub fn is_known(&self, word: &str) -> bool {
        let w = normalize(word);
        self.continuation_words.contains(&w) || self.learned_words.contains(&w)
    }

    /// Add a learned hold word. Returns `false` for short or known words.
    pub fn learn(&mut self, word: &str) -> bool {
        let w = normalize(word);
        if w.chars().count() < MIN_LEARNED_LEN || self.is_known(&w) {
            return false;
        }
        self.learned_words.insert(w)
    }

    /// Explicit user action; the only way learned words shrink.
    pub fn clear_learned(&mut self) {
        self.learned_words.clear();
    }
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Last whitespace-delimited token with trailing punctuation stripped,
/// lower-cased. `None` when nothing word-like remains.
pub fn last_token(filled: &str) -> Option<String> {
    let raw = filled.split_whitespace().last()?;
    let stripped = raw.trim_end_matches(|c: char| c.is_ascii_punctuation());
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_lowercase())
    }
}
