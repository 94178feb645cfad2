//! Prefix/suffix diff heuristic for history summaries.
//!
//! O(n): strips the common prefix and the common suffix and reports the
//! unmatched middle of each side. Not a minimal diff; transpositions are
//! over-reported. Good for a `+12 −3` label, not for patches.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Characters only present in the new text.
    pub added: usize,
    /// Characters only present in the old text.
    pub removed: usize,
}

impl DiffStats {
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} \u{2212}{}", self.added, self.removed)
    }
}

pub fn diff_stats(old: &str, new: &str) -> DiffStats {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let max_suffix = a.len().min(b.len()) - prefix;
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();
    DiffStats {
        added: b.len() - prefix - suffix,
        removed: a.len() - prefix - suffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_in_the_middle() {
        let d = diff_stats("A1-skin", "A1-tan skin");
        assert_eq!(d, DiffStats { added: 4, removed: 0 });
        assert_eq!(d.to_string(), "+4 \u{2212}0");
    }

    #[test]
    fn replacement_counts_both_sides() {
        let d = diff_stats("firm mass", "soft mass");
        assert_eq!(d, DiffStats { added: 4, removed: 4 });
    }

    #[test]
    fn repeated_characters_do_not_overlap() {
        // prefix and suffix must not claim the same characters
        assert_eq!(diff_stats("aaa", "aaaa"), DiffStats { added: 1, removed: 0 });
        assert_eq!(diff_stats("aaaa", "aa"), DiffStats { added: 0, removed: 2 });
    }

    #[test]
    fn transposition_is_over_reported() {
        assert_eq!(diff_stats("ab", "ba"), DiffStats { added: 2, removed: 2 });
    }

    #[test]
    fn identical_is_unchanged() {
        assert!(diff_stats("µm", "µm").is_unchanged());
    }
}
