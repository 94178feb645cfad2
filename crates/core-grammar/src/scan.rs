//! Line scans over a whole buffer: backward block search and the block map.

use crate::label::NumberingFormat;
use crate::{LineClass, ParsedLabel, classify_line};
use std::fmt;

/// Nearest label line at or above `from_line`, skipping every line that
/// does not drive the counter (prose, indented sub-lines, placeholders).
/// Returns the line index with the parsed label.
pub fn find_last_block(
    text: &str,
    from_line: usize,
    format: NumberingFormat,
) -> Option<(usize, ParsedLabel)> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.is_empty() {
        return None;
    }
    let start = from_line.min(lines.len() - 1);
    (0..=start)
        .rev()
        .find_map(|i| classify_line(lines[i], format).into_block().map(|p| (i, p)))
}

/// The label governing a fresh line at `line_idx`: the nearest line strictly
/// above it that is non-blank, non-indented and not a placeholder must be a
/// label line. Any other intervening line (prose) yields `None`.
pub fn preceding_block(text: &str, line_idx: usize, format: NumberingFormat) -> Option<ParsedLabel> {
    let lines: Vec<&str> = text.split('\n').collect();
    let upto = line_idx.min(lines.len());
    for i in (0..upto).rev() {
        let line = lines[i];
        if line.trim().is_empty() {
            continue;
        }
        match classify_line(line, format) {
            LineClass::Indented(_) | LineClass::Placeholder(_) => continue,
            LineClass::Single(p) | LineClass::Range(p) => return Some(p),
            LineClass::None => return None,
        }
    }
    None
}

/// One label line as shown by the block map / footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub line: usize,
    pub label: String,
    pub description: String,
    pub is_range: bool,
}

/// Every label line of a buffer in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMap {
    pub entries: Vec<BlockEntry>,
}

impl BlockMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for BlockMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("no blocks detected");
        }
        let labels: Vec<&str> = self.entries.iter().map(|e| e.label.as_str()).collect();
        f.write_str(&labels.join(", "))
    }
}

/// Build the block map for `text` under the active format.
pub fn block_map(text: &str, format: NumberingFormat) -> BlockMap {
    let entries = text
        .split('\n')
        .enumerate()
        .filter_map(|(line, s)| {
            let parsed = classify_line(s, format).into_block()?;
            let description: String = s.chars().skip(parsed.raw_len).collect();
            Some(BlockEntry {
                line,
                label: parsed.display_label(),
                description: description.trim().to_string(),
                is_range: parsed.is_range(),
            })
        })
        .collect();
    BlockMap { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LN: NumberingFormat = NumberingFormat::LetterNumber;

    #[test]
    fn last_block_skips_prose_indented_and_placeholders() {
        let text = "A1-skin\nA2-fat\n  A9-sub finding\n[__]-pending\nmore prose\n";
        let (line, p) = find_last_block(text, 5, LN).unwrap();
        assert_eq!(line, 1);
        assert_eq!(p.label.to_string(), "A2");
    }

    #[test]
    fn preceding_block_requires_adjacent_label() {
        let text = "A1-skin\n\n  A1-sub\n";
        assert_eq!(
            preceding_block(text, 3, LN).map(|p| p.label.to_string()),
            Some("A1".to_string())
        );
        let prose = "A1-skin\nfurther description\n";
        assert_eq!(preceding_block(prose, 2, LN), None);
        assert_eq!(preceding_block("", 0, LN), None);
    }

    #[test]
    fn block_map_lists_labels_with_descriptions() {
        let map = block_map("A1-skin\nnotes\nA2–A4 tumor\n", LN);
        assert_eq!(map.len(), 2);
        assert_eq!(map.entries[1].label, "A2–A4");
        assert_eq!(map.entries[1].description, "tumor");
        assert_eq!(map.to_string(), "A1, A2–A4");
        assert_eq!(block_map("1A-x", LN).to_string(), "no blocks detected");
    }
}
