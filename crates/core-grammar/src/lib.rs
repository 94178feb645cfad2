//! Cassette label grammar.
//!
//! Pure parsing functions with no mutable state: recognize a line as a block
//! label, a block range, an indented sub-line, or a bracket placeholder, in
//! either numbering format, and compute the label that follows.
//!
//! Classification is an ordered list of tagged matchers (see `matchers`)
//! returning a [`LineClass`]. Only `Single` and `Range` lines drive the
//! increment counter; `Indented` lines are informational sub-findings and
//! `Placeholder` lines are template slots awaiting a label.
//!
//! A line written under one format reads as [`LineClass::None`] under the
//! other. Switching formats mid-session never reparses existing text.

mod label;
mod matchers;
pub mod scan;

pub use label::{Label, NumberingFormat, next_letter_suffix, suffix_order};
pub use scan::{BlockEntry, BlockMap, block_map, find_last_block, preceding_block};

/// A label line matched against the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    /// Effective label: the end of a range, or the single label.
    pub label: Label,
    /// Start of the range when the line is a range (`A5` in `A5-A10-`).
    pub range_start: Option<Label>,
    /// Separator text that followed the label.
    pub separator: String,
    /// Characters consumed by the match; descriptive text starts here.
    pub raw_len: usize,
}

impl ParsedLabel {
    pub fn is_range(&self) -> bool {
        self.range_start.is_some()
    }

    pub fn format(&self) -> NumberingFormat {
        self.label.format()
    }

    pub fn primary(&self) -> String {
        self.label.primary()
    }

    pub fn secondary(&self) -> String {
        self.label.secondary()
    }

    /// Human readable label, `A5–A10` for ranges.
    pub fn display_label(&self) -> String {
        match &self.range_start {
            Some(start) => format!("{start}–{}", self.label),
            None => self.label.to_string(),
        }
    }
}

/// Line-start bracket placeholder (`[___]-`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// Characters spanned by the brackets themselves.
    pub bracket_len: usize,
    /// Brackets plus trailing separator.
    pub raw_len: usize,
    pub separator: String,
}

/// Tagged result of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Single(ParsedLabel),
    Range(ParsedLabel),
    Indented(ParsedLabel),
    Placeholder(PlaceholderToken),
    None,
}

impl LineClass {
    /// The label when this line drives the counter.
    pub fn block(&self) -> Option<&ParsedLabel> {
        match self {
            LineClass::Single(p) | LineClass::Range(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_block(self) -> Option<ParsedLabel> {
        match self {
            LineClass::Single(p) | LineClass::Range(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, LineClass::Placeholder(_))
    }
}

/// Classify a single line (without its trailing newline).
pub fn classify_line(line: &str, format: NumberingFormat) -> LineClass {
    matchers::classify(line, format)
}

/// Parse a line that drives the counter: a single label or a valid range.
pub fn parse_line(line: &str, format: NumberingFormat) -> Option<ParsedLabel> {
    classify_line(line, format).into_block()
}

/// Label and separator for the block immediately after `parsed`.
pub fn next_label(parsed: &ParsedLabel) -> String {
    format!("{}{}", parsed.label.next_block(), parsed.separator)
}

/// First label of the next group, reusing the separator. `None` when the
/// group component cannot advance (specimen `Z`).
pub fn next_group_label(parsed: &ParsedLabel) -> Option<String> {
    parsed
        .label
        .next_group()
        .map(|l| format!("{l}{}", parsed.separator))
}

/// First label of a fresh report (`A1` / `1A`) with the given separator.
pub fn first_label(format: NumberingFormat, separator: &str) -> String {
    format!("{}{separator}", Label::first(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LN: NumberingFormat = NumberingFormat::LetterNumber;
    const NL: NumberingFormat = NumberingFormat::NumberLetter;

    #[test]
    fn single_block_every_separator() {
        for sep in ["\t", "-", "–", "—", ": ", ":", " "] {
            let line = format!("A7{sep}fatty tissue");
            let p = parse_line(&line, LN).unwrap_or_else(|| panic!("no match for {line:?}"));
            assert_eq!(p.separator, sep);
            assert_eq!(p.raw_len, 2 + sep.chars().count());
            assert_eq!(next_label(&p), format!("A8{sep}"));
        }
    }

    #[test]
    fn colon_prefers_trailing_space() {
        let p = parse_line("B2: margin", LN).unwrap();
        assert_eq!(p.separator, ": ");
        assert_eq!(next_label(&p), "B3: ");
    }

    #[test]
    fn ranges_share_effective_next_label() {
        let a = parse_line("A5-A10-", LN).unwrap();
        let b = parse_line("A5-10-", LN).unwrap();
        assert!(a.is_range() && b.is_range());
        assert_eq!(next_label(&a), "A11-");
        assert_eq!(next_label(&b), "A11-");
        assert_eq!(a.display_label(), "A5–A10");
    }

    #[test]
    fn malformed_range_is_rejected_not_truncated() {
        assert_eq!(parse_line("B3-B1-", LN), None);
        assert_eq!(classify_line("B3-B1-", LN), LineClass::None);
    }

    #[test]
    fn cross_group_range_uses_end_label() {
        let p = parse_line("A5–B2 tissue", LN).unwrap();
        assert_eq!(next_label(&p), "B3 ");
    }

    #[test]
    fn indented_and_placeholder_lines_do_not_drive_counter() {
        assert!(matches!(classify_line("  A3-note", LN), LineClass::Indented(_)));
        assert_eq!(parse_line("  A3-note", LN), None);
        match classify_line("[___]-tumor", LN) {
            LineClass::Placeholder(t) => {
                assert_eq!(t.bracket_len, 5);
                assert_eq!(t.raw_len, 6);
                assert_eq!(t.separator, "-");
            }
            other => panic!("expected placeholder, got {other:?}"),
        }
        assert!(classify_line("[ _ ]\tx", NL).is_placeholder());
        assert!(!classify_line("[x]-y", LN).is_placeholder());
    }

    #[test]
    fn number_letter_format() {
        let p = parse_line("1Z-skin", NL).unwrap();
        assert_eq!(next_label(&p), "1AA-");
        let p = parse_line("2AZ: x", NL).unwrap();
        assert_eq!(next_label(&p), "2BA: ");
        assert_eq!(next_group_label(&p).unwrap(), "3A: ");
        let r = parse_line("3A-C\tsections", NL).unwrap();
        assert_eq!(r.range_start.as_ref().map(|l| l.to_string()).as_deref(), Some("3A"));
        assert_eq!(next_label(&r), "3D\t");
        assert_eq!(parse_line("3C-3A ", NL), None);
    }

    #[test]
    fn formats_do_not_cross_parse() {
        assert_eq!(parse_line("A1-x", NL), None);
        assert_eq!(parse_line("1A-x", LN), None);
    }

    #[test]
    fn lowercase_and_prose_are_not_labels() {
        assert_eq!(parse_line("a1-x", LN), None);
        assert_eq!(parse_line("3cm mass", NL), None);
        assert_eq!(parse_line("The specimen", LN), None);
    }

    #[test]
    fn group_label_and_first_label() {
        let p = parse_line("C4-x", LN).unwrap();
        assert_eq!(next_group_label(&p).unwrap(), "D1-");
        assert_eq!(first_label(LN, "-"), "A1-");
        assert_eq!(first_label(NL, "\t"), "1A\t");
        let z = parse_line("Z9-x", LN).unwrap();
        assert_eq!(next_group_label(&z), None);
    }
}
