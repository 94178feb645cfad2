//! Ordered table of tagged line matchers.
//!
//! Patterns overlap (`A5-10-` also starts with the single label `A5-`), so
//! each format owns a fixed-priority list: Range, Single, Indented,
//! Placeholder. The first matcher whose regex matches decides the line; a
//! malformed range is rejected outright rather than falling through to the
//! single-label matcher.

use crate::label::{Label, NumberingFormat};
use crate::{LineClass, ParsedLabel, PlaceholderToken};
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::trace;

/// Tab, hyphen, en dash, em dash, colon with optional space, or a plain space.
const SEP: &str = r"(\t|-|–|—|: ?| )";
const DASH: &str = r"[-–—]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatcherKind {
    Range,
    Single,
    Indented,
    Placeholder,
}

struct Matcher {
    kind: MatcherKind,
    regex: Regex,
}

fn compile(kind: MatcherKind, pattern: String) -> Matcher {
    Matcher {
        kind,
        regex: Regex::new(&pattern).expect("label patterns are static and valid"),
    }
}

fn placeholder() -> Matcher {
    compile(MatcherKind::Placeholder, format!(r"^(\[[\s_]*\]){SEP}"))
}

static LETTER_NUMBER: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        compile(
            MatcherKind::Range,
            format!(r"^([A-Z])(\d+){DASH}([A-Z])?(\d+){SEP}"),
        ),
        compile(MatcherKind::Single, format!(r"^([A-Z])(\d+){SEP}")),
        compile(MatcherKind::Indented, format!(r"^[ \t]+([A-Z])(\d+){SEP}")),
        placeholder(),
    ]
});

static NUMBER_LETTER: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    vec![
        compile(
            MatcherKind::Range,
            format!(r"^(\d+)([A-Z]{{1,2}}){DASH}(\d+)?([A-Z]{{1,2}}){SEP}"),
        ),
        compile(MatcherKind::Single, format!(r"^(\d+)([A-Z]{{1,2}}){SEP}")),
        compile(
            MatcherKind::Indented,
            format!(r"^[ \t]+(\d+)([A-Z]{{1,2}}){SEP}"),
        ),
        placeholder(),
    ]
});

fn table(format: NumberingFormat) -> &'static [Matcher] {
    match format {
        NumberingFormat::LetterNumber => &LETTER_NUMBER,
        NumberingFormat::NumberLetter => &NUMBER_LETTER,
    }
}

/// Classify one line (without its newline).
pub(crate) fn classify(line: &str, format: NumberingFormat) -> LineClass {
    for matcher in table(format) {
        if let Some(caps) = matcher.regex.captures(line) {
            return build(matcher.kind, format, &caps);
        }
    }
    LineClass::None
}

fn raw_len(caps: &Captures<'_>) -> usize {
    caps.get(0).map(|m| m.as_str().chars().count()).unwrap_or(0)
}

fn text<'a>(caps: &Captures<'a>, idx: usize) -> Option<&'a str> {
    caps.get(idx).map(|m| m.as_str())
}

fn make_label(format: NumberingFormat, primary: &str, secondary: &str) -> Option<Label> {
    match format {
        NumberingFormat::LetterNumber => Some(Label::LetterNumber {
            letter: primary.chars().next()?,
            number: secondary.parse().ok()?,
        }),
        NumberingFormat::NumberLetter => Some(Label::NumberLetter {
            number: primary.parse().ok()?,
            suffix: secondary.to_string(),
        }),
    }
}

fn build(kind: MatcherKind, format: NumberingFormat, caps: &Captures<'_>) -> LineClass {
    let built = match kind {
        MatcherKind::Placeholder => {
            let bracket = text(caps, 1).unwrap_or_default();
            return LineClass::Placeholder(PlaceholderToken {
                bracket_len: bracket.chars().count(),
                raw_len: raw_len(caps),
                separator: text(caps, 2).unwrap_or_default().to_string(),
            });
        }
        MatcherKind::Single | MatcherKind::Indented => single(format, caps),
        MatcherKind::Range => range(format, caps),
    };
    match (kind, built) {
        (MatcherKind::Single, Some(p)) => LineClass::Single(p),
        (MatcherKind::Indented, Some(p)) => LineClass::Indented(p),
        (MatcherKind::Range, Some(p)) => LineClass::Range(p),
        _ => LineClass::None,
    }
}

fn single(format: NumberingFormat, caps: &Captures<'_>) -> Option<ParsedLabel> {
    let label = make_label(format, text(caps, 1)?, text(caps, 2)?)?;
    Some(ParsedLabel {
        label,
        range_start: None,
        separator: text(caps, 3)?.to_string(),
        raw_len: raw_len(caps),
    })
}

fn range(format: NumberingFormat, caps: &Captures<'_>) -> Option<ParsedLabel> {
    let start_primary = text(caps, 1)?;
    let start = make_label(format, start_primary, text(caps, 2)?)?;
    // Letter-number: optional end letter (group 3), end number (group 4).
    // Number-letter: optional end number (group 3), end suffix (group 4).
    let end = make_label(format, text(caps, 3).unwrap_or(start_primary), text(caps, 4)?)?;
    if start.cmp_within_group(&end) == Some(Ordering::Greater) {
        trace!(target: "grammar", start = %start, end = %end, "range_rejected_end_before_start");
        return None;
    }
    Some(ParsedLabel {
        label: end,
        range_start: Some(start),
        separator: text(caps, 5)?.to_string(),
        raw_len: raw_len(caps),
    })
}
