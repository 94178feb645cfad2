//! Label values and the increment rules for both numbering formats.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Session-wide numbering format. Switching it never reparses existing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberingFormat {
    /// `A1`, `A2`, … `B1`: specimen letter + block number.
    #[default]
    LetterNumber,
    /// `1A`, `1B`, … `2A`: specimen number + block letter suffix.
    NumberLetter,
}

impl fmt::Display for NumberingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingFormat::LetterNumber => f.write_str("letter-number"),
            NumberingFormat::NumberLetter => f.write_str("number-letter"),
        }
    }
}

impl std::str::FromStr for NumberingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter-number" | "letternumber" | "a1" => Ok(NumberingFormat::LetterNumber),
            "number-letter" | "numberletter" | "1a" => Ok(NumberingFormat::NumberLetter),
            other => Err(format!("unknown numbering format `{other}`")),
        }
    }
}

/// A single cassette label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    LetterNumber { letter: char, number: u32 },
    NumberLetter { number: u32, suffix: String },
}

impl Label {
    /// First label of the first group (`A1` / `1A`).
    pub fn first(format: NumberingFormat) -> Self {
        match format {
            NumberingFormat::LetterNumber => Label::LetterNumber {
                letter: 'A',
                number: 1,
            },
            NumberingFormat::NumberLetter => Label::NumberLetter {
                number: 1,
                suffix: "A".to_string(),
            },
        }
    }

    pub fn format(&self) -> NumberingFormat {
        match self {
            Label::LetterNumber { .. } => NumberingFormat::LetterNumber,
            Label::NumberLetter { .. } => NumberingFormat::NumberLetter,
        }
    }

    /// Group component: the specimen letter or number.
    pub fn primary(&self) -> String {
        match self {
            Label::LetterNumber { letter, .. } => letter.to_string(),
            Label::NumberLetter { number, .. } => number.to_string(),
        }
    }

    /// Block component: the block number or letter suffix.
    pub fn secondary(&self) -> String {
        match self {
            Label::LetterNumber { number, .. } => number.to_string(),
            Label::NumberLetter { suffix, .. } => suffix.clone(),
        }
    }

    /// The block immediately after this one in the same group.
    pub fn next_block(&self) -> Label {
        match self {
            Label::LetterNumber { letter, number } => Label::LetterNumber {
                letter: *letter,
                number: number.saturating_add(1),
            },
            Label::NumberLetter { number, suffix } => Label::NumberLetter {
                number: *number,
                suffix: next_letter_suffix(suffix),
            },
        }
    }

    /// First block of the next group. `None` past specimen `Z`.
    pub fn next_group(&self) -> Option<Label> {
        match self {
            Label::LetterNumber { letter, .. } => {
                if *letter >= 'Z' {
                    return None;
                }
                let next = char::from(*letter as u8 + 1);
                Some(Label::LetterNumber {
                    letter: next,
                    number: 1,
                })
            }
            Label::NumberLetter { number, .. } => Some(Label::NumberLetter {
                number: number.checked_add(1)?,
                suffix: "A".to_string(),
            }),
        }
    }

    /// Ordering of two blocks that share a group; `None` when the groups differ.
    pub fn cmp_within_group(&self, other: &Label) -> Option<Ordering> {
        match (self, other) {
            (
                Label::LetterNumber { letter: a, number: x },
                Label::LetterNumber { letter: b, number: y },
            ) if a == b => Some(x.cmp(y)),
            (
                Label::NumberLetter { number: a, suffix: x },
                Label::NumberLetter { number: b, suffix: y },
            ) if a == b => Some(suffix_order(x, y)),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::LetterNumber { letter, number } => write!(f, "{letter}{number}"),
            Label::NumberLetter { number, suffix } => write!(f, "{number}{suffix}"),
        }
    }
}

/// Odometer increment over `A..=Z`, least significant character last:
/// `A → B`, `Z → AA`, `AZ → BA`, `ZZ → AAA`. An empty suffix yields `A`.
pub fn next_letter_suffix(suffix: &str) -> String {
    let mut chars: Vec<char> = suffix.chars().collect();
    if chars.is_empty() {
        return "A".to_string();
    }
    let mut i = chars.len();
    loop {
        if i == 0 {
            chars.insert(0, 'A');
            break;
        }
        i -= 1;
        if chars[i] < 'Z' {
            chars[i] = char::from(chars[i] as u8 + 1);
            break;
        }
        chars[i] = 'A';
    }
    chars.into_iter().collect()
}

/// Odometer order: shorter suffixes first, then lexicographic.
pub fn suffix_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
