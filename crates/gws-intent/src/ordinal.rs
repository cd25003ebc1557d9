//! Ordinal words and numerals → positions

use crate::intent::ItemIndex;

/// Ordinal words in position order
const ORDINAL_WORDS: [&str; 10] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// Regex alternation matching any ordinal form [`parse_ordinal`] accepts
pub(crate) const ORDINAL_PATTERN: &str =
    r"(?:first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|last|final|\d+(?:st|nd|rd|th)?)";

/// Parse "third", "3rd", "3" or "last" into a position
///
/// Numbers are one-based as typed and come back zero-based; `0` is rejected.
#[must_use]
pub fn parse_ordinal(word: &str) -> Option<ItemIndex> {
    let word = word.trim().to_lowercase();
    if matches!(word.as_str(), "last" | "final") {
        return Some(ItemIndex::Last);
    }
    if let Some(pos) = ORDINAL_WORDS.iter().position(|w| *w == word) {
        return Some(ItemIndex::At(pos));
    }
    let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    parse_position(digits)
}

/// Parse a one-based numeral into a zero-based position
#[must_use]
pub fn parse_position(digits: &str) -> Option<ItemIndex> {
    match digits.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(ItemIndex::At(n - 1)),
        _ => None,
    }
}
