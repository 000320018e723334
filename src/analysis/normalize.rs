//! Text normalization and whole-token phrase matching.

use once_cell::sync::Lazy;
use regex::Regex;

static APOSTROPHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"['\u{2019}]").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Case-fold, strip punctuation and collapse whitespace.
///
/// Apostrophes are dropped so "team's" folds to "teams"; every other run of
/// non-alphanumeric characters becomes a single space.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_apostrophes = APOSTROPHES.replace_all(&lowered, "");
    let spaced = NON_ALPHANUMERIC.replace_all(&no_apostrophes, " ");
    spaced.trim().to_string()
}

/// Normalize and split into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shortest stem the plural tolerance applies to.
const MIN_PLURAL_STEM: usize = 4;

/// Token equality tolerant of a plural `s`/`es` suffix on either side.
///
/// Stems shorter than four characters must match exactly, so "news" never
/// matches "new" and "is" never matches "i".
pub fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let plural_of = |long: &str, short: &str| {
        short.chars().count() >= MIN_PLURAL_STEM
            && (long.strip_suffix("es") == Some(short) || long.strip_suffix('s') == Some(short))
    };
    plural_of(a, b) || plural_of(b, a)
}

/// Count the positions where `phrase` occurs as a contiguous token run.
pub fn count_phrase(tokens: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(phrase.len())
        .filter(|window| window.iter().zip(phrase).all(|(t, p)| tokens_match(t, p)))
        .count()
}
