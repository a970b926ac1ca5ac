//! Text heuristics used by the resolver: whitespace cleaning before
//! transmission, the paragraph test that gates dictionary lookups, and
//! detection of romanized (transliterated) provider output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Selections longer than this many characters are never dictionary phrases.
pub const SHORT_PHRASE_MAX_CHARS: usize = 25;

/// Share of ASCII letters above which output is treated as transliteration.
pub const LATIN_RATIO_THRESHOLD: f64 = 0.4;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static SPACE_PUNCT_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\p{P}\p{S}]").unwrap());

/// Collapse newlines and whitespace runs into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text.trim(), " ").into_owned()
}

/// A selection is a paragraph when it has more than one word, spans lines,
/// or is long. Paragraphs bypass the phrase dictionary.
pub fn is_paragraph(text: &str) -> bool {
    text.contains(' ') || text.contains('\n') || text.chars().count() > SHORT_PHRASE_MAX_CHARS
}

/// True when more than 40% of the non-space, non-punctuation characters are
/// ASCII letters. Empty input is not Latin.
pub fn is_mostly_latin(text: &str) -> bool {
    let cleaned = SPACE_PUNCT_SYMBOL.replace_all(text, "");
    let total = cleaned.chars().count();
    if total == 0 {
        return false;
    }
    let latin = cleaned.chars().filter(char::is_ascii_alphabetic).count();
    latin as f64 / total as f64 > LATIN_RATIO_THRESHOLD
}
