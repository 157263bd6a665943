//! Caption text normalization shared by acquisition and segmentation.

use once_cell::sync::Lazy;
use regex::Regex;
use zhconv::{zhconv, Variant};

/// Separator between the two halves of a time-code line
pub const TIMECODE_ARROW: &str = " --> ";

/// Punctuation removed from captions before they are stored
static CAPTION_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[,.?!:，。！~？/：、…“”"]+"#).unwrap());

/// Latin letters, percent and caret mark a caption as unusable
static LATIN_OR_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z%^]").unwrap());

/// Brackets and arithmetic operators mark a caption as unusable
static BRACKET_OR_OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()（）×÷*+^]").unwrap());

/// Anything that is neither a word character nor whitespace
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Header lines of a WebVTT file that must survive normalization untouched
const VTT_METADATA_PREFIXES: [&str; 3] = ["WEBVTT", "Kind:", "Language:"];

/// Convert traditional Chinese script to simplified
pub fn to_simplified(text: &str) -> String {
    zhconv(text, Variant::ZhHans)
}

/// Remove caption punctuation, keeping spaces
pub fn strip_caption_punctuation(text: &str) -> String {
    CAPTION_PUNCTUATION.replace_all(text, "").into_owned()
}

/// Remove every character that is neither a word character nor whitespace
pub fn strip_non_word(text: &str) -> String {
    NON_WORD.replace_all(text, "").into_owned()
}

pub fn contains_latin_or_percent(text: &str) -> bool {
    LATIN_OR_PERCENT.is_match(text)
}

pub fn contains_bracket_or_operator(text: &str) -> bool {
    BRACKET_OR_OPERATOR.is_match(text)
}

/// Number of characters once ASCII spaces are removed
pub fn visible_len(text: &str) -> usize {
    text.chars().filter(|c| *c != ' ').count()
}

/// Loose time-code check used when rewriting downloaded subtitle files
pub fn is_timecode_line(line: &str) -> bool {
    line.contains("-->")
}

pub fn is_vtt_metadata_line(line: &str) -> bool {
    VTT_METADATA_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}
