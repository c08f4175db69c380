//! Output post-processing: OCR-error correction and whitespace normalization
//!
//! Applied to every extraction result regardless of path, so cached text is
//! always in canonical form.

use regex::Regex;
use std::sync::OnceLock;

/// Deterministic fixes for character confusions common in OCR output of
/// Latin and Vietnamese CVs.
pub fn correct_ocr_errors(text: &str) -> String {
    static VOWEL_RN: OnceLock<Regex> = OnceLock::new();
    static DIGIT_O: OnceLock<Regex> = OnceLock::new();
    static DIGIT_L: OnceLock<Regex> = OnceLock::new();
    static SPACE_PUNCT: OnceLock<Regex> = OnceLock::new();
    static REPEAT_COMMA: OnceLock<Regex> = OnceLock::new();

    let mut out = text
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{2026}', "...")
        .replace('ð', "đ")
        .replace('Ð', "Đ");

    // "rn" misread for "m" between vowels, e.g. "arnount" -> "amount".
    let vowel_rn = VOWEL_RN.get_or_init(|| {
        Regex::new(r"([aeiouAEIOU])rn([aeiou])").unwrap()
    });
    out = vowel_rn.replace_all(&out, "${1}m${2}").into_owned();

    // Digits dropped into letter runs: "c0ng ty" -> "cong ty", "fi1e" -> "file".
    let digit_o = DIGIT_O.get_or_init(|| Regex::new(r"([b-df-hj-np-tv-z])0([a-z])").unwrap());
    out = digit_o.replace_all(&out, "${1}o${2}").into_owned();
    let digit_l = DIGIT_L.get_or_init(|| Regex::new(r"([a-z])1([a-z])").unwrap());
    out = digit_l.replace_all(&out, "${1}l${2}").into_owned();

    // Commas and colons drifting away from their word.
    let space_punct = SPACE_PUNCT.get_or_init(|| Regex::new(r" +([,.;:])").unwrap());
    out = space_punct.replace_all(&out, "${1}").into_owned();
    let repeat_comma = REPEAT_COMMA.get_or_init(|| Regex::new(r",{2,}").unwrap());
    out = repeat_comma.replace_all(&out, ",").into_owned();

    out
}

/// CRLF -> LF, horizontal whitespace runs -> one space, 3+ newlines -> a
/// paragraph break.
pub fn normalize_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    static PARAGRAPHS: OnceLock<Regex> = OnceLock::new();

    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").unwrap());
    let collapsed = spaces.replace_all(&unified, " ");

    let trailing = TRAILING.get_or_init(|| Regex::new(r" ?\n ?").unwrap());
    let trimmed_lines = trailing.replace_all(&collapsed, "\n");

    let paragraphs = PARAGRAPHS.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    paragraphs
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

/// Full post-processing pass in the order every extraction path applies it.
pub fn clean_extracted_text(text: &str) -> String {
    normalize_whitespace(&correct_ocr_errors(text))
}
