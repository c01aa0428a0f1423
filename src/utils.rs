use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Stands in for any single character lost to a failed decode.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Re-decodes text that was UTF-8 but got read as Latin-1
/// (`"InversiÃ³n"` becomes `"Inversión"`). Text that does not look like that
/// kind of damage is returned unchanged.
pub fn repair_mojibake(text: &str) -> String {
    let suspicious = text.contains('\u{00C3}') || text.contains('\u{00C2}');
    if !suspicious || text.chars().any(|c| c as u32 > 0xFF) {
        return text.to_string();
    }

    let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

/// Canonical form used for label comparison: mojibake repaired, accents
/// stripped, lowercased, whitespace collapsed to single spaces.
pub fn fold_label(text: &str) -> String {
    let repaired = repair_mojibake(text);
    let stripped: String = repaired.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substring test where a [`REPLACEMENT_CHAR`] in `haystack` matches any
/// single character of `needle`.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    let hay: Vec<char> = haystack.chars().collect();
    let pattern: Vec<char> = needle.chars().collect();

    if pattern.is_empty() {
        return true;
    }
    if pattern.len() > hay.len() {
        return false;
    }

    hay.windows(pattern.len()).any(|window| {
        window
            .iter()
            .zip(&pattern)
            .all(|(h, p)| *h == REPLACEMENT_CHAR || h == p)
    })
}
