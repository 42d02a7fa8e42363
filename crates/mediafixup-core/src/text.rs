//! Title text helpers used to derive sort titles.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Characters removed from sort titles when punctuation removal is enabled.
pub const PUNCTUATION: &[char] = &[
    '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', ':', ';', '<',
    '=', '>', '?', '@', '[', '\\', ']', '^', '_', '`', '{', '|', '}', '~', '¡', '¿', '«', '»',
    '‘', '’', '‚', '“', '”', '„', '‹', '›', '–', '—', '…', '·',
];

/// How a sort title is derived from a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortTitleOptions {
    pub transliterate: bool,
    pub remove_punctuation: bool,
}

/// Derive the sort title for `title`.
///
/// Whitespace runs collapse to a single space and the result is trimmed, so
/// the function is idempotent: `sort_title(sort_title(t)) == sort_title(t)`.
pub fn sort_title(title: &str, options: SortTitleOptions) -> String {
    let mut value = if options.transliterate {
        transliterate(title)
    } else {
        title.to_string()
    };
    if options.remove_punctuation {
        value.retain(|c| !PUNCTUATION.contains(&c));
    }
    collapse_whitespace(&value)
}

/// Fold `input` to ASCII: decompose (NFKD), drop combining marks, expand
/// letters without a decomposition, and drop what is left over.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.nfkd() {
        if ch.is_ascii() {
            out.push(ch);
        } else if is_combining_mark(ch) {
            continue;
        } else if let Some(expanded) = expand_letter(ch) {
            out.push_str(expanded);
        } else if ch.is_whitespace() {
            out.push(' ');
        } else if let Some(mapped) = fold_punctuation(ch) {
            out.push(mapped);
        }
    }
    out
}

/// Letters that NFKD leaves alone.
fn expand_letter(ch: char) -> Option<&'static str> {
    let expanded = match ch {
        'ß' => "ss",
        'ẞ' => "SS",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'ł' => "l",
        'Ł' => "L",
        'þ' => "th",
        'Þ' => "Th",
        'ı' => "i",
        'ħ' => "h",
        'Ħ' => "H",
        _ => return None,
    };
    Some(expanded)
}

fn fold_punctuation(ch: char) -> Option<char> {
    match ch {
        '‘' | '’' | '‚' | '‹' | '›' => Some('\''),
        '“' | '”' | '„' | '«' | '»' => Some('"'),
        '–' | '—' | '‐' | '‑' => Some('-'),
        _ => None,
    }
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
