use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref RE_SLUG_STRIP: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref RE_SLUG_DASH: Regex = Regex::new(r"[-\s_]+").unwrap();
    static ref RE_NAME_SEP: Regex = Regex::new(r"\s*(?:;|\band\b|&)\s*").unwrap();
}

/// Lowercase, URL-safe form of a title or descriptor.
///
/// Keeps Unicode letters and digits, drops punctuation, and joins words with a
/// single hyphen: `"Book 1: The Wrath"` becomes `"book-1-the-wrath"`.
pub fn slugify(text: &str) -> String {
    let text = text.replace(['\u{2013}', '\u{2014}'], "-");
    let s = RE_SLUG_STRIP.replace_all(&text, "");
    let s = RE_SLUG_DASH.replace_all(s.trim(), "-");
    s.trim_matches('-').to_lowercase()
}

/// The n-th alternative for a slug that is already taken. `n == 0` is the slug itself.
pub fn slug_with_suffix(slug: &str, n: usize) -> String {
    if n == 0 {
        slug.to_string()
    } else {
        format!("{}-{}", slug, n)
    }
}

/// Replace runs of whitespace (including newlines) with a single space.
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").to_string()
}

/// Split a credit line such as `"Harold Cherniss and William C. Helmbold"` into names.
///
/// Commas are not separators, so inverted names like `"Lamb, W. R. M."` stay whole.
pub fn split_names(text: &str) -> Vec<String> {
    RE_NAME_SEP.split(text.trim())
        .map(|n| collapse_whitespace(n.trim()))
        .filter(|n| !n.is_empty())
        .collect()
}
