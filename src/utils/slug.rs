use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"))
}

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("static regex"))
}

/// Turns arbitrary text into a URL slug.
///
/// Characters are decomposed (NFKD) and anything outside ASCII is dropped, so
/// `"Şık Çanta"` becomes `"sk-canta"` (dotless `ı` has no ASCII form). Then
/// everything that is not a word character, whitespace or hyphen is removed,
/// the text is lowercased, and runs of whitespace/hyphens collapse into a
/// single hyphen. Leading and trailing hyphens and underscores are trimmed.
pub fn slugify(input: &str) -> String {
    let ascii: String = input.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = disallowed_chars().replace_all(&lowered, "");
    let collapsed = separator_runs().replace_all(cleaned.trim(), "-");
    collapsed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Keeps at most `limit` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
