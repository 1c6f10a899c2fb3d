//! Separator cleanup for cell text.

use regex::Regex;
use std::sync::OnceLock;

/// Canonical separator between items in a normalized cell.
pub const SEPARATOR: &str = ", ";

fn spaced_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*,\s*").expect("separator regex is valid"))
}

fn repeated_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(,\s*){2,}").expect("repeat regex is valid"))
}

/// Join raw text fragments into one normalized string.
///
/// Empty fragments and bare `,` fragments are dropped, the rest joined with
/// [`SEPARATOR`]. Runs of separators collapse to one and the result never
/// starts or ends with a separator. Idempotent.
pub fn normalize_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kept: Vec<String> = fragments
        .into_iter()
        .map(|f| f.as_ref().trim().to_string())
        .filter(|f| !f.is_empty() && f != ",")
        .collect();

    let joined = kept.join(SEPARATOR);
    let spaced = spaced_separator_re().replace_all(&joined, SEPARATOR);
    let collapsed = repeated_separator_re().replace_all(&spaced, SEPARATOR);

    collapsed
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// Normalize a single already-joined string.
pub fn normalize_text(text: &str) -> String {
    normalize_fragments([text])
}
