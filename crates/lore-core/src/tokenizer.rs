use regex::Regex;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Case-fold and split on non-alphanumeric boundaries.
/// `"Bearer-Token_Forwarding"` → `["bearer", "token", "forwarding"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = text.to_lowercase();
    NON_ALNUM
        .split(&folded)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized single-space form of `text`, used as the match haystack.
/// Inputs differing only in case, punctuation or whitespace normalize equal.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}
