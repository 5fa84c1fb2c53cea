//! Shared utility functions for the stagecraft crate.

/// Normalize a free-form label for table lookup.
///
/// Lowercases, collapses every run of non-letter characters into a single
/// underscore, and trims leading/trailing underscores:
/// `"Requirements-Doc!"` becomes `"requirements_doc"`.
pub fn normalize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Estimate the token cost of a text blob as `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token_simple() {
        assert_eq!(normalize_token("source_code"), "source_code");
        assert_eq!(normalize_token("Source Code"), "source_code");
    }

    #[test]
    fn test_normalize_token_punctuation_runs() {
        assert_eq!(normalize_token("  API -- Spec!! "), "api_spec");
        assert_eq!(normalize_token("UI/UX_DESIGN"), "ui_ux_design");
    }

    #[test]
    fn test_normalize_token_digits_are_separators() {
        assert_eq!(normalize_token("phase2review"), "phase_review");
    }

    #[test]
    fn test_normalize_token_empty() {
        assert_eq!(normalize_token(""), "");
        assert_eq!(normalize_token("---"), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_chars("héllo wörld", 5), "hé...");
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
