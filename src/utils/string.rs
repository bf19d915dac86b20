//! String utilities
//!
//! Character-boundary-safe truncation, the fence stripping applied to
//! Gemini JSON output, and the rough token estimate used in diagnostics.

/// Safely truncate a string at a character boundary
///
/// Returns at most `max_chars` characters; never splits a UTF-8 sequence.
///
/// # Example
/// ```
/// use gemini_key_rotator::utils::truncate_str;
///
/// let text = "Hello, 世界!";
/// assert_eq!(truncate_str(text, 8), "Hello, 世");
/// assert_eq!(truncate_str(text, 100), "Hello, 世界!");
/// ```
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `max_chars` characters and always append `suffix`
///
/// Unlike [`truncate_with_suffix`], the suffix is appended even when the
/// input is short. Credential previews use this so that a preview never
/// reveals whether it shows the whole secret.
///
/// # Example
/// ```
/// use gemini_key_rotator::utils::prefix_with_suffix;
///
/// assert_eq!(prefix_with_suffix("AIzaSyA1234567890", 10, "..."), "AIzaSyA123...");
/// assert_eq!(prefix_with_suffix("short", 10, "..."), "short...");
/// ```
pub fn prefix_with_suffix(s: &str, max_chars: usize, suffix: &str) -> String {
    format!("{}{}", truncate_str(s, max_chars), suffix)
}

/// Safely truncate a string and append a suffix if truncated
///
/// # Example
/// ```
/// use gemini_key_rotator::utils::truncate_with_suffix;
///
/// assert_eq!(truncate_with_suffix("Hello, World!", 5, "..."), "Hello...");
/// assert_eq!(truncate_with_suffix("Hi", 5, "..."), "Hi");
/// ```
pub fn truncate_with_suffix(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}{}", truncate_str(s, max_chars), suffix)
    }
}

/// Remove a surrounding markdown code fence from model output
///
/// Gemini frequently wraps JSON answers in ```` ```json ```` blocks even when
/// asked for bare JSON. Handles both the tagged and the untagged fence and
/// trims surrounding whitespace. Text without a leading fence is returned
/// trimmed but otherwise unchanged.
///
/// # Example
/// ```
/// use gemini_key_rotator::utils::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fences("  plain  "), "plain");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };

    let body = body.trim_start();
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Rough token count (four characters per token)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_ascii() {
        let text = "Hello, World!";
        assert_eq!(truncate_str(text, 5), "Hello");
        assert_eq!(truncate_str(text, 100), "Hello, World!");
    }

    #[test]
    fn test_truncate_str_unicode() {
        let text = "Hello, 世界!";
        assert_eq!(truncate_str(text, 7), "Hello, ");
        assert_eq!(truncate_str(text, 8), "Hello, 世");
        assert_eq!(truncate_str(text, 9), "Hello, 世界");
    }

    #[test]
    fn test_prefix_with_suffix_always_appends() {
        assert_eq!(prefix_with_suffix("abcdefghijklmnop", 10, "..."), "abcdefghij...");
        assert_eq!(prefix_with_suffix("abc", 10, "..."), "abc...");
        assert_eq!(prefix_with_suffix("", 10, "..."), "...");
    }

    #[test]
    fn test_truncate_with_suffix() {
        assert_eq!(truncate_with_suffix("Hello, World!", 5, "..."), "Hello...");
        assert_eq!(truncate_with_suffix("Hi", 5, "..."), "Hi");
        assert_eq!(truncate_with_suffix("", 10, "..."), "");
    }

    #[test]
    fn test_strip_code_fences_json() {
        let raw = "```json\n{\"overallRisk\": \"low\"}\n```\n";
        assert_eq!(strip_code_fences(raw), "{\"overallRisk\": \"low\"}");
    }

    #[test]
    fn test_strip_code_fences_untagged() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(strip_code_fences(raw), "[1, 2, 3]");
    }

    #[test]
    fn test_strip_code_fences_missing_closing_fence() {
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }

    #[test]
    fn test_strip_code_fences_no_fence() {
        assert_eq!(strip_code_fences("\n  {\"a\": true}  \n"), "{\"a\": true}");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
