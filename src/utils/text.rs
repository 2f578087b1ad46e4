// src/utils/text.rs

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid tag pattern"));

// Only paired markers hugging their text count as markup, so `2 * 3` and
// `__init__` survive.
static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^\s*](?:[^*\n]*[^\s*])?)\*\*").expect("valid bold pattern")
});

static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w*])\*([^\s*](?:[^*\n]*[^\s*])?)\*").expect("valid italic pattern")
});

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code pattern"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#{1,6}\s+").expect("valid heading pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Turns generated text into a single plain-text paragraph.
///
/// Strips HTML tags, markdown emphasis and heading markers, surrounding
/// quotes, and collapses whitespace. Generated text is shown verbatim to
/// learners and stored, so nothing renderable survives.
pub fn plain_text(input: &str) -> String {
    let unquoted = strip_quotes(input);
    let without_tags = HTML_TAG.replace_all(unquoted, "");
    let without_headings = HEADING.replace_all(&without_tags, "");
    let without_bold = BOLD.replace_all(&without_headings, "$1");
    let without_italic = ITALIC.replace_all(&without_bold, "${1}${2}");
    let without_emphasis = INLINE_CODE.replace_all(&without_italic, "$1");
    let collapsed = WHITESPACE.replace_all(without_emphasis.trim(), " ");

    strip_quotes(&collapsed).to_string()
}

fn strip_quotes(input: &str) -> &str {
    input
        .trim()
        .trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim()
}

/// First `max_chars` characters of `input`, on a char boundary.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_emphasis_and_tags() {
        let raw = "**Great fit**: this <b>short</b> video suits your `beginner` level.";
        assert_eq!(
            plain_text(raw),
            "Great fit: this short video suits your beginner level."
        );
    }

    #[test]
    fn test_strips_headings_quotes_and_newlines() {
        let raw = "\"## Why\n\nPractice   the *loop* exercises.\"";
        assert_eq!(plain_text(raw), "Why Practice the loop exercises.");
    }

    #[test]
    fn test_keeps_snake_case_words() {
        assert_eq!(plain_text("Use my_var here"), "Use my_var here");
    }

    #[test]
    fn test_keeps_unpaired_asterisks_and_dunders() {
        assert_eq!(
            plain_text("Compute 2 * 3 * 4 and call __init__."),
            "Compute 2 * 3 * 4 and call __init__."
        );
        assert_eq!(plain_text("Use a*b*c as written"), "Use a*b*c as written");
    }

    #[test]
    fn test_strips_adjacent_emphasis() {
        assert_eq!(plain_text("*one* and *two*"), "one and two");
        assert_eq!(plain_text("**Bold** then `x * y`"), "Bold then x * y");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("añbc", 2), "añ");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
