//! Title normalization helpers shared by scripts, checkpoints and sources.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of title characters that feed into a slug.
pub const SLUG_SOURCE_CHARS: usize = 50;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));
static NON_WORD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Filesystem-safe slug of a title.
///
/// Takes the first 50 characters, drops everything that is not a word
/// character, whitespace or `-`, collapses separator runs into a single
/// `-` and lower-cases the result. Returns `"untitled"` when nothing is left.
pub fn slugify(title: &str) -> String {
    let head: String = title.chars().take(SLUG_SOURCE_CHARS).collect();
    let cleaned = NON_SLUG_CHARS.replace_all(&head, "");
    let joined = SLUG_SEPARATORS.replace_all(&cleaned, "-");
    let slug = joined.trim_matches('-').to_lowercase();

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Deduplication key for a title: lower-cased, trimmed, punctuation removed.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    NON_WORD_CHARS.replace_all(&lowered, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Man in the Window!"), "the-man-in-the-window");
        assert_eq!(slugify("  --Hello,   World--  "), "hello-world");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_slugify_truncates_before_cleaning() {
        let title = "a".repeat(60);
        assert_eq!(slugify(&title).len(), 50);
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify("?!?"), "untitled");
    }

    #[test]
    fn test_slugify_is_stable() {
        let title = "I Found a Door in My Basement (Part 2)";
        assert_eq!(slugify(title), slugify(title));
        assert_eq!(slugify(title), "i-found-a-door-in-my-basement-part-2");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Hello, World!  "), "hello world");
        assert_eq!(normalize_title("HELLO WORLD"), normalize_title("hello world?"));
    }
}
