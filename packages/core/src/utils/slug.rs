//! Slug generation for route parameters

use regex::Regex;
use std::sync::LazyLock;

/// HTML tags and markdown emphasis markers are dropped before slugging
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>|[*_~`]").unwrap());

/// Runs of anything that is not a lowercase letter or digit
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{Ll}\p{Lo}\p{Nd}]+").unwrap());

/// Turn arbitrary text into a URL path segment
///
/// # Examples
///
/// ```
/// use sitegraph_core::utils::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("**Rust** & WebAssembly!"), "rust-webassembly");
/// assert_eq!(slugify("  trimmed  "), "trimmed");
/// ```
pub fn slugify(text: &str) -> String {
    let stripped = MARKUP_RE.replace_all(text, "");
    let lowered = stripped.to_lowercase();
    SEPARATOR_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("2024 Recap"), "2024-recap");
    }

    #[test]
    fn test_slugify_strips_markup() {
        assert_eq!(slugify("<em>Big</em> _News_"), "big-news");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
