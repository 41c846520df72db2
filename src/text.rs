//! Text helpers for the export pipeline.
//!
//! Covers the three places an export touches raw text: deriving a download
//! filename from a resource name ([`slugify`]), scrubbing inline markup out
//! of exported string values ([`strip_tags`]), and converting resolved
//! display values to the text that lands in the delimited file
//! ([`smart_text`]). [`sanitize_query_string`] keeps the current list
//! view's query string attachable to an export button URL.

use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Characters percent-encoded when sanitizing a query string: everything
/// non-alphanumeric except the sub-delims and reserved characters that are
/// valid in a URI query, and `%` so already-encoded sequences pass
/// through.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'%')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'~')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Converts a resource name to a filename-friendly slug.
///
/// Lowercases, drops characters that are not alphanumeric, whitespace, or
/// hyphens, then collapses whitespace/hyphen runs into single hyphens.
///
/// # Examples
///
/// ```
/// use exportable_admin::text::slugify;
///
/// assert_eq!(slugify("Blog Article"), "blog-article");
/// assert_eq!(slugify("  Q3  — Sales!  "), "q3-sales");
/// ```
pub fn slugify(s: &str) -> String {
    static NON_SLUG: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();

    let non_slug = NON_SLUG.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[\s-]+").unwrap());

    let lowered = s.to_lowercase();
    let stripped = non_slug.replace_all(&lowered, "");
    let hyphenated = separators.replace_all(stripped.trim(), "-");
    hyphenated.trim_matches('-').to_string()
}

/// Removes inline markup tags from a string, keeping only text content.
///
/// Exported list cells may carry presentation markup from the admin's list
/// rendering; a delimited-text file wants the bare text. This is a plain
/// tag-stripper, not a sanitizer.
///
/// # Examples
///
/// ```
/// use exportable_admin::text::strip_tags;
///
/// assert_eq!(strip_tags("<a href=\"/x/\">Article</a>"), "Article");
/// assert_eq!(strip_tags("plain"), "plain");
/// ```
pub fn strip_tags(s: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    tag.replace_all(s, "").into_owned()
}

/// The canonical display-value-to-text conversion for exported fields.
///
/// Strings pass through unchanged; numbers and booleans render in their
/// natural form; null (the missing/empty marker) becomes an empty field.
/// Compound values fall back to their JSON representation.
pub fn smart_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Percent-encodes a raw query string so it can be appended to an export
/// button URL, leaving valid query characters and existing `%xx` sequences
/// alone.
pub fn sanitize_query_string(query: &str) -> String {
    utf8_percent_encode(query, QUERY_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── slugify ──────────────────────────────────────────────────────

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Blog Article"), "blog-article");
    }

    #[test]
    fn test_slugify_punctuation() {
        assert_eq!(slugify("Orders (2024)!"), "orders-2024");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("  a  -  b  "), "a-b");
    }

    #[test]
    fn test_slugify_underscores_kept() {
        assert_eq!(slugify("blog_post"), "blog_post");
    }

    #[test]
    fn test_slugify_empty_when_nothing_survives() {
        assert_eq!(slugify("!!!"), "");
    }

    // ── strip_tags ───────────────────────────────────────────────────

    #[test]
    fn test_strip_tags_anchor() {
        assert_eq!(strip_tags("<a href=\"/1/\">One</a>"), "One");
    }

    #[test]
    fn test_strip_tags_nested() {
        assert_eq!(strip_tags("<p><b>bold</b> text</p>"), "bold text");
    }

    #[test]
    fn test_strip_tags_self_closing() {
        assert_eq!(strip_tags("a<br/>b"), "ab");
    }

    #[test]
    fn test_strip_tags_no_markup() {
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    // ── smart_text ───────────────────────────────────────────────────

    #[test]
    fn test_smart_text_string_passthrough() {
        assert_eq!(smart_text(&json!("hello")), "hello");
    }

    #[test]
    fn test_smart_text_number() {
        assert_eq!(smart_text(&json!(5)), "5");
        assert_eq!(smart_text(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_smart_text_bool() {
        assert_eq!(smart_text(&json!(true)), "true");
        assert_eq!(smart_text(&json!(false)), "false");
    }

    #[test]
    fn test_smart_text_null_is_empty() {
        assert_eq!(smart_text(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_smart_text_compound_is_json() {
        assert_eq!(smart_text(&json!(["a", 1])), "[\"a\",1]");
    }

    // ── sanitize_query_string ────────────────────────────────────────

    #[test]
    fn test_sanitize_plain_query_unchanged() {
        assert_eq!(
            sanitize_query_string("status=published&o=-1"),
            "status=published&o=-1"
        );
    }

    #[test]
    fn test_sanitize_encodes_non_ascii() {
        assert_eq!(sanitize_query_string("q=café"), "q=caf%C3%A9");
    }

    #[test]
    fn test_sanitize_keeps_existing_escapes() {
        assert_eq!(sanitize_query_string("q=a%20b"), "q=a%20b");
    }

    #[test]
    fn test_sanitize_encodes_spaces() {
        assert_eq!(sanitize_query_string("q=a b"), "q=a%20b");
    }
}
