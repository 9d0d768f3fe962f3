//! Best-effort cleanup of free-text submission fields.
//!
//! Tag stripping removes anything shaped like `<...>`, plus the bodies of
//! closed `script` and `style` elements. It does not decode entities,
//! understand nesting, or stop every injection vector, so rendered output
//! still needs encoding at display time.

use crate::error::CoreError;
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_NAME_CHARS: usize = 2;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_COMMENT_CHARS: usize = 500;

pub fn normalize_guest_name(raw: &str) -> Result<String, CoreError> {
    let name = sanitize_text(raw);
    let len = name.chars().count();
    if len < MIN_NAME_CHARS {
        return Err(CoreError::NameTooShort);
    }
    if len > MAX_NAME_CHARS {
        return Err(CoreError::NameTooLong);
    }
    Ok(name)
}

/// Returns `None` when nothing is left after sanitizing.
pub fn normalize_comment(raw: &str) -> Result<Option<String>, CoreError> {
    let comment = sanitize_text(raw);
    if comment.is_empty() {
        return Ok(None);
    }
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(CoreError::CommentTooLong);
    }
    Ok(Some(comment))
}

static RAW_TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("raw text element pattern compiles")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern compiles"));

pub fn sanitize_text(raw: &str) -> String {
    strip_tags(&strip_raw_text_elements(raw.trim()))
        .trim()
        .to_string()
}

/// Drops `<script ...>...</script>` and `<style ...>...</style>` blocks,
/// matched case-insensitively. An element without a closing tag is left for
/// [`strip_tags`].
pub fn strip_raw_text_elements(input: &str) -> String {
    RAW_TEXT_ELEMENT.replace_all(input, "").into_owned()
}

/// Removes every leftmost, non-overlapping match of `<[^>]+>`.
pub fn strip_tags(input: &str) -> String {
    TAG.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_comment, normalize_guest_name, sanitize_text, strip_raw_text_elements,
        strip_tags, MAX_COMMENT_CHARS,
    };
    use crate::error::CoreError;

    #[test]
    fn strips_script_block_from_name() {
        let name = normalize_guest_name("<script>evil</script>Jane").unwrap();
        assert_eq!(name, "Jane");
    }

    #[test]
    fn raw_text_elements_drop_their_bodies() {
        assert_eq!(
            strip_raw_text_elements("a<SCRIPT type=x>b</Script >c<style>d</style>e"),
            "ace"
        );
        assert_eq!(strip_raw_text_elements("<script>\nalert(1)\n</script>ok"), "ok");
        assert_eq!(strip_raw_text_elements("<scripted>x</scripted>"), "<scripted>x</scripted>");
        assert_eq!(strip_raw_text_elements("<script>never closed"), "<script>never closed");
        assert_eq!(sanitize_text("<script>never closed"), "never closed");
    }

    #[test]
    fn trims_whitespace_left_by_tags() {
        let name = normalize_guest_name("  <b></b> Jo ").unwrap();
        assert_eq!(name, "Jo");
    }

    #[test]
    fn rejects_single_char_name() {
        assert_eq!(normalize_guest_name(" A ").unwrap_err(), CoreError::NameTooShort);
    }

    #[test]
    fn rejects_name_that_is_only_markup() {
        assert_eq!(
            normalize_guest_name("<img src=x>").unwrap_err(),
            CoreError::NameTooShort
        );
    }

    #[test]
    fn name_bounds_count_characters_not_bytes() {
        let hundred = "é".repeat(100);
        assert_eq!(normalize_guest_name(&hundred).unwrap(), hundred);
        let too_long = "é".repeat(101);
        assert_eq!(
            normalize_guest_name(&too_long).unwrap_err(),
            CoreError::NameTooLong
        );
    }

    #[test]
    fn strip_tags_leaves_unclosed_and_empty_brackets() {
        assert_eq!(strip_tags("a < b"), "a < b");
        assert_eq!(strip_tags("a <> b"), "a <> b");
        assert_eq!(strip_tags("1 > 0"), "1 > 0");
    }

    #[test]
    fn strip_tags_matches_greedy_open_brackets() {
        assert_eq!(strip_tags("x<<a>y"), "xy");
        assert_eq!(strip_tags("<<>x>"), "x>");
        assert_eq!(strip_tags("<>b>c"), "<>b>c");
        assert_eq!(strip_tags("<a<b>"), "");
    }

    #[test]
    fn comment_is_checked_after_normalization() {
        let padded = format!("<p>{}</p>", "a".repeat(MAX_COMMENT_CHARS));
        assert_eq!(
            normalize_comment(&padded).unwrap().map(|c| c.len()),
            Some(MAX_COMMENT_CHARS)
        );
        let over = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert_eq!(
            normalize_comment(&over).unwrap_err(),
            CoreError::CommentTooLong
        );
    }

    #[test]
    fn comment_of_only_tags_is_absent() {
        assert_eq!(normalize_comment("<br>").unwrap(), None);
    }
}
