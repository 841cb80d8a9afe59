// src/utils/mod.rs

//! Text and URL helpers shared across services.

use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::error::{AppError, Result};

/// First `n` user-perceived characters of `text`.
pub fn text_prefix(text: &str, n: usize) -> &str {
    match text.grapheme_indices(true).nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Number of user-perceived characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 over `parts`, each terminated by a NUL so that
/// `("ab", "c")` and `("a", "bc")` differ.
pub fn fingerprint<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// `name` as a single path component: anything but letters, digits, `-`,
/// `_` and `.` becomes `_`.
pub fn safe_component(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    match safe.trim_matches('.') {
        "" => "_".to_string(),
        _ => safe,
    }
}

/// Join `path` onto the platform origin.
pub fn page_url(base_url: &str, path: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| AppError::config(format!("Invalid base URL '{base_url}': {e}")))?;
    base.join(path)
        .map_err(|e| AppError::config(format!("Invalid path '{path}': {e}")))
}

/// Keyword search URL: `<base><search_path>?q=<keyword>&serp_type=default`.
pub fn search_url(base_url: &str, search_path: &str, keyword: &str) -> Result<Url> {
    let mut url = page_url(base_url, search_path)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("q", keyword)
        .append_pair("serp_type", "default");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prefix_respects_graphemes() {
        assert_eq!(text_prefix("転職したい人へ", 2), "転職");
        assert_eq!(text_prefix("short", 50), "short");
        assert_eq!(text_prefix("e\u{301}abc", 1), "e\u{301}");
    }

    #[test]
    fn test_safe_component() {
        assert_eq!(safe_component("転職/副業"), "転職_副業");
        assert_eq!(safe_component("user.name"), "user.name");
        assert_eq!(safe_component(".."), "_");
        assert_eq!(safe_component(""), "_");
    }

    #[test]
    fn test_safe_component_keeps_date_names() {
        assert_eq!(safe_component("2025-04-01"), "2025-04-01");
        assert_eq!(safe_component("../2025-04-01"), ".._2025-04-01");
    }

    #[test]
    fn test_fingerprint_separates_parts() {
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
        assert_eq!(fingerprint(["x", "y"]), fingerprint(["x", "y"]));
        assert_eq!(fingerprint(["x"]).len(), 64);
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let url = search_url("https://www.threads.net", "/search", "転職 相談").unwrap();
        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "転職 相談".to_string()),
                ("serp_type".to_string(), "default".to_string())
            ]
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
    }
}
