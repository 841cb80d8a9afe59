// src/models/post.rs

//! Harvested post records.

use serde::{Deserialize, Serialize};

use crate::utils;

/// A deduplicated, filtered post harvested from a feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Author handle without the leading `@`
    pub author_handle: String,

    /// Post body
    pub text: String,

    /// Parsed like count (0 when the counter could not be read)
    pub like_count: u64,

    /// Search keyword that surfaced the post, `None` for the home feed
    pub source_keyword: Option<String>,

    /// Hash of the author and the leading text characters
    pub dedup_key: String,
}

impl PostRecord {
    /// Build a record, deriving its dedup key from the first `prefix_chars`
    /// characters of `text`.
    pub fn new(
        author_handle: impl Into<String>,
        text: impl Into<String>,
        like_count: u64,
        source_keyword: Option<String>,
        prefix_chars: usize,
    ) -> Self {
        let author_handle = author_handle.into();
        let text = text.into();
        let dedup_key = Self::dedup_key_for(&author_handle, &text, prefix_chars);
        Self {
            author_handle,
            text,
            like_count,
            source_keyword,
            dedup_key,
        }
    }

    /// Stable identity of a post.
    pub fn dedup_key_for(author_handle: &str, text: &str, prefix_chars: usize) -> String {
        utils::fingerprint([author_handle, utils::text_prefix(text, prefix_chars)])
    }
}

/// Per-call filters for feed extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractFilters {
    /// Skip posts that carry images or video
    pub exclude_media: bool,

    /// Minimum like count
    pub min_likes: u64,

    /// Keyword recorded on every returned record
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_ignores_tail() {
        let a = PostRecord::new("writer", "同じ書き出しの投稿です。ここから違う", 3, None, 10);
        let b = PostRecord::new("writer", "同じ書き出しの投稿です。全く別の結末", 9, None, 10);
        assert_eq!(a.dedup_key, b.dedup_key);
    }

    #[test]
    fn test_dedup_key_depends_on_author() {
        let a = PostRecord::new("writer", "same text", 0, None, 50);
        let b = PostRecord::new("reader", "same text", 0, None, 50);
        assert_ne!(a.dedup_key, b.dedup_key);
    }
}
