// src/storage/input.rs

//! Pre-harvested post tables, an alternate entry point that skips the browser.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::PostRecord;
use crate::services::parse_like_count;

const REQUIRED_COLUMNS: [&str; 2] = ["username", "post_text"];

#[derive(Debug, Deserialize)]
struct InputRow {
    username: String,
    post_text: String,
    #[serde(default)]
    likes: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

/// A post read from a table, optionally pinned to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPost {
    pub record: PostRecord,
    /// Fan out only to this target; `None` means every target
    pub target: Option<String>,
}

/// Read `username, post_text[, likes][, target]` rows from a CSV file.
///
/// Missing `likes` read as 0. Rows with blank text are skipped.
pub async fn read_posts_csv(path: impl AsRef<Path>, prefix_chars: usize) -> Result<Vec<InputPost>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let posts = parse_posts(&bytes, prefix_chars)?;
    log::info!("Loaded {} posts from {}", posts.len(), path.display());
    Ok(posts)
}

fn parse_posts(bytes: &[u8], prefix_chars: usize) -> Result<Vec<InputPost>> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(AppError::validation(format!(
                "Input table is missing the '{column}' column"
            )));
        }
    }

    let mut posts = Vec::new();
    for (line, row) in reader.deserialize::<InputRow>().enumerate() {
        let row = row?;
        let text = row.post_text.trim();
        if text.is_empty() {
            log::debug!("Row {} has no text, skipping", line + 2);
            continue;
        }
        let likes = row
            .likes
            .as_deref()
            .and_then(parse_like_count)
            .unwrap_or(0);
        let target = row
            .target
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        posts.push(InputPost {
            record: PostRecord::new(row.username.trim(), text, likes, None, prefix_chars),
            target,
        });
    }
    Ok(posts)
}
