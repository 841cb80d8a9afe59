// src/storage/local.rs

//! Local filesystem batch sink.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! reader sees either the previous state or the complete new file. CSV files
//! carry a UTF-8 byte order mark for spreadsheet tools.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PostRecord, ScheduledPost, StorageConfig};
use crate::storage::{BatchLocation, BatchSink};
use crate::utils::safe_component;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// One row of a scheduled batch file.
#[derive(Debug, Serialize, Deserialize)]
struct BatchRow {
    username: String,
    content: String,
    image: String,
    #[serde(rename = "replyContent")]
    reply_content: String,
    #[serde(rename = "replyImage")]
    reply_image: String,
    #[serde(rename = "scheduledTime")]
    scheduled_time: String,
}

impl From<&ScheduledPost> for BatchRow {
    fn from(post: &ScheduledPost) -> Self {
        Self {
            username: post.account.clone(),
            content: post.content.clone(),
            image: String::new(),
            reply_content: post.reply_content.clone(),
            reply_image: post.reply_image.clone(),
            scheduled_time: post.scheduled_time.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }
}

impl TryFrom<BatchRow> for ScheduledPost {
    type Error = AppError;

    fn try_from(row: BatchRow) -> Result<Self> {
        let scheduled_time = DateTime::parse_from_rfc3339(&row.scheduled_time).map_err(|e| {
            AppError::validation(format!("Bad scheduledTime '{}': {e}", row.scheduled_time))
        })?;
        Ok(Self {
            account: row.username,
            content: row.content,
            reply_content: row.reply_content,
            reply_image: row.reply_image,
            scheduled_time,
        })
    }
}

/// One row of a raw harvest archive.
#[derive(Debug, Serialize)]
struct HarvestRow<'a> {
    username: &'a str,
    post_text: &'a str,
    likes: u64,
    keyword: Option<&'a str>,
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    output_dir: PathBuf,
    raw_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage writing batches under `output_dir` and raw
    /// harvests under `raw_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            raw_dir: raw_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.output_dir, &config.raw_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn target_dir(&self, target: &str) -> PathBuf {
        self.output_dir.join(safe_component(target))
    }

    /// Path of the target's latest reference.
    pub fn latest_path(&self, target: &str) -> PathBuf {
        self.output_dir
            .join(format!("latest_{}.csv", safe_component(target)))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// First `{stem}.csv` or `{stem}_{n}.csv` in `dir` that does not exist yet.
    async fn unused_path(dir: &Path, stem: &str) -> Result<PathBuf> {
        let mut candidate = dir.join(format!("{stem}.csv"));
        let mut n = 1;
        while tokio::fs::try_exists(&candidate).await? {
            n += 1;
            candidate = dir.join(format!("{stem}_{n}.csv"));
        }
        Ok(candidate)
    }

    fn encode_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(BOM.to_vec());
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))
    }

    fn decode_batch(bytes: &[u8]) -> Result<Vec<ScheduledPost>> {
        let body = bytes.strip_prefix(BOM).unwrap_or(bytes);
        csv::Reader::from_reader(body)
            .into_deserialize::<BatchRow>()
            .map(|row| ScheduledPost::try_from(row?))
            .collect()
    }

    async fn write_batch_inner(
        &self,
        target: &str,
        run_at: DateTime<FixedOffset>,
        posts: &[ScheduledPost],
    ) -> Result<BatchLocation> {
        let directory = run_at.format("%Y-%m-%d").to_string();
        let dir = self.target_dir(target).join(&directory);
        tokio::fs::create_dir_all(&dir).await?;

        let path = Self::unused_path(&dir, &format!("batch_{}", run_at.format("%H%M%S"))).await?;
        let bytes = Self::encode_csv(posts.iter().map(BatchRow::from))?;
        Self::write_bytes(&path, &bytes).await?;

        Ok(BatchLocation {
            target: target.to_string(),
            directory,
            path,
            rows: posts.len(),
        })
    }
}

#[async_trait]
impl BatchSink for LocalStorage {
    async fn write_batch(
        &self,
        target: &str,
        run_at: DateTime<FixedOffset>,
        posts: &[ScheduledPost],
    ) -> Result<BatchLocation> {
        let location = self
            .write_batch_inner(target, run_at, posts)
            .await
            .map_err(|e| AppError::persistence(target, e))?;
        log::info!(
            "[{}] {} scheduled posts written to {}",
            target,
            location.rows,
            location.path.display()
        );
        Ok(location)
    }

    async fn point_latest(&self, batch: &BatchLocation) -> Result<()> {
        let bytes = tokio::fs::read(&batch.path)
            .await
            .map_err(|e| AppError::persistence(&batch.target, e))?;
        let latest = self.latest_path(&batch.target);
        Self::write_bytes(&latest, &bytes)
            .await
            .map_err(|e| AppError::persistence(&batch.target, e))?;
        log::debug!("[{}] latest -> {}", batch.target, batch.path.display());
        Ok(())
    }

    async fn list_batch_dirs(&self, target: &str) -> Result<Vec<String>> {
        let root = self.target_dir(target);
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    async fn delete_batch_dir(&self, target: &str, directory: &str) -> Result<()> {
        if directory != safe_component(directory) {
            return Err(AppError::validation(format!(
                "Refusing to delete '{directory}' outside the batch root"
            )));
        }
        tokio::fs::remove_dir_all(self.target_dir(target).join(directory))
            .await
            .map_err(|e| AppError::persistence(target, e))
    }

    async fn read_batch(&self, batch: &BatchLocation) -> Result<Vec<ScheduledPost>> {
        let bytes = tokio::fs::read(&batch.path).await?;
        Self::decode_batch(&bytes)
    }

    async fn write_harvest(
        &self,
        target: &str,
        run_at: DateTime<FixedOffset>,
        posts: &[PostRecord],
    ) -> Result<PathBuf> {
        let safe = safe_component(target);
        let dir = self
            .raw_dir
            .join(&safe)
            .join(run_at.format("%Y-%m-%d").to_string());
        let rows = posts.iter().map(|post| HarvestRow {
            username: &post.author_handle,
            post_text: &post.text,
            likes: post.like_count,
            keyword: post.source_keyword.as_deref(),
        });

        let write = async {
            tokio::fs::create_dir_all(&dir).await?;
            let path = Self::unused_path(&dir, &format!("{safe}_{}", run_at.format("%H%M%S"))).await?;
            let bytes = Self::encode_csv(rows)?;
            Self::write_bytes(&path, &bytes).await?;
            Ok::<_, AppError>(path)
        };
        let path = write.await.map_err(|e| AppError::persistence(target, e))?;
        log::info!("[{}] {} harvested posts archived to {}", target, posts.len(), path.display());
        Ok(path)
    }
}
