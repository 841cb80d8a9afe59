// src/storage/mod.rs

//! Batch sink for scheduled posts and the raw harvest archive.
//!
//! ## Directory Structure
//!
//! ```text
//! {output_dir}/
//! ├── latest_{target}.csv           # Copy of the newest batch per target
//! └── {target}/
//!     └── YYYY-MM-DD/               # One directory per run date, capped by retention
//!         └── batch_HHMMSS.csv
//! {raw_dir}/
//! └── {target}/
//!     └── YYYY-MM-DD/
//!         └── {target}_HHMMSS.csv   # Harvested posts before generation
//! ```

pub mod input;
pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::models::{PostRecord, ScheduledPost};

pub use input::{InputPost, read_posts_csv};
pub use local::LocalStorage;

/// Where a batch landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLocation {
    pub target: String,
    /// Date directory name (`YYYY-MM-DD`)
    pub directory: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Narrow write/list/delete interface consumed by the publish stage.
///
/// Writes are all-or-nothing: a batch is either fully visible or absent.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Write one new batch for `target`. Never touches earlier batches.
    async fn write_batch(
        &self,
        target: &str,
        run_at: DateTime<FixedOffset>,
        posts: &[ScheduledPost],
    ) -> Result<BatchLocation>;

    /// Make `batch` the target's latest reference.
    async fn point_latest(&self, batch: &BatchLocation) -> Result<()>;

    /// Batch directory names for `target`, oldest first.
    async fn list_batch_dirs(&self, target: &str) -> Result<Vec<String>>;

    /// Remove one batch directory and everything in it.
    async fn delete_batch_dir(&self, target: &str, directory: &str) -> Result<()>;

    /// Read a batch back.
    async fn read_batch(&self, batch: &BatchLocation) -> Result<Vec<ScheduledPost>>;

    /// Archive harvested posts for `target`.
    async fn write_harvest(
        &self,
        target: &str,
        run_at: DateTime<FixedOffset>,
        posts: &[PostRecord],
    ) -> Result<PathBuf>;
}

/// Delete the oldest batch directories of `target` until at most `cap` remain.
///
/// Returns the removed directory names.
pub async fn enforce_retention<S: BatchSink + ?Sized>(
    sink: &S,
    target: &str,
    cap: usize,
) -> Result<Vec<String>> {
    let dirs = sink.list_batch_dirs(target).await?;
    if dirs.len() <= cap {
        return Ok(Vec::new());
    }
    let excess = dirs.len() - cap;
    let mut removed = Vec::with_capacity(excess);
    for dir in dirs.into_iter().take(excess) {
        sink.delete_batch_dir(target, &dir).await?;
        log::info!("[{}] Pruned batch directory {}", target, dir);
        removed.push(dir);
    }
    Ok(removed)
}
