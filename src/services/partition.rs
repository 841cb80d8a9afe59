// src/services/partition.rs

//! Assigns pipeline results to destination accounts and schedules them.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset, TimeDelta};
use rand::Rng;
use rand::seq::{SliceRandom, index};

use crate::models::{AccountDescriptor, PipelineResult, ScheduledPost};

/// Scheduled posts for one target, ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBatch {
    pub target: String,
    pub posts: Vec<ScheduledPost>,
}

impl TargetBatch {
    /// Number of posts per account, in account order of first appearance.
    pub fn per_account(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for post in &self.posts {
            match counts.iter_mut().find(|(account, _)| *account == post.account) {
                Some((_, n)) => *n += 1,
                None => counts.push((post.account.clone(), 1)),
            }
        }
        counts
    }
}

/// Splits results fairly across accounts with per-account schedules.
#[derive(Debug, Clone, Copy)]
pub struct OutputPartitioner {
    step: TimeDelta,
}

impl OutputPartitioner {
    pub fn new(step: TimeDelta) -> Self {
        Self { step }
    }

    /// Partition every target that has at least one account.
    ///
    /// Targets with results but no accounts are logged and skipped.
    pub fn partition<R: Rng + ?Sized>(
        &self,
        results: BTreeMap<String, Vec<PipelineResult>>,
        accounts_by_target: &BTreeMap<String, Vec<AccountDescriptor>>,
        now: DateTime<FixedOffset>,
        rng: &mut R,
    ) -> Vec<TargetBatch> {
        let mut batches = Vec::with_capacity(results.len());
        for (target, target_results) in results {
            let accounts = accounts_by_target
                .get(&target)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if accounts.is_empty() {
                log::warn!(
                    "No accounts configured for '{}', dropping {} results",
                    target,
                    target_results.len()
                );
                continue;
            }
            if target_results.is_empty() {
                continue;
            }
            let posts = self.partition_target(target_results, accounts, now, rng);
            batches.push(TargetBatch { target, posts });
        }
        batches
    }

    /// Shuffle `results`, cut them into one contiguous chunk per account and
    /// stamp each chunk from `now` in `step` increments.
    ///
    /// Every account gets `P / A` results and `P % A` distinct accounts,
    /// drawn at random, get one more.
    pub fn partition_target<R: Rng + ?Sized>(
        &self,
        mut results: Vec<PipelineResult>,
        accounts: &[AccountDescriptor],
        now: DateTime<FixedOffset>,
        rng: &mut R,
    ) -> Vec<ScheduledPost> {
        if accounts.is_empty() {
            return Vec::new();
        }
        results.shuffle(rng);

        let base = results.len() / accounts.len();
        let remainder = results.len() % accounts.len();
        let bonus: HashSet<usize> = index::sample(rng, accounts.len(), remainder)
            .into_iter()
            .collect();

        let mut scheduled = Vec::with_capacity(results.len());
        let mut pending = results.into_iter();
        for (i, account) in accounts.iter().enumerate() {
            let size = base + usize::from(bonus.contains(&i));
            for (slot, result) in pending.by_ref().take(size).enumerate() {
                scheduled.push(ScheduledPost {
                    account: account.username.clone(),
                    content: result.generated_text,
                    reply_content: account.reply_content.clone(),
                    reply_image: account.reply_image.clone(),
                    scheduled_time: now + self.step * slot as i32,
                });
            }
        }
        scheduled
    }
}
