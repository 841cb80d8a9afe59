// src/pipeline/publish.rs

//! Publish stage: partition results across accounts and write one batch per target.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use rand::Rng;

use crate::context::RunContext;
use crate::error::{AppError, Result};
use crate::models::{PipelineResult, accounts_by_target};
use crate::services::{OutputPartitioner, TargetBatch};
use crate::storage::{BatchLocation, BatchSink, enforce_retention};

/// Batches written plus the targets whose write failed.
#[derive(Debug, Default)]
pub struct PublishOutcome {
    pub batches: Vec<BatchLocation>,
    pub failures: Vec<(String, AppError)>,
}

/// Partition `results` and persist every target independently.
pub async fn publish<S, R>(
    ctx: &RunContext,
    sink: &S,
    results: BTreeMap<String, Vec<PipelineResult>>,
    run_at: DateTime<FixedOffset>,
    rng: &mut R,
) -> PublishOutcome
where
    S: BatchSink + ?Sized,
    R: Rng + ?Sized,
{
    let partitioner = OutputPartitioner::new(ctx.config.schedule.step());
    let accounts = accounts_by_target(&ctx.config.accounts);
    let batches = partitioner.partition(results, &accounts, run_at, rng);

    let mut outcome = PublishOutcome::default();
    for batch in batches {
        if ctx.is_cancelled() {
            outcome
                .failures
                .push((batch.target.clone(), AppError::cancelled("publish")));
            continue;
        }
        match persist(ctx, sink, &batch, run_at).await {
            Ok(location) => outcome.batches.push(location),
            Err(e) => outcome.failures.push((batch.target, e)),
        }
    }
    outcome
}

async fn persist<S: BatchSink + ?Sized>(
    ctx: &RunContext,
    sink: &S,
    batch: &TargetBatch,
    run_at: DateTime<FixedOffset>,
) -> Result<BatchLocation> {
    for (account, count) in batch.per_account() {
        log::info!("[{}] {} -> {} posts", batch.target, account, count);
    }
    let location = sink.write_batch(&batch.target, run_at, &batch.posts).await?;
    // The batch is on disk already; a stale latest pointer does not undo it.
    if let Err(e) = sink.point_latest(&location).await {
        log::warn!("[{}] latest pointer not updated: {}", batch.target, e);
    }
    if let Err(e) = enforce_retention(sink, &batch.target, ctx.config.storage.retention).await {
        log::warn!("[{}] retention cleanup failed: {}", batch.target, e);
    }
    Ok(location)
}
