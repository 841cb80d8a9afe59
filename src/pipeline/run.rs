// src/pipeline/run.rs

//! Run entry points: full run, harvest only, and generation from a table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::generate::{generate, group_by_target, plan_from_harvest, plan_from_input};
use super::harvest::{HarvestOutcome, harvest_targets_with};
use super::publish::publish;
use super::report::RunReport;
use crate::browser::{ChromeDriver, Credentials, PageDriver, Session};
use crate::context::RunContext;
use crate::error::{AppError, Result};
use crate::gateway::CompletionGateway;
use crate::models::{PipelineResult, TargetDescriptor};
use crate::storage::{BatchSink, read_posts_csv};

fn run_started_at() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn chrome_opener(headless: bool) -> impl Fn(&RunContext) -> Result<Session<ChromeDriver>> + Send + Sync + 'static {
    move |ctx: &RunContext| Session::<ChromeDriver>::open(&ctx.config, headless, ctx.cancel.clone())
}

/// Harvest every target, generate, partition and persist.
pub async fn run_all<G, S>(
    ctx: &RunContext,
    sink: &S,
    gateway: Arc<G>,
    credentials: &[Credentials],
    headless: bool,
) -> RunReport
where
    G: CompletionGateway,
    S: BatchSink + ?Sized,
{
    run_all_with(ctx, sink, gateway, credentials, chrome_opener(headless)).await
}

/// `run_all` with Sessions built by `open`.
pub async fn run_all_with<G, S, D, F>(
    ctx: &RunContext,
    sink: &S,
    gateway: Arc<G>,
    credentials: &[Credentials],
    open: F,
) -> RunReport
where
    G: CompletionGateway,
    S: BatchSink + ?Sized,
    D: PageDriver + 'static,
    F: Fn(&RunContext) -> Result<Session<D>> + Send + Sync + 'static,
{
    let mut report = RunReport::new();
    let run_at = run_started_at();
    log::info!("Run started for {} targets", ctx.config.targets.len());

    log::info!("[1/3] Harvest");
    let harvest = harvest_targets_with(ctx, &ctx.config.targets, credentials, open).await;
    absorb_harvest(ctx, sink, &harvest, run_at, &mut report).await;
    for (target, error) in &harvest.failures {
        report.record_failure(target, error);
    }

    log::info!("[2/3] Generate");
    let work = plan_from_harvest(&harvest.posts);
    let outcome = generate(ctx, gateway, &work).await;
    report.record_generation(&outcome);

    log::info!("[3/3] Publish");
    publish_into(ctx, sink, group_by_target(outcome.results), run_at, &mut report).await;
    report
}

/// Harvest and archive only, optionally restricted to one target.
pub async fn run_harvest<S: BatchSink + ?Sized>(
    ctx: &RunContext,
    sink: &S,
    credentials: &[Credentials],
    headless: bool,
    only_target: Option<&str>,
) -> Result<RunReport> {
    run_harvest_with(ctx, sink, credentials, only_target, chrome_opener(headless)).await
}

/// `run_harvest` with Sessions built by `open`.
pub async fn run_harvest_with<S, D, F>(
    ctx: &RunContext,
    sink: &S,
    credentials: &[Credentials],
    only_target: Option<&str>,
    open: F,
) -> Result<RunReport>
where
    S: BatchSink + ?Sized,
    D: PageDriver + 'static,
    F: Fn(&RunContext) -> Result<Session<D>> + Send + Sync + 'static,
{
    let targets: Vec<TargetDescriptor> = match only_target {
        Some(name) => vec![
            ctx.config
                .target(name)
                .cloned()
                .ok_or_else(|| AppError::config(format!("Unknown target '{name}'")))?,
        ],
        None => ctx.config.targets.clone(),
    };

    let mut report = RunReport::new();
    let harvest = harvest_targets_with(ctx, &targets, credentials, open).await;
    absorb_harvest(ctx, sink, &harvest, run_started_at(), &mut report).await;
    for (target, error) in &harvest.failures {
        report.record_failure(target, error);
    }
    Ok(report)
}

/// Generate and publish from a pre-harvested table, skipping the browser.
pub async fn run_generate<G, S>(
    ctx: &RunContext,
    sink: &S,
    gateway: Arc<G>,
    input: &Path,
) -> Result<RunReport>
where
    G: CompletionGateway,
    S: BatchSink + ?Sized,
{
    let posts = read_posts_csv(input, ctx.config.extraction.dedup_prefix_chars).await?;
    let mut report = RunReport::new();
    report.posts_collected = posts.len();

    let work = plan_from_input(&posts, &ctx.config.target_names());
    let outcome = generate(ctx, gateway, &work).await;
    report.record_generation(&outcome);

    publish_into(ctx, sink, group_by_target(outcome.results), run_started_at(), &mut report).await;
    Ok(report)
}

/// Stored batch directories for a target, oldest first.
pub async fn list_batches<S: BatchSink + ?Sized>(sink: &S, target: &str) -> Result<Vec<String>> {
    sink.list_batch_dirs(target).await
}

async fn absorb_harvest<S: BatchSink + ?Sized>(
    ctx: &RunContext,
    sink: &S,
    harvest: &HarvestOutcome,
    run_at: DateTime<FixedOffset>,
    report: &mut RunReport,
) {
    report.posts_collected += harvest.total_posts();
    for (target, posts) in &harvest.posts {
        if posts.is_empty() || ctx.is_cancelled() {
            continue;
        }
        if let Err(e) = sink.write_harvest(target, run_at, posts).await {
            log::warn!("[{}] raw archive not written: {}", target, e);
        }
    }
}

async fn publish_into<S: BatchSink + ?Sized>(
    ctx: &RunContext,
    sink: &S,
    results: BTreeMap<String, Vec<PipelineResult>>,
    run_at: DateTime<FixedOffset>,
    report: &mut RunReport,
) {
    let mut rng = StdRng::from_os_rng();
    let published = publish(ctx, sink, results, run_at, &mut rng).await;
    report.batches.extend(published.batches);
    for (target, error) in &published.failures {
        report.record_failure(target, error);
    }
    if ctx.is_cancelled() {
        report.cancelled = true;
    }
}
