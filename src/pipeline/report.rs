// src/pipeline/report.rs

//! Per-run counters and the closing summary.

use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::services::PipelineOutcome;
use crate::storage::BatchLocation;

/// What a run did, reported once at the end.
#[derive(Debug)]
pub struct RunReport {
    started: Instant,
    pub posts_collected: usize,
    pub units_attempted: usize,
    pub units_succeeded: usize,
    pub batches: Vec<BatchLocation>,
    /// Target name and the error that stopped it
    pub failed_targets: Vec<(String, String)>,
    pub cancelled: bool,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            posts_collected: 0,
            units_attempted: 0,
            units_succeeded: 0,
            batches: Vec::new(),
            failed_targets: Vec::new(),
            cancelled: false,
        }
    }

    pub fn record_failure(&mut self, target: &str, error: &AppError) {
        log::error!("[{}] {}", target, error);
        if matches!(error, AppError::Cancelled(_)) {
            self.cancelled = true;
        }
        self.failed_targets.push((target.to_string(), error.to_string()));
    }

    pub fn record_generation(&mut self, outcome: &PipelineOutcome) {
        self.units_attempted += outcome.units_attempted;
        self.units_succeeded += outcome.units_succeeded;
    }

    pub fn batches_written(&self) -> usize {
        self.batches.len()
    }

    pub fn rows_written(&self) -> usize {
        self.batches.iter().map(|b| b.rows).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True when no target failed.
    pub fn is_clean(&self) -> bool {
        self.failed_targets.is_empty() && !self.cancelled
    }

    /// `Err` when the run was cancelled or any target failed.
    pub fn ensure_clean(&self) -> Result<()> {
        if self.cancelled {
            return Err(AppError::cancelled("run"));
        }
        if self.failed_targets.is_empty() {
            return Ok(());
        }
        let targets: Vec<&str> = self.failed_targets.iter().map(|(t, _)| t.as_str()).collect();
        Err(AppError::Incomplete {
            count: targets.len(),
            targets: targets.join(", "),
        })
    }

    pub fn log_summary(&self) {
        log::info!("Run finished in {:.1}s", self.elapsed().as_secs_f64());
        log::info!("  Posts collected:  {}", self.posts_collected);
        log::info!(
            "  Units succeeded:  {}/{}",
            self.units_succeeded,
            self.units_attempted
        );
        log::info!(
            "  Batches written:  {} ({} rows)",
            self.batches_written(),
            self.rows_written()
        );
        for batch in &self.batches {
            log::info!("    {} -> {}", batch.target, batch.path.display());
        }
        if self.cancelled {
            log::warn!("  Run was cancelled before completion");
        }
        if !self.failed_targets.is_empty() {
            log::warn!("  Failed targets:   {}", self.failed_targets.len());
            for (target, reason) in &self.failed_targets {
                log::warn!("    {}: {}", target, reason);
            }
        }
    }
}
