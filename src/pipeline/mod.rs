// src/pipeline/mod.rs

//! Pipeline entry points.
//!
//! - `run_all`: Harvest, generate, partition and persist
//! - `run_harvest`: Harvest and archive raw posts
//! - `run_generate`: Generate from a pre-harvested table
//! - `list_batches`: Stored batch directories for a target

pub mod generate;
pub mod harvest;
pub mod prompts;
pub mod publish;
pub mod report;
pub mod run;

pub use harvest::{HarvestOutcome, harvest_targets};
pub use report::RunReport;
pub use run::{list_batches, run_all, run_generate, run_harvest};
