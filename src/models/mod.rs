// src/models/mod.rs

//! Domain models shared by harvesting, generation and publishing.

mod config;
mod output;
mod post;
mod target;

pub use config::{
    Config, DelayConfig, DelayRange, ExtractionConfig, GatewayConfig, PipelineConfig,
    PipelineShape, ScheduleConfig, SelectorConfig, SessionConfig, StorageConfig,
};
pub use output::{PipelineResult, ScheduledPost};
pub use post::{ExtractFilters, PostRecord};
pub use target::{AccountDescriptor, TargetDescriptor, accounts_by_target};
