// src/services/mod.rs

//! Service layer.
//!
//! This module contains the business logic for:
//! - Feed extraction (`FeedExtractor`, `ExtractionRules`)
//! - Field fallback chains (`FieldChain`, `FieldStrategy`)
//! - LLM content generation (`ContentPipeline`)
//! - Account partitioning and scheduling (`OutputPartitioner`)

mod content;
mod extractor;
mod fields;
mod likes;
mod media;
mod noise;
mod partition;

pub use content::{ContentPipeline, PipelineOutcome, WorkItem};
pub use extractor::{ExtractionRules, FeedExtractor};
pub use fields::{FieldChain, FieldKind, FieldStrategy, ProfileLinkStrategy, SelectorStrategy};
pub use likes::parse_like_count;
pub use media::MediaDetector;
pub use noise::{NoiseFilter, normalize_handle};
pub use partition::{OutputPartitioner, TargetBatch};
