// src/models/output.rs

//! Generated content and its scheduled form.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Output of a fully successful transformation for one post and one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineResult {
    pub source_author: String,
    pub target_name: String,
    pub generated_text: String,
}

/// A time-stamped post assigned to a destination account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledPost {
    pub account: String,
    pub content: String,
    pub reply_content: String,
    pub reply_image: String,
    pub scheduled_time: DateTime<FixedOffset>,
}
