// src/services/noise.rs

//! Separates post content from interface chrome and spam.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::ExtractionConfig;
use crate::utils::char_len;

const RELATIVE_TIME_PATTERNS: &[&str] = &[
    r"^\d+\s*(秒|分|時間|日|週間|週|か月|ヶ月|年)(前)?$",
    r"(?i)^\d+\s*(s|m|h|d|w|y)$",
    r"(?i)^\d+\s*(sec|secs|second|seconds|min|mins|minute|minutes|hour|hours|day|days|week|weeks|month|months|year|years)(\s+ago)?$",
    r"(?i)^(たった今|今日|昨日|just now|yesterday)$",
];

const COUNTER_PATTERN: &str = r"^[\d.,]+\s*[KkMm千万億]?$";

/// Compiled chrome, spam and plausibility rules.
#[derive(Debug)]
pub struct NoiseFilter {
    min_text_chars: usize,
    max_text_chars: usize,
    author_min_chars: usize,
    author_max_chars: usize,
    ui_label_max_chars: usize,
    ui_labels: Vec<String>,
    spam_patterns: Vec<String>,
    counter: Regex,
    relative_time: Vec<Regex>,
}

impl NoiseFilter {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::config(format!("Bad pattern '{pattern}': {e}")))
        };
        Ok(Self {
            min_text_chars: config.min_text_chars,
            max_text_chars: config.max_text_chars,
            author_min_chars: config.author_min_chars,
            author_max_chars: config.author_max_chars,
            ui_label_max_chars: config.ui_label_max_chars,
            ui_labels: config.ui_labels.clone(),
            spam_patterns: config.spam_patterns.clone(),
            counter: compile(COUNTER_PATTERN)?,
            relative_time: RELATIVE_TIME_PATTERNS
                .iter()
                .map(|p| compile(*p))
                .collect::<Result<_>>()?,
        })
    }

    /// Whether `text` is interface chrome rather than content.
    pub fn is_chrome(&self, text: &str) -> bool {
        let text = text.trim();
        let len = char_len(text);
        if len < self.min_text_chars {
            return true;
        }
        if self.counter.is_match(text) {
            return true;
        }
        if self.relative_time.iter().any(|re| re.is_match(text)) {
            return true;
        }
        // Label substrings only count on short texts; real posts mention "フォロー" too.
        self.ui_labels.iter().any(|label| {
            text == label || (len <= self.ui_label_max_chars && text.contains(label.as_str()))
        })
    }

    pub fn is_spam(&self, text: &str) -> bool {
        self.spam_patterns.iter().any(|p| text.contains(p.as_str()))
    }

    /// Content plausibility: length bounds and not chrome.
    pub fn plausible_text(&self, text: &str) -> bool {
        char_len(text.trim()) <= self.max_text_chars && !self.is_chrome(text)
    }

    /// Handle plausibility: length bounds, handle characters, not purely numeric.
    pub fn plausible_author(&self, handle: &str) -> bool {
        let len = char_len(handle);
        len >= self.author_min_chars
            && len <= self.author_max_chars
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            && !handle.chars().all(|c| c.is_ascii_digit())
            && !self.ui_labels.iter().any(|label| handle == label)
    }
}

/// Strip the `@` prefix and surrounding whitespace from a handle.
pub fn normalize_handle(raw: &str) -> &str {
    raw.trim().trim_start_matches('@').trim()
}
