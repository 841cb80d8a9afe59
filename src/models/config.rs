// src/models/config.rs

//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AccountDescriptor, TargetDescriptor};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Browser session and authentication settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Human-like pacing between browser interactions
    #[serde(default)]
    pub delays: DelayConfig,

    /// Feed extraction rules and selector chains
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Completion gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Content pipeline shape and concurrency
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Scheduling of partitioned posts
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Batch output locations and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// Harvest targets
    #[serde(default = "defaults::targets")]
    pub targets: Vec<TargetDescriptor>,

    /// Destination accounts
    #[serde(default)]
    pub accounts: Vec<AccountDescriptor>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&TargetDescriptor> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Names of all configured targets, in file order.
    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.session.base_url.trim().is_empty() {
            return Err(AppError::validation("session.base_url is empty"));
        }
        if self.session.wait_timeout_secs == 0 {
            return Err(AppError::validation("session.wait_timeout_secs must be > 0"));
        }
        self.delays.validate()?;

        if self.extraction.max_attempts == 0 {
            return Err(AppError::validation("extraction.max_attempts must be > 0"));
        }
        if self.extraction.scrolls_per_attempt == 0 {
            return Err(AppError::validation(
                "extraction.scrolls_per_attempt must be > 0",
            ));
        }
        if self.extraction.dedup_prefix_chars == 0 {
            return Err(AppError::validation(
                "extraction.dedup_prefix_chars must be > 0",
            ));
        }
        if self.extraction.author_min_chars > self.extraction.author_max_chars {
            return Err(AppError::validation(
                "extraction.author_min_chars exceeds author_max_chars",
            ));
        }
        let selectors = &self.extraction.selectors;
        for (field, chain) in [
            ("containers", &selectors.containers),
            ("author", &selectors.author),
            ("text", &selectors.text),
            ("likes", &selectors.likes),
        ] {
            if chain.is_empty() {
                return Err(AppError::validation(format!(
                    "extraction.selectors.{field} has no selector groups"
                )));
            }
        }

        if self.gateway.model.trim().is_empty() {
            return Err(AppError::validation("gateway.model is empty"));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(AppError::validation("gateway.timeout_secs must be > 0"));
        }
        if self.gateway.max_output_tokens == 0 {
            return Err(AppError::validation("gateway.max_output_tokens must be > 0"));
        }
        if self.pipeline.workers == 0 {
            return Err(AppError::validation("pipeline.workers must be > 0"));
        }
        if self.pipeline.fanout_workers == 0 || self.pipeline.fanout_workers > self.pipeline.workers
        {
            return Err(AppError::validation(
                "pipeline.fanout_workers must be between 1 and pipeline.workers",
            ));
        }
        if self.schedule.step_minutes == 0 {
            return Err(AppError::validation("schedule.step_minutes must be > 0"));
        }
        if self.storage.retention == 0 {
            return Err(AppError::validation("storage.retention must be > 0"));
        }

        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }
        let mut names = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(AppError::validation("Target with empty name"));
            }
            if !names.insert(target.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate target name '{}'",
                    target.name
                )));
            }
        }
        for account in &self.accounts {
            if !names.contains(account.target.as_str()) {
                return Err(AppError::validation(format!(
                    "Account '{}' refers to unknown target '{}'",
                    account.username, account.target
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            delays: DelayConfig::default(),
            extraction: ExtractionConfig::default(),
            gateway: GatewayConfig::default(),
            pipeline: PipelineConfig::default(),
            schedule: ScheduleConfig::default(),
            storage: StorageConfig::default(),
            targets: defaults::targets(),
            accounts: Vec::new(),
        }
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Platform origin, e.g. `https://www.threads.net`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the login page
    #[serde(default = "defaults::login_path")]
    pub login_path: String,

    /// Path of the keyword search page
    #[serde(default = "defaults::search_path")]
    pub search_path: String,

    /// Run Chrome without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Browser window size in pixels
    #[serde(default = "defaults::window_size")]
    pub window_size: (u32, u32),

    /// User-Agent presented by the browser
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Browser UI language
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Directory holding one cookie file per operator account
    #[serde(default = "defaults::cookie_dir")]
    pub cookie_dir: PathBuf,

    /// Selector counted to measure how many feed items are loaded
    #[serde(default = "defaults::item_selector")]
    pub item_selector: String,

    /// Page text that marks the end of a feed
    #[serde(default = "defaults::end_of_feed_markers")]
    pub end_of_feed_markers: Vec<String>,

    /// Bound for every browser wait
    #[serde(default = "defaults::wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Abort a target's harvest when login fails instead of scraping anonymously
    #[serde(default)]
    pub login_required: bool,

    /// Prefix of the credential environment variables
    #[serde(default = "defaults::credentials_env_prefix")]
    pub credentials_env_prefix: String,
}

impl SessionConfig {
    /// Wait bound as a Duration.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Cookie file for an operator account.
    pub fn cookie_file(&self, account: &str) -> PathBuf {
        let name = if account.is_empty() {
            "anonymous".to_string()
        } else {
            crate::utils::safe_component(account)
        };
        self.cookie_dir.join(format!("cookies_{name}.json"))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            login_path: defaults::login_path(),
            search_path: defaults::search_path(),
            headless: defaults::headless(),
            window_size: defaults::window_size(),
            user_agent: defaults::user_agent(),
            language: defaults::language(),
            cookie_dir: defaults::cookie_dir(),
            item_selector: defaults::item_selector(),
            end_of_feed_markers: defaults::end_of_feed_markers(),
            wait_timeout_secs: defaults::wait_timeout(),
            login_required: false,
            credentials_env_prefix: defaults::credentials_env_prefix(),
        }
    }
}

/// A closed range of seconds sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range that never sleeps.
    pub const fn zero() -> Self {
        Self { min: 0.0, max: 0.0 }
    }

    pub fn is_zero(&self) -> bool {
        self.max <= 0.0
    }

    /// Draw a delay from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.is_zero() {
            return Duration::ZERO;
        }
        let secs = if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min < 0.0 || self.max < self.min {
            return Err(AppError::validation(format!(
                "delays.{name} must satisfy 0 <= min <= max"
            )));
        }
        Ok(())
    }
}

/// Pacing between browser interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Pause after every ordinary interaction
    #[serde(default = "defaults::baseline_delay")]
    pub baseline: DelayRange,

    /// Pause after heavy operations such as login or reload
    #[serde(default = "defaults::heavy_delay")]
    pub heavy: DelayRange,

    /// Pause after a scroll, waiting for incremental content
    #[serde(default = "defaults::settle_delay")]
    pub settle: DelayRange,

    /// Pause between typed characters
    #[serde(default = "defaults::keystroke_delay")]
    pub keystroke: DelayRange,

    /// Pause between pointer path steps
    #[serde(default = "defaults::pointer_step_delay")]
    pub pointer_step: DelayRange,

    /// Chance that a forward scroll is preceded by a small reversal
    #[serde(default = "defaults::reversal_probability")]
    pub reversal_probability: f64,
}

impl DelayConfig {
    /// Pacing with every delay disabled.
    pub fn none() -> Self {
        Self {
            baseline: DelayRange::zero(),
            heavy: DelayRange::zero(),
            settle: DelayRange::zero(),
            keystroke: DelayRange::zero(),
            pointer_step: DelayRange::zero(),
            reversal_probability: defaults::reversal_probability(),
        }
    }

    fn validate(&self) -> Result<()> {
        self.baseline.validate("baseline")?;
        self.heavy.validate("heavy")?;
        self.settle.validate("settle")?;
        self.keystroke.validate("keystroke")?;
        self.pointer_step.validate("pointer_step")?;
        if !(0.0..=1.0).contains(&self.reversal_probability) {
            return Err(AppError::validation(
                "delays.reversal_probability must be within 0..=1",
            ));
        }
        Ok(())
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            baseline: defaults::baseline_delay(),
            heavy: defaults::heavy_delay(),
            settle: defaults::settle_delay(),
            keystroke: defaults::keystroke_delay(),
            pointer_step: defaults::pointer_step_delay(),
            reversal_probability: defaults::reversal_probability(),
        }
    }
}

/// Feed extraction rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Upper bound on scroll-and-parse rounds per extraction call
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: usize,

    /// Consecutive empty rounds before the page is reloaded
    #[serde(default = "defaults::stalls_before_reload")]
    pub stalls_before_reload: usize,

    /// Scroll steps performed by a strategy in one round
    #[serde(default = "defaults::scrolls_per_attempt")]
    pub scrolls_per_attempt: usize,

    /// Leading characters of the text folded into the dedup key
    #[serde(default = "defaults::dedup_prefix_chars")]
    pub dedup_prefix_chars: usize,

    /// Shortest text accepted as content
    #[serde(default = "defaults::min_text_chars")]
    pub min_text_chars: usize,

    /// Longest text accepted as content
    #[serde(default = "defaults::max_text_chars")]
    pub max_text_chars: usize,

    /// Author handle length bounds
    #[serde(default = "defaults::author_min_chars")]
    pub author_min_chars: usize,
    #[serde(default = "defaults::author_max_chars")]
    pub author_max_chars: usize,

    /// Labels of interface chrome (buttons, counters, relative times)
    #[serde(default = "defaults::ui_labels")]
    pub ui_labels: Vec<String>,

    /// Texts longer than this are never treated as a label match
    #[serde(default = "defaults::ui_label_max_chars")]
    pub ui_label_max_chars: usize,

    /// Phrases that mark a post as spam
    #[serde(default = "defaults::spam_patterns")]
    pub spam_patterns: Vec<String>,

    /// Images at or below this size are treated as avatars or icons
    #[serde(default = "defaults::avatar_max_px")]
    pub avatar_max_px: u32,

    /// Skip posts carrying images or video
    #[serde(default = "defaults::exclude_media")]
    pub exclude_media: bool,

    /// Ordered selector groups per field
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            stalls_before_reload: defaults::stalls_before_reload(),
            scrolls_per_attempt: defaults::scrolls_per_attempt(),
            dedup_prefix_chars: defaults::dedup_prefix_chars(),
            min_text_chars: defaults::min_text_chars(),
            max_text_chars: defaults::max_text_chars(),
            author_min_chars: defaults::author_min_chars(),
            author_max_chars: defaults::author_max_chars(),
            ui_labels: defaults::ui_labels(),
            ui_label_max_chars: defaults::ui_label_max_chars(),
            spam_patterns: defaults::spam_patterns(),
            avatar_max_px: defaults::avatar_max_px(),
            exclude_media: defaults::exclude_media(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// Ordered CSS selector groups, highest priority first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "defaults::container_selectors")]
    pub containers: Vec<String>,
    #[serde(default = "defaults::author_selectors")]
    pub author: Vec<String>,
    #[serde(default = "defaults::text_selectors")]
    pub text: Vec<String>,
    #[serde(default = "defaults::likes_selectors")]
    pub likes: Vec<String>,
    #[serde(default = "defaults::username_field_selectors")]
    pub username_field: Vec<String>,
    #[serde(default = "defaults::password_field_selectors")]
    pub password_field: Vec<String>,
    #[serde(default = "defaults::login_button_selectors")]
    pub login_button: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            containers: defaults::container_selectors(),
            author: defaults::author_selectors(),
            text: defaults::text_selectors(),
            likes: defaults::likes_selectors(),
            username_field: defaults::username_field_selectors(),
            password_field: defaults::password_field_selectors(),
            login_button: defaults::login_button_selectors(),
        }
    }
}

/// Completion gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "defaults::gateway_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds
    #[serde(default = "defaults::gateway_timeout")]
    pub timeout_secs: u64,

    /// Output token budget for every call
    #[serde(default = "defaults::max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature used for legacy models
    #[serde(default = "defaults::legacy_temperature")]
    pub legacy_temperature: f32,

    /// Version tag of the dispatch table
    #[serde(default = "defaults::dispatch_version")]
    pub dispatch_version: String,

    /// Substrings that mark a model as new-generation
    #[serde(default = "defaults::new_generation_markers")]
    pub new_generation_markers: Vec<String>,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::gateway_url(),
            model: defaults::model(),
            api_key_env: defaults::api_key_env(),
            timeout_secs: defaults::gateway_timeout(),
            max_output_tokens: defaults::max_output_tokens(),
            legacy_temperature: defaults::legacy_temperature(),
            dispatch_version: defaults::dispatch_version(),
            new_generation_markers: defaults::new_generation_markers(),
        }
    }
}

/// How the per-post stages are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    /// Analyze, then build a template, then generate per target
    #[default]
    ThreeStage,
    /// One call produces analysis and template together
    Combined,
}

/// Content pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Posts processed in parallel
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Generation calls in flight across all posts
    #[serde(default = "defaults::fanout_workers")]
    pub fanout_workers: usize,

    #[serde(default)]
    pub shape: PipelineShape,

    /// Cancel the whole run after this many seconds
    #[serde(default)]
    pub max_runtime_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: defaults::workers(),
            fanout_workers: defaults::fanout_workers(),
            shape: PipelineShape::default(),
            max_runtime_secs: None,
        }
    }
}

/// Scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between consecutive posts of one account
    #[serde(default = "defaults::step_minutes")]
    pub step_minutes: u32,
}

impl ScheduleConfig {
    pub fn step(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.step_minutes))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            step_minutes: defaults::step_minutes(),
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for scheduled batches and latest pointers
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Root for raw harvest archives
    #[serde(default = "defaults::raw_dir")]
    pub raw_dir: PathBuf,

    /// Batch directories kept per target
    #[serde(default = "defaults::retention")]
    pub retention: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            raw_dir: defaults::raw_dir(),
            retention: defaults::retention(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::DelayRange;
    use crate::models::TargetDescriptor;

    // Session defaults
    pub fn base_url() -> String {
        "https://www.threads.net".into()
    }
    pub fn login_path() -> String {
        "/login".into()
    }
    pub fn search_path() -> String {
        "/search".into()
    }
    pub fn headless() -> bool {
        true
    }
    pub fn window_size() -> (u32, u32) {
        (1280, 800)
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".into()
    }
    pub fn language() -> String {
        "ja-JP".into()
    }
    pub fn cookie_dir() -> PathBuf {
        PathBuf::from("data/cookies")
    }
    pub fn item_selector() -> String {
        "div[data-pressable-container='true'], article, div[role='article']".into()
    }
    pub fn end_of_feed_markers() -> Vec<String> {
        vec![
            "これ以上の投稿はありません".into(),
            "すべての投稿を見ました".into(),
            "No more posts".into(),
            "End of feed".into(),
        ]
    }
    pub fn wait_timeout() -> u64 {
        20
    }
    pub fn credentials_env_prefix() -> String {
        "THREADS".into()
    }

    // Delay defaults
    pub fn baseline_delay() -> DelayRange {
        DelayRange::new(1.0, 3.5)
    }
    pub fn heavy_delay() -> DelayRange {
        DelayRange::new(5.0, 8.0)
    }
    pub fn settle_delay() -> DelayRange {
        DelayRange::new(2.0, 4.0)
    }
    pub fn keystroke_delay() -> DelayRange {
        DelayRange::new(0.05, 0.15)
    }
    pub fn pointer_step_delay() -> DelayRange {
        DelayRange::new(0.01, 0.03)
    }
    pub fn reversal_probability() -> f64 {
        0.10
    }

    // Extraction defaults
    pub fn max_attempts() -> usize {
        20
    }
    pub fn stalls_before_reload() -> usize {
        3
    }
    pub fn scrolls_per_attempt() -> usize {
        8
    }
    pub fn dedup_prefix_chars() -> usize {
        50
    }
    pub fn min_text_chars() -> usize {
        5
    }
    pub fn max_text_chars() -> usize {
        5000
    }
    pub fn author_min_chars() -> usize {
        3
    }
    pub fn author_max_chars() -> usize {
        29
    }
    pub fn ui_labels() -> Vec<String> {
        [
            "いいね", "返信", "再投稿", "シェア", "フォローする", "フォロー", "もっと見る",
            "翻訳を見る", "Like", "Reply", "Repost", "Share", "Follow", "More", "Translate",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn ui_label_max_chars() -> usize {
        16
    }
    pub fn spam_patterns() -> Vec<String> {
        [
            "100円note", "月5万", "裏技", "副業", "スキル０", "在宅", "稼げる", "Line登録",
            "LINE登録", "権利収入", "不労所得",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn avatar_max_px() -> u32 {
        64
    }
    pub fn exclude_media() -> bool {
        true
    }

    // Selector defaults
    pub fn container_selectors() -> Vec<String> {
        vec![
            "div.x1ypdohk.x1n2onr6.xvuun6i".into(),
            "div[data-pressable-container='true']".into(),
            "div.xrvj5dj".into(),
            "article".into(),
            "div[role='article']".into(),
        ]
    }
    pub fn author_selectors() -> Vec<String> {
        vec![
            "span.x1lliihq.x193iq5w.x6ikm8r.x10wlt62.xlyipyv.xuxw1ft".into(),
            "a[href^='/@'] span".into(),
            "span[translate='no']".into(),
            "a[href^='/@']".into(),
        ]
    }
    pub fn text_selectors() -> Vec<String> {
        vec![
            "div.x1a6qonq span.x1lliihq.x1plvlek.xryxfnj".into(),
            "span.x1lliihq[dir='auto'][style*='line-clamp']".into(),
            "span[dir='auto']:not([translate='no'])".into(),
            "div.xzsf02u.x1a2a7pz div span".into(),
        ]
    }
    pub fn likes_selectors() -> Vec<String> {
        vec![
            "span.x17qophe.x10l6tqk.x13vifvy".into(),
            "div.xu9jpxn span.x17qophe".into(),
            "svg[aria-label='「いいね！」'] ~ span span".into(),
            "svg[aria-label='Like'] ~ span span".into(),
            "div[role='button'] span span[dir='auto']".into(),
        ]
    }
    pub fn username_field_selectors() -> Vec<String> {
        vec![
            "input[placeholder*='ユーザーネーム']".into(),
            "input[autocomplete='username']".into(),
            "input[type='text'][autocapitalize='none']".into(),
            "input[type='text']".into(),
        ]
    }
    pub fn password_field_selectors() -> Vec<String> {
        vec!["input[type='password']".into()]
    }
    pub fn login_button_selectors() -> Vec<String> {
        vec![
            "div[role='button'][type='submit']".into(),
            "button[type='submit']".into(),
            "div.x1i10hfl[role='button']".into(),
        ]
    }

    // Gateway defaults
    pub fn gateway_url() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn model() -> String {
        "gpt-4.1-2025-04-14".into()
    }
    pub fn api_key_env() -> String {
        "OPENAI_API_KEY".into()
    }
    pub fn gateway_timeout() -> u64 {
        120
    }
    pub fn max_output_tokens() -> u32 {
        4000
    }
    pub fn legacy_temperature() -> f32 {
        0.7
    }
    pub fn dispatch_version() -> String {
        "2025-04".into()
    }
    pub fn new_generation_markers() -> Vec<String> {
        ["o1", "o3", "gpt-4o", "gpt-4-1106-preview", "gpt-4.1", "gpt-5"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Pipeline defaults
    pub fn workers() -> usize {
        4
    }
    pub fn fanout_workers() -> usize {
        4
    }
    pub fn step_minutes() -> u32 {
        60
    }

    // Storage defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("data/output-post")
    }
    pub fn raw_dir() -> PathBuf {
        PathBuf::from("data/raw")
    }
    pub fn retention() -> usize {
        10
    }

    pub fn targets() -> Vec<TargetDescriptor> {
        vec![TargetDescriptor::named("general")]
    }
}
