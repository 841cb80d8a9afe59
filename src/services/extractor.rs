// src/services/extractor.rs

//! Feed extraction.
//!
//! Drives a Session through scroll rounds, parses post containers out of the
//! rendered page and applies chrome, spam, media, like-count and dedup filters.

use std::collections::HashSet;
use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};

use super::fields::{FieldChain, FieldKind, ProfileLinkStrategy};
use super::likes::parse_like_count;
use super::media::MediaDetector;
use super::noise::NoiseFilter;
use crate::browser::{PageDriver, ScrollStrategy, Session};
use crate::error::{AppError, Result};
use crate::models::{Config, ExtractFilters, PostRecord, TargetDescriptor};
use crate::utils::{self, normalize_whitespace, text_prefix};

/// Characters of container text used to recognise an already processed container.
const CONTAINER_FINGERPRINT_CHARS: usize = 120;

/// Compiled selectors and filters, built once per run and shared by every extractor.
pub struct ExtractionRules {
    containers: Vec<(String, Selector)>,
    author: FieldChain,
    text: FieldChain,
    likes: FieldChain,
    noise: Arc<NoiseFilter>,
    media: MediaDetector,
    end_markers: Vec<String>,
    prefix_chars: usize,
    max_attempts: usize,
    stalls_before_reload: usize,
    scrolls_per_attempt: usize,
}

impl ExtractionRules {
    pub fn new(config: &Config) -> Result<Self> {
        let extraction = &config.extraction;
        let selectors = &extraction.selectors;
        let noise = Arc::new(NoiseFilter::new(extraction)?);

        let containers = selectors
            .containers
            .iter()
            .map(|raw| {
                Selector::parse(raw)
                    .map(|s| (raw.clone(), s))
                    .map_err(|e| AppError::selector(raw, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let author = FieldChain::from_selectors(
            FieldKind::Author,
            &selectors.author,
            &noise,
            vec![Box::new(ProfileLinkStrategy::new(Arc::clone(&noise))?)],
        )?;
        let text = FieldChain::from_selectors(FieldKind::Text, &selectors.text, &noise, vec![])?;
        let likes = FieldChain::from_selectors(FieldKind::Likes, &selectors.likes, &noise, vec![])?;

        Ok(Self {
            containers,
            author,
            text,
            likes,
            media: MediaDetector::new(extraction.avatar_max_px)?,
            noise,
            end_markers: config
                .session
                .end_of_feed_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            prefix_chars: extraction.dedup_prefix_chars,
            max_attempts: extraction.max_attempts,
            stalls_before_reload: extraction.stalls_before_reload.max(1),
            scrolls_per_attempt: extraction.scrolls_per_attempt,
        })
    }

    /// Parse one container into a record, or `None` when a filter rejects it.
    fn parse_container(
        &self,
        container: ElementRef<'_>,
        filters: &ExtractFilters,
    ) -> Result<Option<PostRecord>> {
        if filters.exclude_media && self.media.has_media(container) {
            return Ok(None);
        }
        let author = self.author.extract(container)?;
        let text = self.text.extract(container)?;
        if text == author || self.noise.is_spam(&text) {
            return Ok(None);
        }
        let like_count = self
            .likes
            .extract(container)
            .ok()
            .and_then(|raw| parse_like_count(&raw))
            .unwrap_or(0);
        if like_count < filters.min_likes {
            return Ok(None);
        }
        Ok(Some(PostRecord::new(
            author,
            text,
            like_count,
            filters.keyword.clone(),
            self.prefix_chars,
        )))
    }

    fn reached_end(&self, html: &str) -> bool {
        let lowered = html.to_lowercase();
        self.end_markers.iter().any(|m| lowered.contains(m))
    }
}

/// Outcome of parsing one page snapshot.
#[derive(Debug, Default)]
struct PageScan {
    new_containers: usize,
    end_of_feed: bool,
}

/// Mutable state of one `extract` call.
struct ScanState {
    /// Dedup keys returned so far
    seen: HashSet<String>,
    /// Containers already parsed on the current page load
    processed: HashSet<String>,
    records: Vec<PostRecord>,
}

/// Extracts posts from the page a Session currently shows.
pub struct FeedExtractor<'a, D: PageDriver> {
    session: &'a mut Session<D>,
    rules: &'a ExtractionRules,
}

impl<'a, D: PageDriver> FeedExtractor<'a, D> {
    pub fn new(session: &'a mut Session<D>, rules: &'a ExtractionRules) -> Self {
        Self { session, rules }
    }

    /// Collect up to `max_items` records from the current page.
    ///
    /// Returned records have pairwise distinct dedup keys and satisfy `filters`.
    /// Fails with `ExtractionTimeout` only when the attempt budget runs out
    /// without a single record.
    pub fn extract(&mut self, max_items: usize, filters: &ExtractFilters) -> Result<Vec<PostRecord>> {
        let mut state = ScanState {
            seen: HashSet::new(),
            processed: HashSet::new(),
            records: Vec::new(),
        };
        if max_items == 0 {
            return Ok(state.records);
        }

        let first = self.scan(&mut state, max_items, filters);
        if state.records.len() >= max_items || first.end_of_feed {
            return Ok(state.records);
        }

        let mut stalls = 0;
        let mut exhausted = true;
        for attempt in 0..self.rules.max_attempts {
            if self.session.is_cancelled() {
                log::info!("Extraction cancelled after {} records", state.records.len());
                exhausted = false;
                break;
            }
            let strategy = ScrollStrategy::for_attempt(attempt);
            let loaded = self
                .session
                .scroll_incrementally(strategy, self.rules.scrolls_per_attempt);
            log::debug!(
                "Attempt {}/{} ({}): {} items loaded",
                attempt + 1,
                self.rules.max_attempts,
                strategy.name(),
                loaded
            );

            let scan = self.scan(&mut state, max_items, filters);
            if state.records.len() >= max_items {
                exhausted = false;
                break;
            }
            if scan.end_of_feed {
                log::info!("End of feed reached with {} records", state.records.len());
                exhausted = false;
                break;
            }

            if scan.new_containers > 0 {
                stalls = 0;
                continue;
            }
            stalls += 1;
            if stalls >= self.rules.stalls_before_reload {
                log::info!("No new posts after {stalls} rounds, reloading");
                if self.session.reload() {
                    state.processed.clear();
                }
                stalls = 0;
            } else {
                self.session.jump_to_bottom();
            }
        }

        if state.records.is_empty() {
            if self.session.is_cancelled() {
                return Err(AppError::cancelled("extraction"));
            }
            if exhausted {
                return Err(AppError::timeout(format!(
                    "no posts after {} attempts",
                    self.rules.max_attempts
                )));
            }
        }
        Ok(state.records)
    }

    /// Harvest a target: each keyword's search results, or the home feed when it has none.
    pub fn harvest(
        &mut self,
        target: &TargetDescriptor,
        exclude_media: bool,
    ) -> Result<Vec<PostRecord>> {
        let config = self.session.config().clone();
        let mut collected: Vec<PostRecord> = Vec::new();
        let mut keys: HashSet<String> = HashSet::new();
        let base_filters = ExtractFilters {
            exclude_media,
            min_likes: target.min_likes,
            keyword: None,
        };

        if target.keywords.is_empty() {
            if !self.session.navigate_home() {
                return Err(AppError::browser("home feed unreachable"));
            }
            return self.extract(target.max_posts_total, &base_filters);
        }

        let mut last_error = None;
        for keyword in &target.keywords {
            let remaining = target.max_posts_total.saturating_sub(collected.len());
            if remaining == 0 || self.session.is_cancelled() {
                break;
            }
            let url = utils::search_url(&config.base_url, &config.search_path, keyword)?;
            if !self.session.navigate(url.as_str()) {
                last_error = Some(AppError::browser(format!("search for '{keyword}' unreachable")));
                continue;
            }
            let filters = ExtractFilters {
                keyword: Some(keyword.clone()),
                ..base_filters.clone()
            };
            match self.extract(target.max_posts_per_keyword.min(remaining), &filters) {
                Ok(records) => {
                    log::info!(
                        "[{}] keyword '{}': {} posts",
                        target.name,
                        keyword,
                        records.len()
                    );
                    for record in records {
                        if keys.insert(record.dedup_key.clone()) {
                            collected.push(record);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("[{}] keyword '{}' skipped: {}", target.name, keyword, e);
                    last_error = Some(e);
                }
            }
        }

        match (collected.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(collected),
        }
    }

    fn scan(&mut self, state: &mut ScanState, max_items: usize, filters: &ExtractFilters) -> PageScan {
        let Some(html) = self.session.page_html() else {
            return PageScan::default();
        };
        let mut scan = PageScan {
            end_of_feed: self.rules.reached_end(&html),
            ..PageScan::default()
        };

        let document = Html::parse_document(&html);
        let containers: Vec<ElementRef<'_>> = self
            .rules
            .containers
            .iter()
            .map(|(raw, selector)| (raw, document.select(selector).collect::<Vec<_>>()))
            .find(|(_, found)| !found.is_empty())
            .map(|(raw, found)| {
                log::trace!("{} containers via '{}'", found.len(), raw);
                found
            })
            .unwrap_or_default();

        for container in containers {
            if state.records.len() >= max_items {
                break;
            }
            let body = normalize_whitespace(&container.text().collect::<String>());
            let fingerprint = utils::fingerprint([text_prefix(&body, CONTAINER_FINGERPRINT_CHARS)]);
            if !state.processed.insert(fingerprint) {
                continue;
            }
            scan.new_containers += 1;

            match self.rules.parse_container(container, filters) {
                Ok(Some(record)) => {
                    if state.seen.insert(record.dedup_key.clone()) {
                        log::debug!(
                            "Post #{} by {} ({} likes)",
                            state.records.len() + 1,
                            record.author_handle,
                            record.like_count
                        );
                        state.records.push(record);
                    }
                }
                Ok(None) => {}
                Err(e) => log::trace!("Container skipped: {e}"),
            }
        }
        scan
    }
}
