// src/services/fields.rs

//! Ordered fallback chains for pulling one field out of a post container.

use std::sync::Arc;

use scraper::{ElementRef, Selector};

use super::likes::parse_like_count;
use super::noise::{NoiseFilter, normalize_handle};
use crate::error::{AppError, Result};
use crate::utils::normalize_whitespace;

/// Fields read from a post container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Author,
    Text,
    Likes,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Text => "text",
            Self::Likes => "likes",
        }
    }
}

/// One way of extracting a field value from a container.
pub trait FieldStrategy: Send + Sync {
    /// Short description for logs.
    fn describe(&self) -> &str;

    /// A plausible value, or `None` when this strategy finds nothing usable.
    fn try_extract(&self, container: ElementRef<'_>) -> Option<String>;
}

/// Text of the elements matched by one selector group, filtered by field plausibility.
pub struct SelectorStrategy {
    raw: String,
    selector: Selector,
    kind: FieldKind,
    noise: Arc<NoiseFilter>,
}

impl SelectorStrategy {
    pub fn new(raw: &str, kind: FieldKind, noise: Arc<NoiseFilter>) -> Result<Self> {
        let selector = Selector::parse(raw).map_err(|e| AppError::selector(raw, e))?;
        Ok(Self {
            raw: raw.to_string(),
            selector,
            kind,
            noise,
        })
    }
}

impl FieldStrategy for SelectorStrategy {
    fn describe(&self) -> &str {
        &self.raw
    }

    fn try_extract(&self, container: ElementRef<'_>) -> Option<String> {
        let mut candidates = container
            .select(&self.selector)
            .map(|el| normalize_whitespace(&el.text().collect::<String>()));

        match self.kind {
            FieldKind::Author => candidates
                .map(|c| normalize_handle(&c).to_string())
                .find(|c| self.noise.plausible_author(c)),
            // The longest plausible block is the post body; shorter ones are captions or chrome.
            FieldKind::Text => candidates
                .filter(|c| self.noise.plausible_text(c))
                .max_by_key(|c| c.chars().count()),
            FieldKind::Likes => candidates.find(|c| parse_like_count(c).is_some()),
        }
    }
}

/// Author handle taken from a profile link's `href="/@handle"`.
pub struct ProfileLinkStrategy {
    selector: Selector,
    noise: Arc<NoiseFilter>,
}

impl ProfileLinkStrategy {
    pub fn new(noise: Arc<NoiseFilter>) -> Result<Self> {
        let raw = "a[href^='/@']";
        let selector = Selector::parse(raw).map_err(|e| AppError::selector(raw, e))?;
        Ok(Self { selector, noise })
    }
}

impl FieldStrategy for ProfileLinkStrategy {
    fn describe(&self) -> &str {
        "profile link href"
    }

    fn try_extract(&self, container: ElementRef<'_>) -> Option<String> {
        container
            .select(&self.selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| href.strip_prefix("/@"))
            .map(|rest| rest.split(['/', '?']).next().unwrap_or(rest).to_string())
            .find(|handle| self.noise.plausible_author(handle))
    }
}

/// Strategies tried in priority order; the first success wins.
pub struct FieldChain {
    kind: FieldKind,
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl FieldChain {
    pub fn new(kind: FieldKind, strategies: Vec<Box<dyn FieldStrategy>>) -> Self {
        Self { kind, strategies }
    }

    /// Chain of selector groups, optionally followed by extra fallbacks.
    pub fn from_selectors(
        kind: FieldKind,
        selectors: &[String],
        noise: &Arc<NoiseFilter>,
        fallbacks: Vec<Box<dyn FieldStrategy>>,
    ) -> Result<Self> {
        let mut strategies: Vec<Box<dyn FieldStrategy>> = Vec::with_capacity(selectors.len());
        for raw in selectors {
            strategies.push(Box::new(SelectorStrategy::new(raw, kind, Arc::clone(noise))?));
        }
        strategies.extend(fallbacks);
        Ok(Self::new(kind, strategies))
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// First plausible value, or `ParseMismatch` when every strategy comes up empty.
    pub fn extract(&self, container: ElementRef<'_>) -> Result<String> {
        self.strategies
            .iter()
            .find_map(|strategy| {
                let value = strategy.try_extract(container);
                if value.is_some() {
                    log::trace!("{} via '{}'", self.kind.name(), strategy.describe());
                }
                value
            })
            .ok_or_else(|| AppError::mismatch(self.kind.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionConfig;
    use scraper::Html;

    struct Fixed(Option<&'static str>);

    impl FieldStrategy for Fixed {
        fn describe(&self) -> &str {
            "fixed"
        }
        fn try_extract(&self, _container: ElementRef<'_>) -> Option<String> {
            self.0.map(String::from)
        }
    }

    fn noise() -> Arc<NoiseFilter> {
        Arc::new(NoiseFilter::new(&ExtractionConfig::default()).unwrap())
    }

    fn with_container<T>(body: &str, f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let html = Html::parse_fragment(&format!("<div class=\"post\">{body}</div>"));
        let post = Selector::parse("div.post").unwrap();
        f(html.select(&post).next().unwrap())
    }

    #[test]
    fn test_first_success_wins() {
        let chain = FieldChain::new(
            FieldKind::Text,
            vec![
                Box::new(Fixed(None)),
                Box::new(Fixed(Some("second"))),
                Box::new(Fixed(Some("third"))),
            ],
        );
        let value = with_container("", |c| chain.extract(c).unwrap());
        assert_eq!(value, "second");
    }

    #[test]
    fn test_exhausted_chain_is_parse_mismatch() {
        let chain = FieldChain::new(FieldKind::Author, vec![Box::new(Fixed(None))]);
        let err = with_container("", |c| chain.extract(c).unwrap_err());
        assert!(matches!(err, AppError::ParseMismatch { ref field } if field == "author"));
    }

    #[test]
    fn test_text_skips_chrome_and_takes_longest() {
        let noise = noise();
        let chain =
            FieldChain::from_selectors(FieldKind::Text, &["span[dir='auto']".into()], &noise, vec![])
                .unwrap();
        let body = r#"
            <span dir="auto">3時間</span>
            <span dir="auto">短めの補足テキスト</span>
            <span dir="auto">本文はこちら。転職して一年で学んだことを全部書きます。</span>
            <span dir="auto">いいね</span>"#;
        let value = with_container(body, |c| chain.extract(c).unwrap());
        assert!(value.starts_with("本文はこちら"));
    }

    #[test]
    fn test_author_falls_back_to_profile_link() {
        let noise = noise();
        let chain = FieldChain::from_selectors(
            FieldKind::Author,
            &["span.missing".into()],
            &noise,
            vec![Box::new(ProfileLinkStrategy::new(Arc::clone(&noise)).unwrap())],
        )
        .unwrap();
        let body = r#"<a href="/@career.writer/post/abc"><img alt="x"></a>"#;
        let value = with_container(body, |c| chain.extract(c).unwrap());
        assert_eq!(value, "career.writer");
    }

    #[test]
    fn test_likes_needs_a_counter() {
        let noise = noise();
        let chain = FieldChain::from_selectors(
            FieldKind::Likes,
            &["span.count".into()],
            &noise,
            vec![],
        )
        .unwrap();
        let body = r#"<span class="count">いいね</span><span class="count">1.2K</span>"#;
        let value = with_container(body, |c| chain.extract(c).unwrap());
        assert_eq!(value, "1.2K");
    }
}
